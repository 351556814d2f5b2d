//! Bounded worker pool for non-blocking command submission
//!
//! Callers that must not block (an operator console, a UI thread) hand
//! commands to a fixed set of workers through a bounded queue. A full queue
//! is reported immediately instead of spawning more threads.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError, bounded};
use log::{debug, info};

use super::channel::CommandChannel;
use crate::error::{Error, Result};
use crate::protocol::{CommandAck, CommandType};

struct Job {
    command_type: CommandType,
    device_id: u8,
    value: u8,
    timeout: Duration,
    reply: Sender<Result<CommandAck>>,
}

/// Handle to a submitted command
pub struct PendingCommand {
    rx: Receiver<Result<CommandAck>>,
}

impl PendingCommand {
    /// Block until the worker finishes the round trip
    pub fn wait(self) -> Result<CommandAck> {
        self.rx
            .recv()
            .map_err(|_| Error::Disconnected("command worker"))?
    }

    /// Wait at most `timeout`; `None` if still running
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<CommandAck>> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(Error::Disconnected("command worker"))),
        }
    }

    /// Non-blocking poll
    pub fn try_result(&self) -> Option<Result<CommandAck>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(Error::Disconnected("command worker"))),
        }
    }
}

/// Fixed pool of command workers
pub struct CommandDispatcher {
    tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl CommandDispatcher {
    pub fn new(channel: Arc<CommandChannel>, workers: usize, queue_capacity: usize) -> Result<Self> {
        if workers == 0 || queue_capacity == 0 {
            return Err(Error::InvalidParameter(
                "dispatcher needs at least one worker and one queue slot".into(),
            ));
        }

        let (tx, rx) = bounded::<Job>(queue_capacity);
        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let rx = rx.clone();
            let channel = Arc::clone(&channel);
            let handle = thread::Builder::new()
                .name(format!("cmd-worker-{}", i))
                .spawn(move || worker_loop(i, rx, channel))
                .map_err(|e| Error::Other(format!("Failed to spawn command worker: {}", e)))?;
            handles.push(handle);
        }

        info!("Command dispatcher: {} workers, queue {}", workers, queue_capacity);
        Ok(Self {
            tx: Some(tx),
            workers: handles,
        })
    }

    /// Queue a command without blocking
    pub fn submit(
        &self,
        command_type: CommandType,
        device_id: u8,
        value: u8,
        timeout: Duration,
    ) -> Result<PendingCommand> {
        let tx = self.tx.as_ref().ok_or(Error::Disconnected("command dispatcher"))?;
        let (reply, rx) = bounded(1);
        let job = Job {
            command_type,
            device_id,
            value,
            timeout,
            reply,
        };
        match tx.try_send(job) {
            Ok(()) => Ok(PendingCommand { rx }),
            Err(TrySendError::Full(_)) => Err(Error::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(Error::Disconnected("command dispatcher")),
        }
    }

    /// Commands waiting for a worker
    pub fn queued(&self) -> usize {
        self.tx.as_ref().map_or(0, |tx| tx.len())
    }

    /// Stop accepting commands, finish queued ones and join the workers
    pub fn shutdown(&mut self) {
        if self.tx.take().is_none() {
            return;
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        debug!("Command dispatcher stopped");
    }
}

impl Drop for CommandDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(id: usize, rx: Receiver<Job>, channel: Arc<CommandChannel>) {
    // Ends once the sender is dropped and the queue is empty
    while let Ok(job) = rx.recv() {
        let result = channel.send(job.command_type, job.device_id, job.value, job.timeout);
        // Submitter may have dropped its handle
        let _ = job.reply.send(result);
    }
    debug!("Command worker {} exiting", id);
}
