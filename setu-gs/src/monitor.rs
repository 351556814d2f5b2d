//! Periodic connection-liveness check
//!
//! The store never re-evaluates liveness by itself. This poller does so at a
//! fixed interval and logs link up/down transitions.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use log::{info, warn};

use crate::error::{Error, Result};
use crate::store::DataStore;

/// Background liveness poller
pub struct LivenessPoller {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl LivenessPoller {
    pub fn spawn(store: Arc<DataStore>, timeout: Duration, interval: Duration) -> Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("liveness".to_string())
            .spawn(move || {
                let mut was_connected = store.is_connected();
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        _ => break,
                    }
                    let connected = store.check_connection(timeout);
                    if connected != was_connected {
                        if connected {
                            info!("Telemetry link up");
                        } else {
                            warn!("Telemetry link lost (no data for more than {:?})", timeout);
                        }
                        was_connected = connected;
                    }
                }
            })
            .map_err(|e| Error::Other(format!("Failed to spawn liveness poller: {}", e)))?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stop polling; returns once the thread has exited
    pub fn stop(&mut self) {
        // Dropping the sender wakes the thread
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for LivenessPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
