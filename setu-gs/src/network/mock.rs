//! Scripted in-memory command transport for tests

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::transport::{CommandLink, CommandTransport};
use crate::error::{Error, Result};
use crate::protocol::constants::ACK_FRAME_SIZE;
use crate::protocol::{AckStatus, CommandAck, CommandRequest};

/// How the mock peer answers one round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockReply {
    /// Ack echoing the request sequence with this status code
    Status(u16),
    /// Ack carrying a different sequence id
    WrongSequence(u16),
    /// Connect is refused
    Refused,
    /// Connect times out
    ConnectTimeout,
    /// Request is accepted but never answered
    Silent,
    /// Peer closes after this many ack bytes
    Short(usize),
    /// Success ack after sleeping this many milliseconds
    Delayed(u64),
}

/// Mock transport shared between the test and the channel under test
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockInner>>,
}

struct MockInner {
    script: VecDeque<MockReply>,
    default_reply: MockReply,
    requests: Vec<CommandRequest>,
    opened: usize,
    released: usize,
}

impl MockTransport {
    /// Peer that acks every command with `Success`
    pub fn new() -> Self {
        Self::with_default(MockReply::Status(0))
    }

    pub fn with_default(reply: MockReply) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInner {
                script: VecDeque::new(),
                default_reply: reply,
                requests: Vec::new(),
                opened: 0,
                released: 0,
            })),
        }
    }

    /// Queue a reply for the next round trip
    pub fn push_reply(&self, reply: MockReply) {
        self.inner.lock().script.push_back(reply);
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CommandRequest> {
        self.inner.lock().requests.clone()
    }

    /// Connections opened
    pub fn opened(&self) -> usize {
        self.inner.lock().opened
    }

    /// Connections released
    pub fn released(&self) -> usize {
        self.inner.lock().released
    }

    fn next_reply(&self) -> MockReply {
        let mut inner = self.inner.lock();
        let default = inner.default_reply;
        inner.script.pop_front().unwrap_or(default)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTransport for MockTransport {
    fn open(&self, _timeout: Duration) -> Result<Box<dyn CommandLink>> {
        let reply = self.next_reply();
        match reply {
            MockReply::Refused => Err(Error::ConnectionRefused),
            MockReply::ConnectTimeout => Err(Error::Timeout),
            _ => {
                self.inner.lock().opened += 1;
                Ok(Box::new(MockLink {
                    inner: Arc::clone(&self.inner),
                    reply,
                }))
            }
        }
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

struct MockLink {
    inner: Arc<Mutex<MockInner>>,
    reply: MockReply,
}

impl CommandLink for MockLink {
    fn exchange(&mut self, frame: &[u8], _timeout: Duration) -> Result<[u8; ACK_FRAME_SIZE]> {
        let request = CommandRequest::decode(frame)?;
        self.inner.lock().requests.push(request);

        let ack = |sequence_id: u16, code: u16| CommandAck {
            timestamp_ms: request.timestamp_ms,
            sequence_id,
            status: AckStatus::from_code(code),
            reserved: 0,
        };

        match self.reply {
            MockReply::Status(code) => Ok(ack(request.sequence_id, code).encode()),
            MockReply::WrongSequence(seq) => Ok(ack(seq, 0).encode()),
            MockReply::Delayed(ms) => {
                thread::sleep(Duration::from_millis(ms));
                Ok(ack(request.sequence_id, 0).encode())
            }
            MockReply::Silent => Err(Error::Timeout),
            MockReply::Short(n) => Err(Error::ShortAck {
                received: n.min(ACK_FRAME_SIZE - 1),
            }),
            MockReply::Refused | MockReply::ConnectTimeout => Err(Error::ConnectionRefused),
        }
    }
}

impl Drop for MockLink {
    fn drop(&mut self) {
        self.inner.lock().released += 1;
    }
}
