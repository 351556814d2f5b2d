//! Command transport abstraction
//!
//! A [`CommandTransport`] opens one [`CommandLink`] per command round trip.
//! The link is released when dropped, so every exit path of a round trip
//! closes the connection. Connection pooling would be another implementation
//! of this trait.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::protocol::constants::ACK_FRAME_SIZE;

/// Opens connections to the stand controller
pub trait CommandTransport: Send + Sync {
    /// Connect, waiting at most `timeout`
    fn open(&self, timeout: Duration) -> Result<Box<dyn CommandLink>>;

    /// Human-readable peer description for logs
    fn describe(&self) -> String;
}

/// One open command connection
pub trait CommandLink: Send {
    /// Send a request frame and wait up to `timeout` for a full ack frame
    fn exchange(&mut self, frame: &[u8], timeout: Duration) -> Result<[u8; ACK_FRAME_SIZE]>;
}

/// New TCP connection per command
#[derive(Debug, Clone)]
pub struct TcpTransport {
    addr: SocketAddr,
}

impl TcpTransport {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

impl CommandTransport for TcpTransport {
    fn open(&self, timeout: Duration) -> Result<Box<dyn CommandLink>> {
        let stream = TcpStream::connect_timeout(&self.addr, timeout).map_err(Error::from_transport)?;
        stream.set_nodelay(true)?;
        stream.set_write_timeout(Some(timeout))?;
        Ok(Box::new(TcpLink { stream }))
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.addr)
    }
}

struct TcpLink {
    stream: TcpStream,
}

impl CommandLink for TcpLink {
    fn exchange(&mut self, frame: &[u8], timeout: Duration) -> Result<[u8; ACK_FRAME_SIZE]> {
        self.stream.write_all(frame).map_err(Error::from_transport)?;
        self.stream.flush().map_err(Error::from_transport)?;

        let deadline = Instant::now() + timeout;
        let mut ack = [0u8; ACK_FRAME_SIZE];
        let mut received = 0;

        while received < ACK_FRAME_SIZE {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout);
            }
            self.stream.set_read_timeout(Some(remaining))?;

            match self.stream.read(&mut ack[received..]) {
                Ok(0) => return Err(Error::ShortAck { received }),
                Ok(n) => received += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::from_transport(e)),
            }
        }

        Ok(ack)
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        // Peer may already be gone
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}
