//! UDP telemetry receiver
//!
//! Owns the inbound socket and a dedicated thread that decodes every
//! datagram and feeds valid samples into the [`DataStore`]. Invalid
//! datagrams are counted and dropped; nothing short of `stop` ends the loop.
//!
//! Stopping clears the running flag and sends an empty datagram to the bound
//! socket so a blocked `recv_from` returns immediately. The read timeout is a
//! backstop in case the wake-up datagram is lost.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::TelemetrySample;
use crate::store::DataStore;

/// Backstop for noticing the running flag
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Larger than any valid record so oversized datagrams are seen as such
const MAX_DATAGRAM_SIZE: usize = 2048;

/// Log the first decode failure and then every Nth
const WARN_EVERY: u64 = 100;

/// Receive counters
#[derive(Debug, Default)]
pub struct ReceiverStats {
    datagrams: AtomicU64,
    accepted: AtomicU64,
    bad_length: AtomicU64,
    checksum_mismatch: AtomicU64,
}

/// Point-in-time copy of [`ReceiverStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStatsSnapshot {
    pub datagrams: u64,
    pub accepted: u64,
    pub bad_length: u64,
    pub checksum_mismatch: u64,
}

impl ReceiverStatsSnapshot {
    pub fn rejected(&self) -> u64 {
        self.bad_length + self.checksum_mismatch
    }
}

impl ReceiverStats {
    pub fn snapshot(&self) -> ReceiverStatsSnapshot {
        ReceiverStatsSnapshot {
            datagrams: self.datagrams.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            bad_length: self.bad_length.load(Ordering::Relaxed),
            checksum_mismatch: self.checksum_mismatch.load(Ordering::Relaxed),
        }
    }

    fn rejected(&self) -> u64 {
        self.bad_length.load(Ordering::Relaxed) + self.checksum_mismatch.load(Ordering::Relaxed)
    }
}

/// Running receiver thread and its socket address
pub struct TelemetryReceiver {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    stats: Arc<ReceiverStats>,
    handle: Option<JoinHandle<()>>,
}

impl TelemetryReceiver {
    /// Bind `bind_addr` and start receiving into `store`
    pub fn spawn<A: ToSocketAddrs>(bind_addr: A, store: Arc<DataStore>) -> Result<Self> {
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;
        let local_addr = socket.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(ReceiverStats::default());

        let handle = {
            let running = Arc::clone(&running);
            let stats = Arc::clone(&stats);
            thread::Builder::new()
                .name("telemetry-rx".to_string())
                .spawn(move || receive_loop(socket, running, stats, store))
                .map_err(|e| Error::Other(format!("Failed to spawn telemetry receiver: {}", e)))?
        };

        info!("Telemetry receiver listening on udp://{}", local_addr);
        Ok(Self {
            local_addr,
            running,
            stats,
            handle: Some(handle),
        })
    }

    /// Address the socket is actually bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> ReceiverStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop the loop and close the socket. Safe to call more than once.
    pub fn stop(&mut self) {
        if self.running.swap(false, Ordering::Relaxed) {
            self.wake();
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Telemetry receiver thread panicked");
            }
            info!("Telemetry receiver stopped");
        }
    }

    fn wake(&self) {
        let target = wake_target(self.local_addr);
        let bind: SocketAddr = match target.ip() {
            IpAddr::V4(_) => (Ipv4Addr::LOCALHOST, 0).into(),
            IpAddr::V6(_) => (Ipv6Addr::LOCALHOST, 0).into(),
        };
        let sent = UdpSocket::bind(bind).and_then(|s| s.send_to(&[], target));
        if let Err(e) = sent {
            // Read timeout still ends the loop
            trace!("Wake-up datagram failed: {}", e);
        }
    }
}

impl Drop for TelemetryReceiver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Loopback of the same family when bound to a wildcard address
fn wake_target(local: SocketAddr) -> SocketAddr {
    match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => (Ipv4Addr::LOCALHOST, local.port()).into(),
        IpAddr::V6(ip) if ip.is_unspecified() => (Ipv6Addr::LOCALHOST, local.port()).into(),
        _ => local,
    }
}

fn receive_loop(
    socket: UdpSocket,
    running: Arc<AtomicBool>,
    stats: Arc<ReceiverStats>,
    store: Arc<DataStore>,
) {
    let mut buffer = [0u8; MAX_DATAGRAM_SIZE];

    while running.load(Ordering::Relaxed) {
        let (len, src) = match socket.recv_from(&mut buffer) {
            Ok(result) => result,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(e) => {
                error!("UDP recv error: {}", e);
                continue;
            }
        };

        if !running.load(Ordering::Relaxed) {
            break;
        }
        stats.datagrams.fetch_add(1, Ordering::Relaxed);

        match TelemetrySample::decode(&buffer[..len]) {
            Ok(sample) => {
                stats.accepted.fetch_add(1, Ordering::Relaxed);
                trace!(
                    "Sample #{} from {} (t={}ms)",
                    sample.packet_counter, src, sample.timestamp_ms
                );
                store.update(sample);
            }
            Err(e) => {
                let counter = match e {
                    Error::ChecksumMismatch { .. } => &stats.checksum_mismatch,
                    _ => &stats.bad_length,
                };
                counter.fetch_add(1, Ordering::Relaxed);
                let n = stats.rejected();
                if n == 1 || n % WARN_EVERY == 0 {
                    warn!("Dropped datagram from {} ({} rejected so far): {}", src, n, e);
                }
            }
        }
    }
    // Socket is closed when dropped here
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wake_target() {
        let any: SocketAddr = "0.0.0.0:5555".parse().unwrap();
        assert_eq!(wake_target(any), "127.0.0.1:5555".parse::<SocketAddr>().unwrap());

        let any6: SocketAddr = "[::]:5555".parse().unwrap();
        assert_eq!(wake_target(any6), "[::1]:5555".parse::<SocketAddr>().unwrap());

        let lo: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        assert_eq!(wake_target(lo), lo);
    }

    #[test]
    fn test_snapshot_rejected() {
        let s = ReceiverStatsSnapshot {
            datagrams: 5,
            accepted: 2,
            bad_length: 1,
            checksum_mismatch: 2,
        };
        assert_eq!(s.rejected(), 3);
    }
}
