//! Loopback stand-controller doubles shared by the integration tests

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, bounded};
use parking_lot::Mutex;

use setu_gs::protocol::constants::COMMAND_FRAME_SIZE;
use setu_gs::protocol::{
    AckStatus, CommandAck, CommandRequest, LoadCells, Pressures, Solenoids, SystemStatus,
    TelemetrySample,
};

/// Peer that acks every request with a fixed status
pub struct AckPeer {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<CommandRequest>>>,
    _handle: JoinHandle<()>,
}

impl AckPeer {
    pub fn spawn(status: u16) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        let handle = thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut frame = [0u8; COMMAND_FRAME_SIZE];
                if stream.read_exact(&mut frame).is_err() {
                    continue;
                }
                let Ok(request) = CommandRequest::decode(&frame) else {
                    continue;
                };
                seen.lock().push(request);
                let ack = CommandAck {
                    timestamp_ms: request.timestamp_ms,
                    sequence_id: request.sequence_id,
                    status: AckStatus::from_code(status),
                    reserved: 0,
                };
                let _ = stream.write_all(&ack.encode());
            }
        });

        Self {
            addr,
            requests,
            _handle: handle,
        }
    }

    pub fn requests(&self) -> Vec<CommandRequest> {
        self.requests.lock().clone()
    }
}

/// Peer that reads one request and never answers.
///
/// The receiver yields once the client has closed its end of the connection.
pub fn spawn_silent_peer() -> (SocketAddr, Receiver<CommandRequest>, Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (req_tx, req_rx) = bounded(1);
    let (closed_tx, closed_rx) = bounded(1);

    thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut frame = [0u8; COMMAND_FRAME_SIZE];
        if stream.read_exact(&mut frame).is_ok()
            && let Ok(request) = CommandRequest::decode(&frame)
        {
            let _ = req_tx.send(request);
        }
        // Block until the client closes
        stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        let mut buf = [0u8; 16];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => break,
                Err(_) => return,
            }
        }
        let _ = closed_tx.send(());
    });

    (addr, req_rx, closed_rx)
}

/// Peer that writes `n` bytes of an ack and then closes
pub fn spawn_truncating_peer(n: usize) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut frame = [0u8; COMMAND_FRAME_SIZE];
            let _ = stream.read_exact(&mut frame);
            let _ = stream.write_all(&vec![0u8; n]);
        }
    });
    addr
}

/// An address nothing is listening on
pub fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Connect to and immediately drop, to prove a listener is still alive
pub fn can_connect(addr: SocketAddr) -> bool {
    TcpStream::connect_timeout(&addr, Duration::from_millis(200)).is_ok()
}

pub fn send_datagram(target: SocketAddr, bytes: &[u8]) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.send_to(bytes, target).unwrap();
}

pub fn sample(counter: u16) -> TelemetrySample {
    TelemetrySample {
        timestamp_ms: 1000 + counter as u32,
        packet_counter: counter,
        pressures: Pressures::from_array([450.0, 445.5, 950.0, 420.25, 425.0, 300.5]),
        load_cells: LoadCells::from_array([2900.0, 2950.0, 950.0, 900.0]),
        temperature: 30.0,
        solenoids: Solenoids {
            rvv_o: false,
            mpv_p: true,
            rvv_f: false,
        },
        status: SystemStatus {
            armed: true,
            recording: false,
            error: false,
        },
        ..Default::default()
    }
    .sealed()
}

/// Poll `cond` until it holds or two seconds pass
pub fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}
