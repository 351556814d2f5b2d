//! Command round trips against loopback TCP peers

mod common;

use std::time::{Duration, Instant};

use common::{AckPeer, closed_port, spawn_silent_peer, spawn_truncating_peer};
use setu_gs::network::TcpTransport;
use setu_gs::protocol::{AckStatus, CommandType, Outcome};
use setu_gs::{CommandChannel, Error};

fn channel(addr: std::net::SocketAddr) -> CommandChannel {
    CommandChannel::new(Box::new(TcpTransport::new(addr)), Duration::from_secs(1))
}

#[test]
fn test_system_arm_acknowledged() {
    let peer = AckPeer::spawn(0);
    let ch = channel(peer.addr);

    let ack = ch
        .send(CommandType::System, 255, 1, Duration::from_secs(1))
        .unwrap();
    assert_eq!(ack.status, AckStatus::Success);
    assert_eq!(ack.outcome(), Outcome::Ok);
    assert_eq!(ack.sequence_id, 1);

    let requests = peer.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].command_type, CommandType::System);
    assert_eq!(requests[0].device_id, 255);
    assert_eq!(requests[0].value, 1);
}

#[test]
fn test_sequence_ids_increase() {
    let peer = AckPeer::spawn(0);
    let ch = channel(peer.addr);
    for _ in 0..4 {
        ch.send(CommandType::Solenoid, 1, 0, Duration::from_secs(1)).unwrap();
    }
    let seqs: Vec<u16> = peer.requests().iter().map(|r| r.sequence_id).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4]);
}

#[test]
fn test_rejected_status() {
    let peer = AckPeer::spawn(2);
    let ch = channel(peer.addr);
    let ack = ch.arm(true).unwrap();
    assert_eq!(ack.status, AckStatus::Rejected);
    assert_eq!(ack.message(), "Rejected (safety interlock)");
    assert_eq!(ack.outcome(), Outcome::Error);
}

#[test]
fn test_silent_peer_times_out_and_connection_is_released() {
    let (addr, requests, closed) = spawn_silent_peer();
    let ch = channel(addr);

    let start = Instant::now();
    let err = ch
        .send(CommandType::System, 255, 1, Duration::from_millis(300))
        .unwrap_err();
    assert!(matches!(err, Error::Timeout), "got {:?}", err);
    assert!(start.elapsed() >= Duration::from_millis(250));
    assert!(start.elapsed() < Duration::from_secs(3));

    assert_eq!(requests.recv_timeout(Duration::from_secs(1)).unwrap().sequence_id, 1);
    assert!(closed.recv_timeout(Duration::from_secs(2)).is_ok());
}

#[test]
fn test_connection_refused() {
    let ch = channel(closed_port());
    let err = ch
        .send(CommandType::System, 255, 1, Duration::from_millis(500))
        .unwrap_err();
    assert!(matches!(err, Error::ConnectionRefused), "got {:?}", err);
    assert_eq!(ch.last_sequence(), 0);
}

#[test]
fn test_truncated_ack() {
    let addr = spawn_truncating_peer(5);
    let ch = channel(addr);
    let err = ch
        .send(CommandType::Servo, 4, 100, Duration::from_secs(1))
        .unwrap_err();
    assert!(matches!(err, Error::ShortAck { received: 5 }), "got {:?}", err);
}
