//! UDP telemetry into the data store over loopback

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{sample, send_datagram, wait_for};
use setu_gs::protocol::TelemetrySample;
use setu_gs::protocol::checksum::AdditiveChecksum;
use setu_gs::{DataStore, SessionRecorder, TelemetryReceiver};
use tempfile::TempDir;

fn pipeline(dir: &TempDir) -> (Arc<DataStore>, TelemetryReceiver) {
    let recorder = Arc::new(SessionRecorder::new(dir.path(), "pipeline"));
    let store = Arc::new(DataStore::new(100, recorder));
    let receiver = TelemetryReceiver::spawn("127.0.0.1:0", Arc::clone(&store)).unwrap();
    (store, receiver)
}

#[test]
fn test_crafted_record_becomes_latest() {
    let dir = TempDir::new().unwrap();
    let (store, receiver) = pipeline(&dir);

    let mut record = Vec::new();
    record.extend_from_slice(&5000u32.to_le_bytes());
    record.extend_from_slice(&12u16.to_le_bytes());
    for v in [1.5f32, 2.5, 3.5, 4.5, 5.5, 6.5, 10.0, 20.0, 30.0, 40.0, 77.25] {
        record.extend_from_slice(&v.to_le_bytes());
    }
    record.push(0b101);
    record.extend_from_slice(&[9, 8, 7, 6, 5, 4]);
    record.push(0b001);
    let sum = AdditiveChecksum::compute(&record);
    record.extend_from_slice(&sum.to_le_bytes());
    assert_eq!(record.len(), 62);

    send_datagram(receiver.local_addr(), &record);
    assert!(wait_for(|| store.latest().is_some()));

    let s = store.latest().unwrap();
    assert_eq!(s.timestamp_ms, 5000);
    assert_eq!(s.packet_counter, 12);
    assert_eq!(s.pressures.pt_o1_3, 1.5);
    assert_eq!(s.pressures.pt_f2_4_engine, 6.5);
    assert_eq!(s.load_cells.lc_4, 40.0);
    assert_eq!(s.temperature, 77.25);
    assert!(s.solenoids.rvv_o && !s.solenoids.mpv_p && s.solenoids.rvv_f);
    assert_eq!(s.servos.dot_oxidizer, 9);
    assert_eq!(s.actuators.ac_2, 4);
    assert!(s.status.armed && !s.status.recording && !s.status.error);
    assert!(store.is_connected());
    assert_eq!(receiver.stats().accepted, 1);
}

#[test]
fn test_invalid_datagrams_are_dropped() {
    let dir = TempDir::new().unwrap();
    let (store, receiver) = pipeline(&dir);
    let addr = receiver.local_addr();

    let mut corrupted = sample(1).encode();
    corrupted[10] ^= 0xFF;
    send_datagram(addr, &corrupted);
    send_datagram(addr, &sample(2).encode()[..40]);
    send_datagram(addr, &[0u8; 100]);

    assert!(wait_for(|| receiver.stats().datagrams == 3));
    let stats = receiver.stats();
    assert_eq!(stats.checksum_mismatch, 1);
    assert_eq!(stats.bad_length, 2);
    assert_eq!(stats.accepted, 0);
    assert!(store.latest().is_none());

    // Loop keeps running after failures
    send_datagram(addr, &sample(3).encode());
    assert!(wait_for(|| store.latest().is_some()));
    assert_eq!(store.latest().unwrap(), sample(3));
}

#[test]
fn test_samples_in_order_and_recorded() {
    let dir = TempDir::new().unwrap();
    let (store, receiver) = pipeline(&dir);
    assert!(store.start_recording());

    for i in 0..20 {
        send_datagram(receiver.local_addr(), &sample(i).encode());
        // Keep loopback delivery in order
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(wait_for(|| store.samples_received() == 20));

    let counters: Vec<u16> = store.history().iter().map(|s| s.packet_counter).collect();
    assert_eq!(counters.len(), 20);
    assert_eq!(counters.last(), Some(&19));

    let info = store.recorder().stop_session().unwrap();
    assert_eq!(info.rows, 20);
    let contents = std::fs::read_to_string(&info.path).unwrap();
    assert_eq!(contents.lines().count(), 21);
}

#[test]
fn test_stop_unblocks_receiver() {
    let dir = TempDir::new().unwrap();
    let (_store, mut receiver) = pipeline(&dir);
    assert!(receiver.is_running());

    let start = Instant::now();
    receiver.stop();
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(!receiver.is_running());

    // Second stop is a no-op
    receiver.stop();
}

#[test]
fn test_stop_closes_socket() {
    let dir = TempDir::new().unwrap();
    let (_store, mut receiver) = pipeline(&dir);
    let addr = receiver.local_addr();
    receiver.stop();

    // Port can be bound again once the socket is closed
    let rebound = std::net::UdpSocket::bind(addr);
    assert!(rebound.is_ok());
}

#[test]
fn test_decode_matches_wire() {
    let s = sample(9);
    assert_eq!(TelemetrySample::decode(&s.encode()).unwrap(), s);
}
