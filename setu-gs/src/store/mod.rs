//! Live telemetry store
//!
//! Holds the latest sample, a bounded history and the connection-liveness
//! flag behind a single lock, and forwards accepted samples to the session
//! recorder while a recording is active.
//!
//! Liveness is passive: `connected` is only re-evaluated when someone calls
//! [`DataStore::check_connection`] (see [`crate::monitor::LivenessPoller`]).

mod history;

pub use history::History;

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::protocol::TelemetrySample;
use crate::recorder::SessionRecorder;

/// Default number of samples kept in history
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

struct StoreState {
    latest: Option<TelemetrySample>,
    history: History<TelemetrySample>,
    last_update: Option<Instant>,
    connected: bool,
    samples_received: u64,
}

/// Shared live view of the telemetry stream
pub struct DataStore {
    state: Mutex<StoreState>,
    recorder: Arc<SessionRecorder>,
}

impl DataStore {
    pub fn new(history_capacity: usize, recorder: Arc<SessionRecorder>) -> Self {
        Self {
            state: Mutex::new(StoreState {
                latest: None,
                history: History::with_capacity(history_capacity),
                last_update: None,
                connected: false,
                samples_received: 0,
            }),
            recorder,
        }
    }

    /// Record a newly accepted sample.
    ///
    /// The recorder is fed after the store lock is released; a recorder
    /// failure is logged by the recorder and does not affect the store.
    pub fn update(&self, sample: TelemetrySample) {
        {
            let mut state = self.state.lock();
            state.latest = Some(sample);
            state.history.push(sample);
            state.last_update = Some(Instant::now());
            if !state.connected {
                log::debug!("Telemetry stream live (packet {})", sample.packet_counter);
            }
            state.connected = true;
            state.samples_received += 1;
        }

        if self.recorder.is_recording() {
            self.recorder.append(&sample);
        }
    }

    pub fn latest(&self) -> Option<TelemetrySample> {
        self.state.lock().latest
    }

    /// History snapshot, oldest first
    pub fn history(&self) -> Vec<TelemetrySample> {
        self.state.lock().history.to_vec()
    }

    pub fn history_capacity(&self) -> usize {
        self.state.lock().history.capacity()
    }

    /// Re-evaluate liveness against `timeout` and return the result.
    ///
    /// Connected stays true while the time since the last update is at most
    /// `timeout`, and drops to false once it exceeds it.
    pub fn check_connection(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if let Some(last) = state.last_update
            && last.elapsed() > timeout
        {
            state.connected = false;
        }
        state.connected
    }

    /// Last evaluated liveness, without re-checking
    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Time since the last accepted sample
    pub fn since_last_update(&self) -> Option<Duration> {
        self.state.lock().last_update.map(|t| t.elapsed())
    }

    pub fn samples_received(&self) -> u64 {
        self.state.lock().samples_received
    }

    pub fn start_recording(&self) -> bool {
        self.recorder.start()
    }

    pub fn stop_recording(&self) -> bool {
        self.recorder.stop()
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn recorder(&self) -> &Arc<SessionRecorder> {
        &self.recorder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    fn store(capacity: usize, dir: &TempDir) -> DataStore {
        let recorder = Arc::new(SessionRecorder::new(dir.path(), "store_test"));
        DataStore::new(capacity, recorder)
    }

    fn sample(counter: u16) -> TelemetrySample {
        TelemetrySample {
            packet_counter: counter,
            ..Default::default()
        }
    }

    #[test]
    fn test_update_sets_latest() {
        let dir = TempDir::new().unwrap();
        let store = store(10, &dir);
        assert!(store.latest().is_none());
        assert!(!store.is_connected());
        assert!(store.since_last_update().is_none());
        assert_eq!(store.history_capacity(), 10);

        store.update(sample(1));
        store.update(sample(2));
        assert!(store.since_last_update().unwrap() < Duration::from_secs(5));
        assert_eq!(store.latest().map(|s| s.packet_counter), Some(2));
        assert!(store.is_connected());
        assert_eq!(store.samples_received(), 2);
    }

    #[test]
    fn test_history_eviction() {
        let dir = TempDir::new().unwrap();
        let store = store(100, &dir);
        for i in 0..150 {
            store.update(sample(i));
        }
        let history = store.history();
        assert_eq!(history.len(), 100);
        let counters: Vec<u16> = history.iter().map(|s| s.packet_counter).collect();
        assert_eq!(counters, (50..150).collect::<Vec<u16>>());
    }

    #[test]
    fn test_liveness_timeout() {
        let dir = TempDir::new().unwrap();
        let store = store(10, &dir);

        // Never updated: disconnected
        assert!(!store.check_connection(Duration::from_secs(1)));

        store.update(sample(1));
        assert!(store.check_connection(Duration::from_secs(5)));

        thread::sleep(Duration::from_millis(60));
        assert!(!store.check_connection(Duration::from_millis(20)));
        assert!(!store.is_connected());

        // A fresh sample reconnects
        store.update(sample(2));
        assert!(store.check_connection(Duration::from_secs(5)));
    }

    #[test]
    fn test_recording_gate() {
        let dir = TempDir::new().unwrap();
        let store = store(10, &dir);

        store.update(sample(1));
        assert_eq!(store.recorder().rows_written(), 0);

        assert!(store.start_recording());
        assert!(!store.start_recording());
        store.update(sample(2));
        store.update(sample(3));
        assert_eq!(store.recorder().rows_written(), 2);

        assert!(store.stop_recording());
        assert!(!store.stop_recording());
        store.update(sample(4));
        assert!(!store.is_recording());
    }

    #[test]
    fn test_recorder_failure_does_not_stop_updates() {
        use crate::recorder::LimitedSink;

        let dir = TempDir::new().unwrap();
        let store = store(10, &dir);
        let sink = LimitedSink::new(600);
        assert!(
            store
                .recorder()
                .start_with_sink(dir.path().join("failing.csv"), Box::new(sink))
        );

        for i in 0..200 {
            store.update(sample(i));
        }

        assert_eq!(store.latest().map(|s| s.packet_counter), Some(199));
        let counters: Vec<u16> = store.history().iter().map(|s| s.packet_counter).collect();
        assert_eq!(counters, (190..200).collect::<Vec<u16>>());
        assert_eq!(store.samples_received(), 200);
        assert!(store.recorder().rows_written() < 200);
        assert!(store.is_connected());

        assert!(!store.stop_recording());
        assert!(!store.is_recording());
    }

    #[test]
    fn test_concurrent_updates() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store(1000, &dir));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..100 {
                        store.update(sample(t * 100 + i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.samples_received(), 400);
        assert_eq!(store.history().len(), 400);
    }
}
