//! CSV session recorder
//!
//! One file per session, named from the local start time. The first row is
//! the column header; each appended sample becomes one row in the same
//! column order. All state sits behind one mutex, so rows never interleave
//! with opening or closing a file.
//!
//! I/O failures are logged and reported as `false`; they never propagate.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{error, info, warn};
use parking_lot::Mutex;

use crate::protocol::TelemetrySample;

/// Column order of every recording
pub const CSV_HEADER: [&str; 24] = [
    "timestamp",
    "elapsed_time",
    "pt_o1_3",
    "pt_o2_2",
    "pt_p1_6",
    "pt_f2_4",
    "pt_f1_5",
    "pt_f2_4_engine",
    "lc_1",
    "lc_2",
    "lc_3",
    "lc_4",
    "tc_1",
    "rvv_o",
    "mpv_p",
    "rvv_f",
    "dot_oxidizer",
    "mpf_f",
    "oxidizer_engine",
    "in_1",
    "ac_1",
    "ac_2",
    "armed",
    "error",
];

/// Summary of a finished session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub path: PathBuf,
    pub rows: u64,
    pub duration: Duration,
}

type Sink = Box<dyn Write + Send>;

struct Session {
    sink: Sink,
    path: PathBuf,
    started: Instant,
    /// Rows flushed to the sink
    rows: u64,
    /// Set by the first write failure; later rows are refused
    failed: bool,
}

/// Idle/Recording state machine over a CSV file
pub struct SessionRecorder {
    directory: PathBuf,
    prefix: String,
    session: Mutex<Option<Session>>,
}

impl SessionRecorder {
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
            session: Mutex::new(None),
        }
    }

    /// Open a new session file and write the header.
    ///
    /// Returns false if a session is already active or the file could not be
    /// created.
    pub fn start(&self) -> bool {
        let mut guard = self.session.lock();
        if guard.is_some() {
            warn!("Recording already active");
            return false;
        }

        match self.create_file().and_then(|(path, file)| open_session(path, Box::new(file))) {
            Ok(session) => {
                info!("Recording started: {}", session.path.display());
                *guard = Some(session);
                true
            }
            Err(e) => {
                error!("Failed to start recording in {}: {}", self.directory.display(), e);
                false
            }
        }
    }

    /// Create `<prefix>_<YYYYmmdd_HHMMSS>.csv`, suffixed `_N` if already taken.
    ///
    /// Existing files are never truncated.
    fn create_file(&self) -> io::Result<(PathBuf, File)> {
        fs::create_dir_all(&self.directory)?;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let base = format!("{}_{}", self.prefix, stamp);
        let mut path = self.directory.join(format!("{}.csv", base));
        let mut n = 1;
        loop {
            match File::create_new(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    path = self.directory.join(format!("{}_{}.csv", base, n));
                    n += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Append and flush one row.
    ///
    /// Returns false when idle or on write failure. After the first failure
    /// the session stays open but refuses further rows until stopped, so
    /// `rows` only ever counts rows that reached the file.
    pub fn append(&self, sample: &TelemetrySample) -> bool {
        let mut guard = self.session.lock();
        let Some(session) = guard.as_mut() else {
            return false;
        };
        if session.failed {
            return false;
        }

        let elapsed = session.started.elapsed().as_secs_f64();
        let row = format_row(chrono::Utc::now().timestamp_millis(), elapsed, sample);
        let written = encode_record(&row).and_then(|bytes| {
            session.sink.write_all(&bytes)?;
            session.sink.flush()
        });
        match written {
            Ok(()) => {
                session.rows += 1;
                true
            }
            Err(e) => {
                error!(
                    "Recording {} failed after {} rows, dropping further rows: {}",
                    session.path.display(),
                    session.rows,
                    e
                );
                session.failed = true;
                false
            }
        }
    }

    /// Close the active session. Returns false when idle or if any write
    /// failed; the session is closed either way.
    pub fn stop(&self) -> bool {
        let mut guard = self.session.lock();
        let Some(session) = guard.take() else {
            return false;
        };
        drop(guard);
        Self::finish(session).is_some()
    }

    /// Like [`stop`](Self::stop), returning a summary of the closed session
    pub fn stop_session(&self) -> Option<SessionInfo> {
        let session = self.session.lock().take()?;
        Self::finish(session)
    }

    fn finish(mut session: Session) -> Option<SessionInfo> {
        let info = SessionInfo {
            path: session.path.clone(),
            rows: session.rows,
            duration: session.started.elapsed(),
        };
        if session.failed {
            warn!(
                "Recording closed after write failure: {} ({} rows kept)",
                info.path.display(),
                info.rows
            );
            return None;
        }
        if let Err(e) = session.sink.flush() {
            error!("Failed to flush recording {}: {}", info.path.display(), e);
            return None;
        }
        info!(
            "Recording stopped: {} ({} rows, {:.1}s)",
            info.path.display(),
            info.rows,
            info.duration.as_secs_f64()
        );
        Some(info)
    }

    /// Start a session writing to `sink` instead of a new file
    #[cfg(test)]
    pub(crate) fn start_with_sink(&self, path: PathBuf, sink: Sink) -> bool {
        let mut guard = self.session.lock();
        if guard.is_some() {
            return false;
        }
        match open_session(path, sink) {
            Ok(session) => {
                *guard = Some(session);
                true
            }
            Err(_) => false,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Path of the active session file
    pub fn current_path(&self) -> Option<PathBuf> {
        self.session.lock().as_ref().map(|s| s.path.clone())
    }

    /// Rows written in the active session
    pub fn rows_written(&self) -> u64 {
        self.session.lock().as_ref().map_or(0, |s| s.rows)
    }
}

impl Drop for SessionRecorder {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            Self::finish(session);
        }
    }
}

fn open_session(path: PathBuf, mut sink: Sink) -> io::Result<Session> {
    sink.write_all(&encode_record(CSV_HEADER)?)?;
    sink.flush()?;

    Ok(Session {
        sink,
        path,
        started: Instant::now(),
        rows: 0,
        failed: false,
    })
}

/// One CSV line, so a row reaches the sink in a single write
fn encode_record<I, T>(record: I) -> io::Result<Vec<u8>>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut line = csv::Writer::from_writer(Vec::new());
    line.write_record(record).map_err(csv_to_io)?;
    line.into_inner().map_err(|e| io::Error::other(e.to_string()))
}

fn csv_to_io(e: csv::Error) -> io::Error {
    io::Error::other(e.to_string())
}

/// Sink that accepts whole writes until `budget` bytes are used, then fails
#[cfg(test)]
#[derive(Clone)]
pub(crate) struct LimitedSink {
    pub data: std::sync::Arc<Mutex<Vec<u8>>>,
    budget: usize,
}

#[cfg(test)]
impl LimitedSink {
    pub fn new(budget: usize) -> Self {
        Self {
            data: Default::default(),
            budget,
        }
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.data.lock()).into_owned()
    }
}

#[cfg(test)]
impl Write for LimitedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut data = self.data.lock();
        if data.len() + buf.len() > self.budget {
            return Err(io::Error::other("no space left"));
        }
        data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn flag(b: bool) -> String {
    let v = if b { "1" } else { "0" };
    v.to_string()
}

/// One CSV row in [`CSV_HEADER`] order
pub fn format_row(timestamp_ms: i64, elapsed_secs: f64, s: &TelemetrySample) -> Vec<String> {
    let mut row = Vec::with_capacity(CSV_HEADER.len());
    row.push(timestamp_ms.to_string());
    row.push(elapsed_secs.to_string());
    row.extend(s.pressures.to_array().iter().map(|p| p.to_string()));
    row.extend(s.load_cells.to_array().iter().map(|lc| lc.to_string()));
    row.push(s.temperature.to_string());
    row.push(flag(s.solenoids.rvv_o));
    row.push(flag(s.solenoids.mpv_p));
    row.push(flag(s.solenoids.rvv_f));
    row.push(s.servos.dot_oxidizer.to_string());
    row.push(s.servos.mpf_f.to_string());
    row.push(s.servos.oxidizer_engine.to_string());
    row.push(s.actuators.in_1.to_string());
    row.push(s.actuators.ac_1.to_string());
    row.push(s.actuators.ac_2.to_string());
    row.push(flag(s.status.armed));
    row.push(flag(s.status.error));
    row
}
