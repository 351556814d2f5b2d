//! setu-gs - Ground-station telemetry and command core
//!
//! A remote stand controller streams fixed-layout sensor records over UDP and
//! accepts discrete device commands over TCP. This library decodes and
//! validates the telemetry, keeps a live view with connection liveness,
//! records sessions to CSV, and runs command round trips with synchronous
//! acknowledgment.
//!
//! ## Components
//!
//! - [`protocol`]: telemetry, command and ack frame codecs
//! - [`store`]: latest sample, bounded history, liveness
//! - [`recorder`]: per-session CSV files
//! - [`network`]: UDP receiver, command channel and dispatcher
//! - [`monitor`]: periodic liveness check
//! - [`station`]: everything wired together from an [`AppConfig`]

pub mod config;
pub mod console;
pub mod error;
pub mod monitor;
pub mod network;
pub mod protocol;
pub mod recorder;
pub mod station;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
pub use network::{CommandChannel, CommandDispatcher, TelemetryReceiver};
pub use protocol::{CommandAck, CommandType, Device, TelemetrySample};
pub use recorder::SessionRecorder;
pub use station::Station;
pub use store::DataStore;
