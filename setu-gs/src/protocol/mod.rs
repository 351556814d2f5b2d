//! Wire protocol between the ground station and the stand controller
//!
//! - Telemetry: fixed 62-byte records over UDP ([`telemetry`])
//! - Commands: 16-byte requests and 12-byte acks over TCP ([`command`])
//!
//! All multi-byte fields are little-endian.

pub mod checksum;
pub mod command;
pub mod constants;
pub mod telemetry;

pub use checksum::AdditiveChecksum;
pub use command::{AckStatus, CommandAck, CommandRequest, CommandType, Device, Outcome};
pub use telemetry::{
    ActuatorPositions, LoadCells, Pressures, ServoPositions, Solenoids, SystemStatus,
    TelemetrySample,
};
