//! Command round trips with per-channel sequence numbering
//!
//! Each `send` opens a fresh connection, reserves the next sequence id,
//! writes one request frame and blocks for exactly one ack frame. The
//! connection is dropped on every exit path. There are no retries; sending
//! again uses a new sequence id.

use std::time::Duration;

use log::{debug, warn};
use parking_lot::Mutex;

use super::transport::CommandTransport;
use crate::error::{Error, Result};
use crate::protocol::constants::DEVICE_SYSTEM;
use crate::protocol::{CommandAck, CommandRequest, CommandType, Device};

/// Client side of the command link
pub struct CommandChannel {
    transport: Box<dyn CommandTransport>,
    sequence: Mutex<u16>,
    default_timeout: Duration,
}

impl CommandChannel {
    pub fn new(transport: Box<dyn CommandTransport>, default_timeout: Duration) -> Self {
        Self {
            transport,
            sequence: Mutex::new(0),
            default_timeout,
        }
    }

    /// Last sequence id handed out (0 before the first send)
    pub fn last_sequence(&self) -> u16 {
        *self.sequence.lock()
    }

    fn reserve_sequence(&self) -> u16 {
        let mut seq = self.sequence.lock();
        *seq = seq.wrapping_add(1);
        *seq
    }

    /// Run one command round trip.
    ///
    /// `timeout` bounds the connect and, separately, the wait for the ack.
    /// The sequence id is only consumed once the connection is up.
    pub fn send(
        &self,
        command_type: CommandType,
        device_id: u8,
        value: u8,
        timeout: Duration,
    ) -> Result<CommandAck> {
        if timeout.is_zero() {
            return Err(Error::InvalidParameter("timeout must be non-zero".into()));
        }

        let mut link = self.transport.open(timeout).inspect_err(|e| {
            warn!(
                "Command {} dev={} val={}: connect to {} failed: {}",
                command_type,
                device_id,
                value,
                self.transport.describe(),
                e
            );
        })?;

        let request = CommandRequest {
            timestamp_ms: wall_clock_ms(),
            sequence_id: self.reserve_sequence(),
            command_type,
            device_id,
            value,
        };

        let raw = link.exchange(&request.encode(), timeout).inspect_err(|e| {
            warn!(
                "Command seq={} {} dev={} val={} failed: {}",
                request.sequence_id, command_type, device_id, value, e
            );
        })?;
        drop(link);

        let ack = CommandAck::decode(&raw)?;
        if ack.sequence_id != request.sequence_id {
            warn!(
                "Ack sequence {} does not match request {}",
                ack.sequence_id, request.sequence_id
            );
        }
        debug!(
            "Command seq={} {} dev={} val={} -> {} ({})",
            request.sequence_id,
            command_type,
            device_id,
            value,
            ack.outcome(),
            ack.message()
        );
        Ok(ack)
    }

    /// `send` with a raw command type byte
    pub fn send_raw(
        &self,
        command_type: u8,
        device_id: u8,
        value: u8,
        timeout: Duration,
    ) -> Result<CommandAck> {
        self.send(CommandType::try_from(command_type)?, device_id, value, timeout)
    }

    fn send_to(&self, device: Device, expected: CommandType, value: u8) -> Result<CommandAck> {
        if device.command_type() != expected {
            return Err(Error::InvalidParameter(format!(
                "{} is not a {} device",
                device.name(),
                expected
            )));
        }
        self.send(expected, device.id(), value, self.default_timeout)
    }

    /// Open or close a solenoid valve
    pub fn set_valve(&self, device: Device, open: bool) -> Result<CommandAck> {
        self.send_to(device, CommandType::Solenoid, open as u8)
    }

    pub fn set_servo(&self, device: Device, position: u8) -> Result<CommandAck> {
        self.send_to(device, CommandType::Servo, position)
    }

    pub fn set_actuator(&self, device: Device, position: u8) -> Result<CommandAck> {
        self.send_to(device, CommandType::Actuator, position)
    }

    /// Arm or disarm the stand
    pub fn arm(&self, armed: bool) -> Result<CommandAck> {
        self.send(CommandType::System, DEVICE_SYSTEM, armed as u8, self.default_timeout)
    }

    pub fn start_sequence(&self) -> Result<CommandAck> {
        self.send(CommandType::StartSequence, DEVICE_SYSTEM, 1, self.default_timeout)
    }

    pub fn abort_sequence(&self) -> Result<CommandAck> {
        self.send(CommandType::AbortSequence, DEVICE_SYSTEM, 1, self.default_timeout)
    }

    #[cfg(test)]
    pub(crate) fn set_last_sequence(&self, seq: u16) {
        *self.sequence.lock() = seq;
    }
}

/// Wall-clock milliseconds, truncated to the 32-bit wire field
fn wall_clock_ms() -> u32 {
    chrono::Utc::now().timestamp_millis() as u32
}
