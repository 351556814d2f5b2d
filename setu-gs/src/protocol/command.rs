//! Command request and acknowledgment frames
//!
//! Request (16 bytes, little-endian):
//!
//! ```text
//! ┌────────┬────────┬──────────┬────────┬───────┬────────┬──────────┐
//! │ ts u32 │ seq u16│ type u16 │ dev u8 │ val u8│ 0xABCD │ checksum │
//! └────────┴────────┴──────────┴────────┴───────┴────────┴──────────┘
//! ```
//!
//! The command type is a single byte carried in a 16-bit slot. The checksum
//! is the additive sum of the first 12 bytes.
//!
//! Acknowledgment (12 bytes): `ts u32, seq u16, status u16, reserved u32`.
//! Acks carry no checksum.

use super::checksum::{seal, verify_trailing};
use super::constants::*;
use crate::error::{Error, Result};
use std::fmt;

/// Command categories understood by the stand controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandType {
    Solenoid = CMD_SOLENOID,
    Servo = CMD_SERVO,
    Actuator = CMD_ACTUATOR,
    System = CMD_SYSTEM,
    StartSequence = CMD_START_SEQUENCE,
    AbortSequence = CMD_ABORT_SEQUENCE,
}

impl CommandType {
    pub const ALL: [CommandType; 6] = [
        CommandType::Solenoid,
        CommandType::Servo,
        CommandType::Actuator,
        CommandType::System,
        CommandType::StartSequence,
        CommandType::AbortSequence,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for CommandType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            CMD_SOLENOID => Ok(CommandType::Solenoid),
            CMD_SERVO => Ok(CommandType::Servo),
            CMD_ACTUATOR => Ok(CommandType::Actuator),
            CMD_SYSTEM => Ok(CommandType::System),
            CMD_START_SEQUENCE => Ok(CommandType::StartSequence),
            CMD_ABORT_SEQUENCE => Ok(CommandType::AbortSequence),
            other => Err(Error::UnknownCommandType(other)),
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandType::Solenoid => "solenoid",
            CommandType::Servo => "servo",
            CommandType::Actuator => "actuator",
            CommandType::System => "system",
            CommandType::StartSequence => "start_sequence",
            CommandType::AbortSequence => "abort_sequence",
        };
        f.write_str(name)
    }
}

/// Addressable devices on the stand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Device {
    RvvO = DEVICE_RVV_O,
    MpvP = DEVICE_MPV_P,
    RvvF = DEVICE_RVV_F,
    DotOxidizer = DEVICE_DOT_OXIDIZER,
    MpfF = DEVICE_MPF_F,
    OxidizerEngine = DEVICE_OXIDIZER_ENGINE,
    In1 = DEVICE_IN_1,
    Ac1 = DEVICE_AC_1,
    Ac2 = DEVICE_AC_2,
    System = DEVICE_SYSTEM,
}

impl Device {
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Command type that drives this device
    pub fn command_type(self) -> CommandType {
        match self {
            Device::RvvO | Device::MpvP | Device::RvvF => CommandType::Solenoid,
            Device::DotOxidizer | Device::MpfF | Device::OxidizerEngine => CommandType::Servo,
            Device::In1 | Device::Ac1 | Device::Ac2 => CommandType::Actuator,
            Device::System => CommandType::System,
        }
    }

    /// Telemetry channel name, as used in recordings and the console
    pub fn name(self) -> &'static str {
        match self {
            Device::RvvO => "rvv_o",
            Device::MpvP => "mpv_p",
            Device::RvvF => "rvv_f",
            Device::DotOxidizer => "dot_oxidizer",
            Device::MpfF => "mpf_f",
            Device::OxidizerEngine => "oxidizer_engine",
            Device::In1 => "in_1",
            Device::Ac1 => "ac_1",
            Device::Ac2 => "ac_2",
            Device::System => "system",
        }
    }

    /// Look up a device by its channel name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Device> {
        let name = name.to_ascii_lowercase();
        [
            Device::RvvO,
            Device::MpvP,
            Device::RvvF,
            Device::DotOxidizer,
            Device::MpfF,
            Device::OxidizerEngine,
            Device::In1,
            Device::Ac1,
            Device::Ac2,
            Device::System,
        ]
        .into_iter()
        .find(|d| d.name() == name)
    }
}

/// One outgoing command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRequest {
    pub timestamp_ms: u32,
    pub sequence_id: u16,
    pub command_type: CommandType,
    pub device_id: u8,
    pub value: u8,
}

impl CommandRequest {
    /// Build the 16-byte wire frame with verification code and checksum
    pub fn encode(&self) -> [u8; COMMAND_FRAME_SIZE] {
        let mut buf = [0u8; COMMAND_FRAME_SIZE];
        buf[OFFSET_CMD_TIMESTAMP..OFFSET_CMD_TIMESTAMP + 4]
            .copy_from_slice(&self.timestamp_ms.to_le_bytes());
        buf[OFFSET_CMD_SEQUENCE..OFFSET_CMD_SEQUENCE + 2]
            .copy_from_slice(&self.sequence_id.to_le_bytes());
        buf[OFFSET_CMD_TYPE..OFFSET_CMD_TYPE + 2]
            .copy_from_slice(&(self.command_type.as_u8() as u16).to_le_bytes());
        buf[OFFSET_CMD_DEVICE] = self.device_id;
        buf[OFFSET_CMD_VALUE] = self.value;
        buf[OFFSET_CMD_VERIFICATION..OFFSET_CMD_VERIFICATION + 2]
            .copy_from_slice(&VERIFICATION_CODE.to_le_bytes());
        seal(&mut buf);
        buf
    }

    /// Parse a request frame, as the stand controller would.
    ///
    /// Checks length, checksum, verification code and command type.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != COMMAND_FRAME_SIZE {
            return Err(Error::BadLength {
                expected: COMMAND_FRAME_SIZE,
                actual: bytes.len(),
            });
        }
        verify_trailing(bytes)?;

        let verification = u16::from_le_bytes([
            bytes[OFFSET_CMD_VERIFICATION],
            bytes[OFFSET_CMD_VERIFICATION + 1],
        ]);
        if verification != VERIFICATION_CODE {
            return Err(Error::InvalidParameter(format!(
                "verification code {:#06x}",
                verification
            )));
        }

        let raw_type = u16::from_le_bytes([bytes[OFFSET_CMD_TYPE], bytes[OFFSET_CMD_TYPE + 1]]);
        let type_byte = u8::try_from(raw_type).map_err(|_| {
            Error::InvalidParameter(format!("command type slot {:#06x}", raw_type))
        })?;

        Ok(Self {
            timestamp_ms: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            sequence_id: u16::from_le_bytes([
                bytes[OFFSET_CMD_SEQUENCE],
                bytes[OFFSET_CMD_SEQUENCE + 1],
            ]),
            command_type: CommandType::try_from(type_byte)?,
            device_id: bytes[OFFSET_CMD_DEVICE],
            value: bytes[OFFSET_CMD_VALUE],
        })
    }
}

/// Acknowledgment status as reported by the stand controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Success,
    InProgress,
    Rejected,
    InvalidCommand,
    DeviceNotResponding,
    ExecutionTimeout,
    Unknown(u16),
}

impl AckStatus {
    pub fn from_code(code: u16) -> Self {
        match code {
            STATUS_SUCCESS => AckStatus::Success,
            STATUS_IN_PROGRESS => AckStatus::InProgress,
            STATUS_REJECTED => AckStatus::Rejected,
            STATUS_INVALID_COMMAND => AckStatus::InvalidCommand,
            STATUS_DEVICE_NOT_RESPONDING => AckStatus::DeviceNotResponding,
            STATUS_EXECUTION_TIMEOUT => AckStatus::ExecutionTimeout,
            other => AckStatus::Unknown(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            AckStatus::Success => STATUS_SUCCESS,
            AckStatus::InProgress => STATUS_IN_PROGRESS,
            AckStatus::Rejected => STATUS_REJECTED,
            AckStatus::InvalidCommand => STATUS_INVALID_COMMAND,
            AckStatus::DeviceNotResponding => STATUS_DEVICE_NOT_RESPONDING,
            AckStatus::ExecutionTimeout => STATUS_EXECUTION_TIMEOUT,
            AckStatus::Unknown(code) => code,
        }
    }

    /// Operator-facing description
    pub fn message(self) -> String {
        match self {
            AckStatus::Success => "Success".to_string(),
            AckStatus::InProgress => "In progress".to_string(),
            AckStatus::Rejected => "Rejected (safety interlock)".to_string(),
            AckStatus::InvalidCommand => "Invalid command".to_string(),
            AckStatus::DeviceNotResponding => "Device not responding".to_string(),
            AckStatus::ExecutionTimeout => "Execution timeout".to_string(),
            AckStatus::Unknown(code) => format!("Unknown status code: {}", code),
        }
    }

    /// Only `Success` counts as an OK outcome; `InProgress` does not
    pub fn outcome(self) -> Outcome {
        if self == AckStatus::Success {
            Outcome::Ok
        } else {
            Outcome::Error
        }
    }
}

impl fmt::Display for AckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Coarse result of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Error,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ok => f.write_str("OK"),
            Outcome::Error => f.write_str("ERROR"),
        }
    }
}

/// Decoded acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandAck {
    pub timestamp_ms: u32,
    pub sequence_id: u16,
    pub status: AckStatus,
    pub reserved: u32,
}

impl CommandAck {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ACK_FRAME_SIZE {
            return Err(Error::BadLength {
                expected: ACK_FRAME_SIZE,
                actual: bytes.len(),
            });
        }
        let u16_at = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
        let u32_at =
            |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

        Ok(Self {
            timestamp_ms: u32_at(OFFSET_ACK_TIMESTAMP),
            sequence_id: u16_at(OFFSET_ACK_SEQUENCE),
            status: AckStatus::from_code(u16_at(OFFSET_ACK_STATUS)),
            reserved: u32_at(OFFSET_ACK_RESERVED),
        })
    }

    pub fn encode(&self) -> [u8; ACK_FRAME_SIZE] {
        let mut buf = [0u8; ACK_FRAME_SIZE];
        buf[OFFSET_ACK_TIMESTAMP..OFFSET_ACK_TIMESTAMP + 4]
            .copy_from_slice(&self.timestamp_ms.to_le_bytes());
        buf[OFFSET_ACK_SEQUENCE..OFFSET_ACK_SEQUENCE + 2]
            .copy_from_slice(&self.sequence_id.to_le_bytes());
        buf[OFFSET_ACK_STATUS..OFFSET_ACK_STATUS + 2]
            .copy_from_slice(&self.status.code().to_le_bytes());
        buf[OFFSET_ACK_RESERVED..OFFSET_ACK_RESERVED + 4]
            .copy_from_slice(&self.reserved.to_le_bytes());
        buf
    }

    pub fn outcome(&self) -> Outcome {
        self.status.outcome()
    }

    pub fn is_ok(&self) -> bool {
        self.outcome() == Outcome::Ok
    }

    pub fn message(&self) -> String {
        self.status.message()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::checksum::AdditiveChecksum;

    #[test]
    fn test_encode_system_arm() {
        let req = CommandRequest {
            timestamp_ms: 0x0102_0304,
            sequence_id: 7,
            command_type: CommandType::System,
            device_id: DEVICE_SYSTEM,
            value: 1,
        };
        let frame = req.encode();

        assert_eq!(&frame[0..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&frame[4..6], &[7, 0]);
        assert_eq!(&frame[6..8], &[CMD_SYSTEM, 0]);
        assert_eq!(frame[8], 0xFF);
        assert_eq!(frame[9], 1);
        assert_eq!(&frame[10..12], &[0xCD, 0xAB]);

        let sum = AdditiveChecksum::compute(&frame[..12]);
        assert_eq!(&frame[12..16], &sum.to_le_bytes());
    }

    #[test]
    fn test_request_decode() {
        let req = CommandRequest {
            timestamp_ms: 99,
            sequence_id: 65535,
            command_type: CommandType::Servo,
            device_id: DEVICE_MPF_F,
            value: 200,
        };
        assert_eq!(CommandRequest::decode(&req.encode()).unwrap(), req);

        let mut bad = req.encode();
        bad[OFFSET_CMD_VALUE] ^= 0x10;
        assert!(matches!(
            CommandRequest::decode(&bad),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_request_decode_rejects_unknown_type() {
        let mut frame = CommandRequest {
            timestamp_ms: 0,
            sequence_id: 0,
            command_type: CommandType::Solenoid,
            device_id: 1,
            value: 1,
        }
        .encode();
        frame[OFFSET_CMD_TYPE] = 0x09;
        seal(&mut frame);
        assert!(matches!(
            CommandRequest::decode(&frame),
            Err(Error::UnknownCommandType(0x09))
        ));
    }

    #[test]
    fn test_request_decode_rejects_wide_type() {
        let mut frame = CommandRequest {
            timestamp_ms: 0,
            sequence_id: 0,
            command_type: CommandType::Servo,
            device_id: 4,
            value: 1,
        }
        .encode();
        frame[OFFSET_CMD_TYPE + 1] = 0x01;
        seal(&mut frame);
        match CommandRequest::decode(&frame) {
            Err(Error::InvalidParameter(msg)) => assert!(msg.contains("0x0102"), "{}", msg),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_command_type_conversion() {
        for t in CommandType::ALL {
            assert_eq!(CommandType::try_from(t.as_u8()).unwrap(), t);
        }
        assert!(matches!(
            CommandType::try_from(0),
            Err(Error::UnknownCommandType(0))
        ));
        assert!(matches!(
            CommandType::try_from(7),
            Err(Error::UnknownCommandType(7))
        ));
    }

    #[test]
    fn test_device_command_types() {
        assert_eq!(Device::RvvF.command_type(), CommandType::Solenoid);
        assert_eq!(Device::OxidizerEngine.command_type(), CommandType::Servo);
        assert_eq!(Device::Ac2.command_type(), CommandType::Actuator);
        assert_eq!(Device::System.command_type(), CommandType::System);
        assert_eq!(Device::from_name("MPV_P"), Some(Device::MpvP));
        assert_eq!(Device::from_name("nope"), None);
        assert_eq!(Device::DotOxidizer.id(), 4);
    }

    #[test]
    fn test_ack_decode() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&500u32.to_le_bytes());
        raw.extend_from_slice(&3u16.to_le_bytes());
        raw.extend_from_slice(&2u16.to_le_bytes());
        raw.extend_from_slice(&0u32.to_le_bytes());

        let ack = CommandAck::decode(&raw).unwrap();
        assert_eq!(ack.timestamp_ms, 500);
        assert_eq!(ack.sequence_id, 3);
        assert_eq!(ack.status, AckStatus::Rejected);
        assert_eq!(ack.message(), "Rejected (safety interlock)");
        assert_eq!(ack.outcome(), Outcome::Error);
        assert_eq!(ack.encode().as_slice(), raw.as_slice());
    }

    #[test]
    fn test_ack_bad_length() {
        assert!(matches!(
            CommandAck::decode(&[0u8; 11]),
            Err(Error::BadLength {
                expected: 12,
                actual: 11
            })
        ));
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(AckStatus::from_code(0).outcome(), Outcome::Ok);
        assert_eq!(AckStatus::from_code(1).message(), "In progress");
        assert_eq!(AckStatus::from_code(1).outcome(), Outcome::Error);
        assert_eq!(AckStatus::from_code(4).message(), "Device not responding");
        assert_eq!(AckStatus::from_code(5).message(), "Execution timeout");
        assert_eq!(AckStatus::from_code(3).message(), "Invalid command");
        assert_eq!(AckStatus::from_code(99).message(), "Unknown status code: 99");
        assert_eq!(AckStatus::from_code(99).code(), 99);
        assert_eq!(Outcome::Ok.to_string(), "OK");
    }
}
