//! Wire constants shared with the stand-side peer

// Telemetry record (UDP, 62 bytes)
pub const TELEMETRY_RECORD_SIZE: usize = 62;
pub const OFFSET_TIMESTAMP: usize = 0; // u32 ms
pub const OFFSET_PACKET_COUNTER: usize = 4; // u16
pub const OFFSET_PRESSURES: usize = 6; // f32 x6
pub const OFFSET_LOAD_CELLS: usize = 30; // f32 x4
pub const OFFSET_TEMPERATURE: usize = 46; // f32
pub const OFFSET_SOLENOID_BITS: usize = 50; // u8
pub const OFFSET_SERVOS: usize = 51; // u8 x3
pub const OFFSET_ACTUATORS: usize = 54; // u8 x3
pub const OFFSET_STATUS_BITS: usize = 57; // u8
pub const OFFSET_CHECKSUM: usize = 58; // u32

pub const PRESSURE_CHANNELS: usize = 6;
pub const LOAD_CELL_CHANNELS: usize = 4;

// Solenoid bitfield
pub const FLAG_RVV_O: u8 = 0x01;
pub const FLAG_MPV_P: u8 = 0x02;
pub const FLAG_RVV_F: u8 = 0x04;

// Status bitfield
pub const FLAG_ARMED: u8 = 0x01;
pub const FLAG_RECORDING: u8 = 0x02;
pub const FLAG_ERROR: u8 = 0x04;

// Command frame (TCP, 16 bytes)
pub const COMMAND_FRAME_SIZE: usize = 16;
pub const OFFSET_CMD_TIMESTAMP: usize = 0; // u32 ms
pub const OFFSET_CMD_SEQUENCE: usize = 4; // u16
pub const OFFSET_CMD_TYPE: usize = 6; // u16 slot, u8 value
pub const OFFSET_CMD_DEVICE: usize = 8; // u8
pub const OFFSET_CMD_VALUE: usize = 9; // u8
pub const OFFSET_CMD_VERIFICATION: usize = 10; // u16
pub const OFFSET_CMD_CHECKSUM: usize = 12; // u32

/// Fixed verification code carried by every command frame
pub const VERIFICATION_CODE: u16 = 0xABCD;

// Acknowledgment frame (TCP, 12 bytes)
pub const ACK_FRAME_SIZE: usize = 12;
pub const OFFSET_ACK_TIMESTAMP: usize = 0; // u32 ms
pub const OFFSET_ACK_SEQUENCE: usize = 4; // u16
pub const OFFSET_ACK_STATUS: usize = 6; // u16
pub const OFFSET_ACK_RESERVED: usize = 8; // u32

// Command types
pub const CMD_SOLENOID: u8 = 0x01;
pub const CMD_SERVO: u8 = 0x02;
pub const CMD_ACTUATOR: u8 = 0x03;
pub const CMD_SYSTEM: u8 = 0x04;
pub const CMD_START_SEQUENCE: u8 = 0x05;
pub const CMD_ABORT_SEQUENCE: u8 = 0x06;

// Device ids
pub const DEVICE_RVV_O: u8 = 0x01; // Oxidizer vent valve
pub const DEVICE_MPV_P: u8 = 0x02; // Main pressurant valve
pub const DEVICE_RVV_F: u8 = 0x03; // Fuel vent valve
pub const DEVICE_DOT_OXIDIZER: u8 = 0x04; // Oxidizer dump servo
pub const DEVICE_MPF_F: u8 = 0x05; // Main fuel servo
pub const DEVICE_OXIDIZER_ENGINE: u8 = 0x06; // Oxidizer-to-engine servo
pub const DEVICE_IN_1: u8 = 0x07; // Injector actuator
pub const DEVICE_AC_1: u8 = 0x08;
pub const DEVICE_AC_2: u8 = 0x09;
pub const DEVICE_SYSTEM: u8 = 0xFF; // System-wide target

// Ack status codes
pub const STATUS_SUCCESS: u16 = 0x00;
pub const STATUS_IN_PROGRESS: u16 = 0x01;
pub const STATUS_REJECTED: u16 = 0x02;
pub const STATUS_INVALID_COMMAND: u16 = 0x03;
pub const STATUS_DEVICE_NOT_RESPONDING: u16 = 0x04;
pub const STATUS_EXECUTION_TIMEOUT: u16 = 0x05;
