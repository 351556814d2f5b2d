//! Telemetry record codec
//!
//! Record layout (little-endian, 62 bytes):
//!
//! ```text
//! ┌────────┬─────────┬──────────────┬──────────────┬──────┬─────┬──────┬──────┬────────┬──────────┐
//! │ ts u32 │ cnt u16 │ pressure f32 │ load    f32  │ tc_1 │ sol │ servo│ act  │ status │ checksum │
//! │   0    │    4    │ x6 @ 6       │ x4 @ 30      │ @ 46 │ @50 │ x3@51│ x3@54│  @57   │ u32 @ 58 │
//! └────────┴─────────┴──────────────┴──────────────┴──────┴─────┴──────┴──────┴────────┴──────────┘
//! ```
//!
//! The checksum covers bytes 0..58. Decoding validates length first, then the
//! checksum, and only then unpacks fields.

use super::checksum::{seal, verify_trailing};
use super::constants::*;
use crate::error::{Error, Result};

/// Pressure transducer readings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pressures {
    pub pt_o1_3: f32,
    pub pt_o2_2: f32,
    pub pt_p1_6: f32,
    pub pt_f2_4: f32,
    pub pt_f1_5: f32,
    pub pt_f2_4_engine: f32,
}

impl Pressures {
    /// Wire order
    pub fn to_array(&self) -> [f32; PRESSURE_CHANNELS] {
        [
            self.pt_o1_3,
            self.pt_o2_2,
            self.pt_p1_6,
            self.pt_f2_4,
            self.pt_f1_5,
            self.pt_f2_4_engine,
        ]
    }

    pub fn from_array(v: [f32; PRESSURE_CHANNELS]) -> Self {
        Self {
            pt_o1_3: v[0],
            pt_o2_2: v[1],
            pt_p1_6: v[2],
            pt_f2_4: v[3],
            pt_f1_5: v[4],
            pt_f2_4_engine: v[5],
        }
    }
}

/// Load cell readings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadCells {
    pub lc_1: f32,
    pub lc_2: f32,
    pub lc_3: f32,
    pub lc_4: f32,
}

impl LoadCells {
    pub fn to_array(&self) -> [f32; LOAD_CELL_CHANNELS] {
        [self.lc_1, self.lc_2, self.lc_3, self.lc_4]
    }

    pub fn from_array(v: [f32; LOAD_CELL_CHANNELS]) -> Self {
        Self {
            lc_1: v[0],
            lc_2: v[1],
            lc_3: v[2],
            lc_4: v[3],
        }
    }
}

/// Solenoid valve states (true = open)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Solenoids {
    pub rvv_o: bool,
    pub mpv_p: bool,
    pub rvv_f: bool,
}

impl Solenoids {
    pub fn from_bits(bits: u8) -> Self {
        Self {
            rvv_o: bits & FLAG_RVV_O != 0,
            mpv_p: bits & FLAG_MPV_P != 0,
            rvv_f: bits & FLAG_RVV_F != 0,
        }
    }

    pub fn to_bits(&self) -> u8 {
        let mut bits = 0;
        if self.rvv_o {
            bits |= FLAG_RVV_O;
        }
        if self.mpv_p {
            bits |= FLAG_MPV_P;
        }
        if self.rvv_f {
            bits |= FLAG_RVV_F;
        }
        bits
    }
}

/// Servo valve positions (0-255)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServoPositions {
    pub dot_oxidizer: u8,
    pub mpf_f: u8,
    pub oxidizer_engine: u8,
}

/// Linear actuator positions (0-255)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActuatorPositions {
    pub in_1: u8,
    pub ac_1: u8,
    pub ac_2: u8,
}

/// Controller status flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemStatus {
    pub armed: bool,
    pub recording: bool,
    pub error: bool,
}

impl SystemStatus {
    pub fn from_bits(bits: u8) -> Self {
        Self {
            armed: bits & FLAG_ARMED != 0,
            recording: bits & FLAG_RECORDING != 0,
            error: bits & FLAG_ERROR != 0,
        }
    }

    pub fn to_bits(&self) -> u8 {
        let mut bits = 0;
        if self.armed {
            bits |= FLAG_ARMED;
        }
        if self.recording {
            bits |= FLAG_RECORDING;
        }
        if self.error {
            bits |= FLAG_ERROR;
        }
        bits
    }
}

/// One decoded, validated sensor record
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetrySample {
    /// Peer clock, milliseconds
    pub timestamp_ms: u32,
    /// Peer-side packet counter (wraps at 65536)
    pub packet_counter: u16,
    pub pressures: Pressures,
    pub load_cells: LoadCells,
    /// Thermocouple tc_1
    pub temperature: f32,
    pub solenoids: Solenoids,
    pub servos: ServoPositions,
    pub actuators: ActuatorPositions,
    pub status: SystemStatus,
    /// Checksum as carried on the wire
    pub checksum: u32,
}

impl TelemetrySample {
    /// Decode a datagram into a sample.
    ///
    /// Fails with `BadLength` unless `bytes` is exactly one record and with
    /// `ChecksumMismatch` if the trailing sum does not match.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != TELEMETRY_RECORD_SIZE {
            return Err(Error::BadLength {
                expected: TELEMETRY_RECORD_SIZE,
                actual: bytes.len(),
            });
        }
        let checksum = verify_trailing(bytes)?;

        let mut pressures = [0f32; PRESSURE_CHANNELS];
        for (i, p) in pressures.iter_mut().enumerate() {
            *p = read_f32(bytes, OFFSET_PRESSURES + i * 4);
        }
        let mut load_cells = [0f32; LOAD_CELL_CHANNELS];
        for (i, lc) in load_cells.iter_mut().enumerate() {
            *lc = read_f32(bytes, OFFSET_LOAD_CELLS + i * 4);
        }

        Ok(Self {
            timestamp_ms: read_u32(bytes, OFFSET_TIMESTAMP),
            packet_counter: read_u16(bytes, OFFSET_PACKET_COUNTER),
            pressures: Pressures::from_array(pressures),
            load_cells: LoadCells::from_array(load_cells),
            temperature: read_f32(bytes, OFFSET_TEMPERATURE),
            solenoids: Solenoids::from_bits(bytes[OFFSET_SOLENOID_BITS]),
            servos: ServoPositions {
                dot_oxidizer: bytes[OFFSET_SERVOS],
                mpf_f: bytes[OFFSET_SERVOS + 1],
                oxidizer_engine: bytes[OFFSET_SERVOS + 2],
            },
            actuators: ActuatorPositions {
                in_1: bytes[OFFSET_ACTUATORS],
                ac_1: bytes[OFFSET_ACTUATORS + 1],
                ac_2: bytes[OFFSET_ACTUATORS + 2],
            },
            status: SystemStatus::from_bits(bytes[OFFSET_STATUS_BITS]),
            checksum,
        })
    }

    /// Encode into a wire record.
    ///
    /// The checksum is always recomputed; `self.checksum` is ignored.
    pub fn encode(&self) -> [u8; TELEMETRY_RECORD_SIZE] {
        let mut buf = [0u8; TELEMETRY_RECORD_SIZE];
        buf[OFFSET_TIMESTAMP..OFFSET_TIMESTAMP + 4].copy_from_slice(&self.timestamp_ms.to_le_bytes());
        buf[OFFSET_PACKET_COUNTER..OFFSET_PACKET_COUNTER + 2]
            .copy_from_slice(&self.packet_counter.to_le_bytes());
        for (i, p) in self.pressures.to_array().iter().enumerate() {
            let at = OFFSET_PRESSURES + i * 4;
            buf[at..at + 4].copy_from_slice(&p.to_le_bytes());
        }
        for (i, lc) in self.load_cells.to_array().iter().enumerate() {
            let at = OFFSET_LOAD_CELLS + i * 4;
            buf[at..at + 4].copy_from_slice(&lc.to_le_bytes());
        }
        buf[OFFSET_TEMPERATURE..OFFSET_TEMPERATURE + 4].copy_from_slice(&self.temperature.to_le_bytes());
        buf[OFFSET_SOLENOID_BITS] = self.solenoids.to_bits();
        buf[OFFSET_SERVOS] = self.servos.dot_oxidizer;
        buf[OFFSET_SERVOS + 1] = self.servos.mpf_f;
        buf[OFFSET_SERVOS + 2] = self.servos.oxidizer_engine;
        buf[OFFSET_ACTUATORS] = self.actuators.in_1;
        buf[OFFSET_ACTUATORS + 1] = self.actuators.ac_1;
        buf[OFFSET_ACTUATORS + 2] = self.actuators.ac_2;
        buf[OFFSET_STATUS_BITS] = self.status.to_bits();
        seal(&mut buf);
        buf
    }

    /// Copy of this sample with `checksum` set to what `encode` would emit
    pub fn sealed(mut self) -> Self {
        let bytes = self.encode();
        self.checksum = read_u32(&bytes, OFFSET_CHECKSUM);
        self
    }
}

#[inline]
fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

#[inline]
fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

#[inline]
fn read_f32(buf: &[u8], at: usize) -> f32 {
    f32::from_bits(read_u32(buf, at))
}
