//! Additive frame checksum
//!
//! Every frame on the wire ends with a little-endian `u32` holding the sum of
//! all preceding bytes modulo 2^32. The stand-side firmware calls this a CRC;
//! it is not one. A plain sum is commutative, so it cannot detect reordered
//! bytes or pairs of errors that cancel out. It is kept bit-for-bit because
//! the peer validates frames the same way.

use crate::error::{Error, Result};

/// Running additive checksum over one or more byte slices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdditiveChecksum(u32);

impl AdditiveChecksum {
    pub const fn new() -> Self {
        Self(0)
    }

    /// Sum a whole slice in one call
    #[inline]
    pub fn compute(data: &[u8]) -> u32 {
        let mut sum = Self::new();
        sum.update(data);
        sum.value()
    }

    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        for &b in data {
            self.0 = self.0.wrapping_add(b as u32);
        }
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// Check the trailing 4-byte checksum of `frame`.
///
/// Returns the checksum on success. Frames shorter than the checksum field
/// itself fail with `BadLength`.
pub fn verify_trailing(frame: &[u8]) -> Result<u32> {
    let Some(body_len) = frame.len().checked_sub(4) else {
        return Err(Error::BadLength {
            expected: 4,
            actual: frame.len(),
        });
    };

    let (body, tail) = frame.split_at(body_len);
    let received = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
    let computed = AdditiveChecksum::compute(body);

    if received != computed {
        return Err(Error::ChecksumMismatch { received, computed });
    }
    Ok(received)
}

/// Overwrite the last four bytes of `frame` with the checksum of the rest.
///
/// Frames shorter than the checksum field are left untouched.
pub fn seal(frame: &mut [u8]) {
    let Some(body_len) = frame.len().checked_sub(4) else {
        return;
    };
    let sum = AdditiveChecksum::compute(&frame[..body_len]);
    frame[body_len..].copy_from_slice(&sum.to_le_bytes());
}
