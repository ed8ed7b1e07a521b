//! Frame CRC: CRC-16/MODBUS (reflected polynomial `0xA001`, seeded with
//! `0xFFFF`, no final xor), computed by the `crc` crate. [`Crc16`] wraps a
//! [`crc::Digest`] so that both ends can fold bytes in while streaming.
use core::fmt;

use crc::{Crc, Digest, CRC_16_MODBUS};

/// Algorithm shared by the encoder and the decoder.
pub static FRAME_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Seed of every frame CRC, i.e. the value of an empty accumulator.
pub const CRC_INIT: u16 = CRC_16_MODBUS.init;

/// CRC of a whole buffer.
pub fn crc16(data: &[u8]) -> u16 {
    FRAME_CRC.checksum(data)
}

/// Streaming CRC16 accumulator.
#[derive(Clone)]
pub struct Crc16 {
    digest: Digest<'static, u16>,
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Crc16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Crc16").field(&self.value()).finish()
    }
}

impl Crc16 {
    pub fn new() -> Self {
        Self {
            digest: FRAME_CRC.digest(),
        }
    }

    /// Restart from [`CRC_INIT`].
    #[inline]
    pub fn reset(&mut self) {
        self.digest = FRAME_CRC.digest();
    }

    /// Fold one byte.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.digest.update(&[byte]);
    }

    /// Fold a buffer.
    #[inline]
    pub fn push_slice(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    /// CRC of everything folded so far.
    #[inline]
    pub fn value(&self) -> u16 {
        self.digest.clone().finalize()
    }
}
