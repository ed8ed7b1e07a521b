//! Protocol-agnostic building blocks.
pub mod channel;
pub mod crc;
