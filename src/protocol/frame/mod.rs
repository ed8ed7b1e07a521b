//! Datagram framing: zero-escaping encoder and byte-at-a-time decoder.
//!
//! Delimiter-valued bytes inside a frame never appear literally. A run of `n`
//! of them (1 to 255) is sent as the pair `(0x00, n)`, longer runs as several
//! pairs. The only place two adjacent `0x00` bytes can occur is a break.
pub mod decoder;
pub mod encoder;

/// Longest run of delimiter-valued bytes a single escape pair can describe.
pub const MAX_ESCAPE_RUN: usize = 0xFF;

/// Worst-case encoded size of a frame carrying `payload_len` payload bytes,
/// breaks included (every other byte a delimiter doubles the body).
pub const fn max_encoded_len(payload_len: usize) -> usize {
    // marker + sequence + header + payload + crc, each possibly escaped, plus two breaks.
    2 * (3 + payload_len + crate::core::CRC_LEN) + 2 * crate::core::BREAK.len()
}
