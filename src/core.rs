//! Wire-level constants shared by the encoder, the decoder and the link arbiter.
//!
//! A frame on the wire looks like:
//!
//! ```text
//! 00 00 | FF-node | seq | header | payload ... | crc16 LE | 00 00
//! break |<------------- zero-escaped ------------------->| break
//! ```

/// In-band delimiter. Two consecutive delimiters form a break.
pub const DELIMITER: u8 = 0x00;

/// Frame boundary: two literal delimiters, never produced by the escaping writer.
pub const BREAK: [u8; 2] = [DELIMITER, DELIMITER];

/// Size of the node identifier space.
pub const MAX_NODES: u8 = 0x40;

/// Reserved node id addressing every node on a link.
pub const BROADCAST_NODE: u8 = MAX_NODES - 1;

/// Largest buffer accepted by a single transmit write.
pub const TRANSMIT_MAX: usize = 1 << 9;

/// Smallest receive assembly buffer a link accepts.
pub const MIN_RX_CAPACITY: usize = 0x21;

/// Sequence byte plus little-endian CRC16: the smallest assembly that can be a frame.
pub const MIN_FRAME_ASSEMBLY: usize = 1 + CRC_LEN;

/// Length of the trailing CRC16.
pub const CRC_LEN: usize = 2;

/// Header byte values reserved by the stack. Applications allocate their own
/// types inside the blocks starting at [`TELEMLINK`](datagram_type::TELEMLINK),
/// [`ALPHALINK`](datagram_type::ALPHALINK) and [`HOSTLINK`](datagram_type::HOSTLINK).
pub mod datagram_type {
    /// Periodic keep-alive with no payload.
    pub const HEARTBEAT: u8 = 0;
    /// Diagnostic text stream.
    pub const CONSOLE: u8 = 1;
    /// Telemetry block.
    pub const TELEMLINK: u8 = 0x20;
    /// Flight-computer link block.
    pub const ALPHALINK: u8 = 0x80;
    /// Host link block.
    pub const HOSTLINK: u8 = 0xC0;
}

/// Address marker byte for `node`. Never equals [`DELIMITER`] for a valid node.
#[inline]
pub const fn address_marker(node: u8) -> u8 {
    0xFF - node
}

/// Decode an address marker byte, returning `None` when it does not name a valid node.
#[inline]
pub const fn node_from_marker(byte: u8) -> Option<u8> {
    let node = 0xFF - byte;
    if node < MAX_NODES {
        Some(node)
    } else {
        None
    }
}

/// Whether `node` is inside the node id space (broadcast included).
#[inline]
pub const fn is_valid_node(node: u8) -> bool {
    node < MAX_NODES
}
