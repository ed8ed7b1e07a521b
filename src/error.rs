//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (framing, integrity, capacity,
//! transport, configuration).
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Non-fatal link errors. They are reported through
/// [`LinkHandler::on_error`](crate::protocol::link::traits::link_handler::LinkHandler::on_error)
/// and never affect more than the frame they were raised for.
pub enum LinkError {
    /// A single write exceeded [`TRANSMIT_MAX`](crate::core::TRANSMIT_MAX); nothing was sent.
    #[error("Write of {len} bytes exceeds the transmit limit")]
    TransmitTooLong { len: usize },
    /// The byte following a break does not name a valid node.
    #[error("Invalid address byte {byte:#04x} at frame start")]
    BadAddress { byte: u8 },
    /// The trailing CRC does not match the frame contents.
    #[error("CRC mismatch, received {received:#06x}")]
    Crc { received: u16 },
    /// The frame did not fit in the receive assembly buffer.
    #[error("Receive assembly buffer overflow")]
    Overflow,
}

impl LinkError {
    /// Short symbolic reason, stable across releases (suitable for compact logs).
    pub const fn reason(&self) -> &'static str {
        match self {
            LinkError::TransmitTooLong { .. } => "TX_MAX",
            LinkError::BadAddress { .. } => "BAD",
            LinkError::Crc { .. } => "CRC",
            LinkError::Overflow => "OVERFLOW",
        }
    }

    /// Numeric detail accompanying [`reason`](Self::reason).
    pub const fn code(&self) -> u16 {
        match self {
            LinkError::TransmitTooLong { len } => {
                if *len > u16::MAX as usize {
                    u16::MAX
                } else {
                    *len as u16
                }
            }
            LinkError::BadAddress { byte } => *byte as u16,
            LinkError::Crc { received } => *received,
            LinkError::Overflow => 0,
        }
    }
}

//==================================================================================TX_ERROR
#[derive(Debug, Error)]
/// Errors returned by the transmit path of a link.
pub enum TxError<E: core::fmt::Debug> {
    /// Non-blocking start found another transmission in progress; no frame was sent.
    #[error("Link busy: another transmission holds the link")]
    Busy,
    /// Destination is outside the node id space.
    #[error("Invalid destination node {node}")]
    InvalidNode { node: u8 },
    /// Link-level rejection, also reported to the link handler.
    #[error(transparent)]
    Link(#[from] LinkError),
    /// The transport refused or failed to write.
    #[error("Transport error: {0:?}")]
    Transport(E),
}

//==================================================================================ENCODE_ERROR
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised while serializing a complete frame into a buffer.
pub enum EncodeError {
    /// Output buffer cannot hold the escaped frame.
    #[error("Buffer too small")]
    BufferTooSmall,
    /// Node is outside the node id space.
    #[error("Invalid node {node}")]
    InvalidNode { node: u8 },
}

//==================================================================================CHANNEL_ERROR
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised while setting up a byte channel.
pub enum ChannelError {
    /// Backing storage length is not a power of two of at least 2.
    #[error("Channel storage of {len} bytes is not a power of two >= 2")]
    InvalidCapacity { len: usize },
}

//==================================================================================CONFIG_ERROR
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised while creating a link.
pub enum ConfigError {
    /// Local node id is outside the node id space.
    #[error("Invalid local node {node}")]
    InvalidNode { node: u8 },
}
