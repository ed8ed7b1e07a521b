//! Receive-side frame decoder: a byte-at-a-time state machine reversing the
//! zero-escaping, reassembling the frame into a fixed buffer and validating its
//! CRC when the closing break arrives.
//!
//! Only one frame is assembled at a time. Frames from two talkers interleaved
//! between the same pair of breaks cannot be told apart; the link relies on a
//! single talker per break.
use crate::core::{
    address_marker, node_from_marker, BROADCAST_NODE, CRC_LEN, DELIMITER, MIN_FRAME_ASSEMBLY,
};
use crate::error::LinkError;
use crate::infra::crc::Crc16;

//==================================================================================Enums and Structs
/// Position of the decoder relative to frame boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    /// Out of sync: waiting for a break, incoming bytes are not stored.
    Idle,
    /// A break was seen; the next non-delimiter byte is an address marker.
    Addressing,
    /// Assembling a frame from `node`. `accepted` is false for frames addressed
    /// to another node, which are tracked but neither stored nor dispatched.
    Receiving { node: u8, accepted: bool },
}

/// A frame that passed the CRC check. Borrows the decoder's assembly buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedFrame<'a> {
    /// Node taken from the address marker.
    pub node: u8,
    /// Sequence byte.
    pub sequence: u8,
    /// Everything after the sequence byte and before the CRC: header byte then payload.
    pub data: &'a [u8],
}

impl<'a> CompletedFrame<'a> {
    /// Header byte, absent on a frame that only carried a sequence byte.
    pub fn header(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Payload following the header byte.
    pub fn body(&self) -> &'a [u8] {
        self.data.get(1..).unwrap_or(&[])
    }
}

/// Outcome of feeding one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxEvent<'a> {
    /// A valid frame was completed.
    Frame(CompletedFrame<'a>),
    /// A frame was rejected.
    Error(LinkError),
}

/// Receive assembly state for one link, with an `N`-byte assembly buffer.
#[derive(Debug)]
pub struct FrameDecoder<const N: usize> {
    local_node: u8,
    state: RxState,
    delimiters: u8,
    buffer: [u8; N],
    len: usize,
    overflow: bool,
    crc: Crc16,
}

impl<const N: usize> FrameDecoder<N> {
    /// Decoder for a link whose local node is `local_node`. Node `0` accepts
    /// every frame; any other node only accepts its own and broadcast frames.
    pub fn new(local_node: u8) -> Self {
        Self {
            local_node,
            state: RxState::Idle,
            delimiters: 0,
            buffer: [0; N],
            len: 0,
            overflow: false,
            crc: Crc16::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Number of bytes assembled for the frame in progress.
    pub fn assembled(&self) -> usize {
        self.len
    }

    /// Drop any frame in progress and wait for the next break.
    pub fn reset(&mut self) {
        self.state = RxState::Idle;
        self.delimiters = 0;
        self.len = 0;
        self.overflow = false;
    }

    fn accepts(&self, node: u8) -> bool {
        self.local_node == 0 || node == self.local_node || node == BROADCAST_NODE
    }

    //==================================================================================Process Functions
    /// Advance the state machine by one raw byte.
    pub fn feed(&mut self, byte: u8) -> Option<RxEvent<'_>> {
        if byte == DELIMITER {
            self.delimiters = self.delimiters.saturating_add(1);
            if self.delimiters < 2 {
                return None;
            }
            // A break closes the frame in progress and opens the next one.
            return match core::mem::replace(&mut self.state, RxState::Addressing) {
                RxState::Receiving {
                    node,
                    accepted: true,
                } => self.complete(node),
                _ => None,
            };
        }

        let pending_delimiters = core::mem::take(&mut self.delimiters);

        match self.state {
            RxState::Idle => None,
            RxState::Addressing => self.start(byte),
            RxState::Receiving { accepted, .. } => {
                if accepted && !self.overflow {
                    if pending_delimiters == 1 {
                        // Escape pair: `byte` counts delimiter-valued payload bytes.
                        for _ in 0..byte {
                            if !self.store(DELIMITER) {
                                break;
                            }
                        }
                    } else {
                        self.store(byte);
                    }
                }
                None
            }
        }
    }

    fn start(&mut self, marker: u8) -> Option<RxEvent<'_>> {
        match node_from_marker(marker) {
            Some(node) => {
                let accepted = self.accepts(node);
                self.state = RxState::Receiving { node, accepted };
                self.len = 0;
                self.overflow = false;
                self.crc.reset();
                self.crc.push(address_marker(node));

                #[cfg(feature = "defmt")]
                defmt::trace!("frame start from node {} (accepted: {})", node, accepted);

                None
            }
            None => {
                self.state = RxState::Idle;

                #[cfg(feature = "defmt")]
                defmt::debug!("invalid address byte {:#x}, waiting for break", marker);

                Some(RxEvent::Error(LinkError::BadAddress { byte: marker }))
            }
        }
    }

    /// Append one byte, returning false (and flagging overflow) when full.
    fn store(&mut self, byte: u8) -> bool {
        if self.len < N {
            self.buffer[self.len] = byte;
            self.len += 1;
            true
        } else {
            self.overflow = true;
            false
        }
    }

    fn complete(&mut self, node: u8) -> Option<RxEvent<'_>> {
        let len = core::mem::take(&mut self.len);

        if core::mem::take(&mut self.overflow) {
            #[cfg(feature = "defmt")]
            defmt::warn!("frame from node {} overflowed the {} byte assembly buffer", node, N);

            return Some(RxEvent::Error(LinkError::Overflow));
        }

        if len < MIN_FRAME_ASSEMBLY {
            return None;
        }

        let body_len = len - CRC_LEN;
        let received = u16::from_le_bytes([self.buffer[body_len], self.buffer[body_len + 1]]);
        self.crc.push_slice(&self.buffer[..body_len]);

        if self.crc.value() != received {
            #[cfg(feature = "defmt")]
            defmt::debug!(
                "CRC mismatch from node {}: computed {:#x}, received {:#x}",
                node,
                self.crc.value(),
                received
            );

            return Some(RxEvent::Error(LinkError::Crc { received }));
        }

        Some(RxEvent::Frame(CompletedFrame {
            node,
            sequence: self.buffer[0],
            data: &self.buffer[1..body_len],
        }))
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
