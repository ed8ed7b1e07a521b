//! Receive-side callbacks.
use crate::error::LinkError;

/// Consumer of decoded frames and link error reports.
///
/// Callbacks run synchronously inside
/// [`Link::receive_bytes`](crate::protocol::link::Link::receive_bytes) and must
/// not feed bytes back into the same link.
pub trait LinkHandler {
    /// A frame from `node` passed its CRC. `data` is the header byte followed by
    /// the payload and is only valid for the duration of the call.
    fn on_frame(&mut self, node: u8, data: &[u8]);

    /// A non-fatal link error occurred. Ignored by default.
    fn on_error(&mut self, error: &LinkError) {
        let _ = error;
    }
}

/// Handler that discards everything, for transmit-only links.
impl LinkHandler for () {
    fn on_frame(&mut self, _node: u8, _data: &[u8]) {}
}
