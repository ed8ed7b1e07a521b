//! Minimal abstraction for the byte sink a link transmits into. Allows the
//! library to plug into UART drivers, DMA rings, USB CDC endpoints or a plain
//! [`ByteChannel`](crate::infra::channel::ByteChannel).
use futures_util::Future;

/// Contract to push encoded frame bytes towards the wire.
///
/// A link calls [`begin_transmission`](Self::begin_transmission) once per frame,
/// then [`write_bytes`](Self::write_bytes) any number of times, then
/// [`end_transmission`](Self::end_transmission). The three calls always happen
/// while the link's transmit lock is held, so implementations never see two
/// frames interleaved.
pub trait LinkTransport {
    type Error: core::fmt::Debug;

    /// Hook run before the first byte of a frame (e.g. driver enable line).
    fn begin_transmission(&mut self) {}

    /// Queue `bytes` for transmission. Resolves once every byte was accepted.
    fn write_bytes<'a>(
        &'a mut self,
        bytes: &'a [u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + 'a;

    /// Called after the closing break. Resolves once the frame left the sink.
    fn end_transmission(&mut self) -> impl Future<Output = Result<(), Self::Error>> + '_;
}
