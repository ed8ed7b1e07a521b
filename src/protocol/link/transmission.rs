//! Guard for one outgoing frame.
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::MutexGuard;

use crate::core::{BREAK, TRANSMIT_MAX};
use crate::error::{LinkError, TxError};
use crate::protocol::link::traits::{
    link_clock::LinkClock, link_handler::LinkHandler, link_transport::LinkTransport,
};
use crate::protocol::link::{Link, TxState};

/// A frame in progress. Holds the link's transmit lock until [`end`](Self::end)
/// or drop.
///
/// Dropping the guard without calling `end` leaves the frame unterminated on
/// the wire; the next transmission on the link then opens with a break so the
/// receiver discards the partial frame.
pub struct Transmission<'l, M, T, C, H, const RX: usize>
where
    M: RawMutex,
    T: LinkTransport,
    C: LinkClock,
    H: LinkHandler,
{
    link: &'l Link<M, T, C, H, RX>,
    state: MutexGuard<'l, M, TxState<T>>,
}

impl<'l, M, T, C, H, const RX: usize> Transmission<'l, M, T, C, H, RX>
where
    M: RawMutex,
    T: LinkTransport,
    C: LinkClock,
    H: LinkHandler,
{
    pub(crate) fn new(link: &'l Link<M, T, C, H, RX>, state: MutexGuard<'l, M, TxState<T>>) -> Self {
        Self { link, state }
    }

    /// Append payload bytes to the frame.
    ///
    /// # Errors
    ///
    /// - [`TxError::Link`] with [`LinkError::TransmitTooLong`] when `bytes` is
    ///   longer than [`TRANSMIT_MAX`]. Nothing is written and the error is also
    ///   reported to the link handler; the frame stays open.
    /// - [`TxError::Transport`] when the transport fails.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), TxError<T::Error>> {
        if bytes.len() > TRANSMIT_MAX {
            let error = LinkError::TransmitTooLong { len: bytes.len() };
            self.link.report(&error);
            return Err(error.into());
        }
        self.write_escaped(bytes).await
    }

    /// Close the frame: CRC, pending escape run, closing break, then the
    /// transport's end-of-transmission hook. Releases the link.
    pub async fn end(mut self) -> Result<(), TxError<T::Error>> {
        let crc = self.state.encoder.crc().to_le_bytes();
        self.write_escaped(&crc).await?;

        let state = &mut *self.state;
        let mut written = 0;
        for pair in state.encoder.flush_run() {
            state
                .transport
                .write_bytes(&pair)
                .await
                .map_err(TxError::Transport)?;
            written += pair.len();
        }
        self.count_tx_bytes(written);

        self.write_raw(&BREAK).await?;
        self.state
            .transport
            .end_transmission()
            .await
            .map_err(TxError::Transport)?;

        self.state.last_tx = Some(self.link.clock.now());
        self.state.busy = false;
        self.link
            .stats
            .lock(|stats| stats.borrow_mut().add_tx_datagram());

        #[cfg(feature = "defmt")]
        defmt::trace!("tx end");

        Ok(())
    }

    /// Escape `bytes` into the frame, updating the CRC.
    pub(crate) async fn write_escaped(&mut self, bytes: &[u8]) -> Result<(), TxError<T::Error>> {
        let state = &mut *self.state;
        let mut written = 0;
        for segment in state.encoder.escape(bytes) {
            let chunk = segment.as_bytes();
            state
                .transport
                .write_bytes(chunk)
                .await
                .map_err(TxError::Transport)?;
            written += chunk.len();
        }
        self.count_tx_bytes(written);
        Ok(())
    }

    /// Send `bytes` as-is, bypassing escaping and CRC.
    pub(crate) async fn write_raw(&mut self, bytes: &[u8]) -> Result<(), TxError<T::Error>> {
        self.state
            .transport
            .write_bytes(bytes)
            .await
            .map_err(TxError::Transport)?;
        self.count_tx_bytes(bytes.len());
        Ok(())
    }

    fn count_tx_bytes(&self, count: usize) {
        self.link
            .stats
            .lock(|stats| stats.borrow_mut().add_tx_bytes(count));
    }
}
