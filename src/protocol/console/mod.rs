//! Diagnostic text sender sharing a [`Link`] with the application traffic.
//!
//! Text is staged in an overwrite-mode [`ByteChannel`]: producers never block,
//! and when the link cannot keep up the oldest text is lost (the cut is marked
//! with [`OVERWRITE_MARKER`](crate::infra::channel::OVERWRITE_MARKER)). A
//! servicing task drains the staging channel into
//! [`CONSOLE`](crate::core::datagram_type::CONSOLE) datagrams with
//! [`Console::flush`].
//!
//! [`Console::debug_line`] bypasses the staging channel: it sends one line
//! immediately when the link is free and otherwise only counts the line as
//! dropped. The next line that makes it out is prefixed with one `"~ "` per
//! dropped line.
use core::cell::Cell;

use embassy_sync::blocking_mutex::{raw::RawMutex, Mutex as BlockingMutex};

use crate::core::datagram_type;
use crate::error::{ChannelError, TxError};
use crate::infra::channel::ByteChannel;
use crate::protocol::link::traits::{
    link_clock::LinkClock, link_handler::LinkHandler, link_transport::LinkTransport,
};
use crate::protocol::link::Link;

/// Largest console datagram payload produced by [`Console::flush`].
pub const CONSOLE_CHUNK: usize = 64;

/// Prefix of every [`Console::debug_line`] datagram.
pub const DEBUG_PREFIX: &[u8] = b"## ";

/// Emitted once per line dropped by [`Console::debug_line`].
pub const DROPPED_MARK: &[u8] = b"~ ";

/// Console sender over caller-provided staging storage.
pub struct Console<'a, M: RawMutex> {
    buffer: ByteChannel<'a, M>,
    dropped: BlockingMutex<M, Cell<u16>>,
}

impl<'a, M: RawMutex> Console<'a, M> {
    /// Console staging its text in `storage` (power-of-two length).
    pub fn new(storage: &'a mut [u8]) -> Result<Self, ChannelError> {
        Ok(Self {
            buffer: ByteChannel::new(storage)?,
            dropped: BlockingMutex::new(Cell::new(0)),
        })
    }

    /// Stage `text` without blocking, discarding the oldest staged text if needed.
    pub fn write(&self, text: &str) -> usize {
        self.buffer.insert(text.as_bytes(), true)
    }

    /// Bytes staged and not yet flushed.
    pub fn pending(&self) -> usize {
        self.buffer.gauge()
    }

    /// Whether staged text was discarded since the previous call.
    pub fn take_overrun(&self) -> bool {
        self.buffer.take_overrun()
    }

    /// Debug lines dropped since the last one that was sent.
    pub fn dropped_lines(&self) -> u16 {
        self.dropped.lock(Cell::get)
    }

    /// Stage `text` without losing any of it: when the staging channel is full
    /// it is flushed to `link` first.
    pub async fn print<LM, T, C, H, const RX: usize>(
        &self,
        link: &Link<LM, T, C, H, RX>,
        text: &str,
    ) -> Result<(), TxError<T::Error>>
    where
        LM: RawMutex,
        T: LinkTransport,
        C: LinkClock,
        H: LinkHandler,
    {
        let mut rest = text.as_bytes();
        if self.buffer.space() >= rest.len() {
            self.buffer.insert(rest, true);
            return Ok(());
        }

        while !rest.is_empty() {
            self.flush(link).await?;
            let accepted = self.buffer.insert(rest, false);
            rest = &rest[accepted..];
        }
        Ok(())
    }

    /// Send everything staged as [`CONSOLE`](datagram_type::CONSOLE) datagrams
    /// of at most [`CONSOLE_CHUNK`] bytes, waiting for the link as needed.
    /// Returns the number of datagrams sent.
    pub async fn flush<LM, T, C, H, const RX: usize>(
        &self,
        link: &Link<LM, T, C, H, RX>,
    ) -> Result<usize, TxError<T::Error>>
    where
        LM: RawMutex,
        T: LinkTransport,
        C: LinkClock,
        H: LinkHandler,
    {
        let mut chunk = [0u8; CONSOLE_CHUNK];
        let mut sent = 0;
        loop {
            let len = self.buffer.extract(&mut chunk);
            if len == 0 {
                return Ok(sent);
            }
            let mut tx = link.transmit_start(datagram_type::CONSOLE).await?;
            tx.write(&chunk[..len]).await?;
            tx.end().await?;
            sent += 1;
        }
    }

    /// Send `"## " + text + "\n"` as one [`CONSOLE`](datagram_type::CONSOLE)
    /// datagram if the link is free right now.
    ///
    /// Returns `Ok(false)` when the link was busy; the line is dropped and
    /// counted.
    pub async fn debug_line<LM, T, C, H, const RX: usize>(
        &self,
        link: &Link<LM, T, C, H, RX>,
        text: &str,
    ) -> Result<bool, TxError<T::Error>>
    where
        LM: RawMutex,
        T: LinkTransport,
        C: LinkClock,
        H: LinkHandler,
    {
        let mut tx = match link.try_transmit_start(datagram_type::CONSOLE).await {
            Ok(tx) => tx,
            Err(TxError::Busy) => {
                self.dropped
                    .lock(|dropped| dropped.set(dropped.get().saturating_add(1)));
                return Ok(false);
            }
            Err(error) => return Err(error),
        };

        tx.write(DEBUG_PREFIX).await?;
        for _ in 0..self.dropped_lines() {
            tx.write(DROPPED_MARK).await?;
        }
        tx.write(text.as_bytes()).await?;
        tx.write(b"\n").await?;
        tx.end().await?;

        self.dropped.lock(|dropped| dropped.set(0));
        Ok(true)
    }
}
