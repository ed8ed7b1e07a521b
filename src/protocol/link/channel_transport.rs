//! [`LinkTransport`] over a [`ByteChannel`]: frames are staged in the channel and
//! drained by whoever services the hardware (UART interrupt, DMA task, ...).
use core::convert::Infallible;

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::infra::channel::ByteChannel;
use crate::protocol::link::traits::link_transport::LinkTransport;

/// Transport staging transmit bytes in a [`ByteChannel`].
///
/// Writes wait for room instead of overwriting, so a slow consumer throttles the
/// sender. A disabled channel swallows everything.
pub struct ChannelTransport<'c, 'a, M: RawMutex> {
    channel: &'c ByteChannel<'a, M>,
}

impl<'c, 'a, M: RawMutex> ChannelTransport<'c, 'a, M> {
    pub fn new(channel: &'c ByteChannel<'a, M>) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> &'c ByteChannel<'a, M> {
        self.channel
    }
}

impl<'c, 'a, M: RawMutex> LinkTransport for ChannelTransport<'c, 'a, M> {
    type Error = Infallible;

    async fn write_bytes<'b>(&'b mut self, bytes: &'b [u8]) -> Result<(), Self::Error> {
        let mut rest = bytes;
        while !rest.is_empty() && self.channel.is_enabled() {
            let accepted = self.channel.insert(rest, false);
            rest = &rest[accepted..];
            if !rest.is_empty() {
                self.channel.wait_space(1).await;
            }
        }
        Ok(())
    }

    async fn end_transmission(&mut self) -> Result<(), Self::Error> {
        if self.channel.is_enabled() {
            self.channel.wait_empty().await;
        }
        Ok(())
    }
}
