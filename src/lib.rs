//! `dglink` library: the data-link layer of an embedded real-time stack.
//! It frames addressed, CRC-protected datagrams over raw serial byte streams in
//! a `no_std`, allocation-free environment. The crate exposes the
//! infrastructure modules (CRC, byte channels) and the protocol logic
//! (frame encoder/decoder, link arbitration, console sender).
#![no_std]
//==================================================================================
#[cfg(test)]
extern crate std;
//==================================================================================
/// Wire constants and small value types shared by every layer.
pub mod core;
/// Error taxonomy of the link layer (framing, integrity, capacity, transport).
pub mod error;
/// Building blocks with no protocol knowledge: CRC16 and circular byte channels.
pub mod infra;
/// Datagram protocol: frame codec, link arbiter, and diagnostic console sender.
pub mod protocol;
//==================================================================================
