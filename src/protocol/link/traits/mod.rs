//! Abstraction traits used by the link layer (byte transport, frame handler, and clock).
pub mod link_clock;
pub mod link_handler;
pub mod link_transport;
