//! High-level components of the datagram stack: framing, the shared link
//! arbiter, and the diagnostic console sender.
pub mod console;
pub mod frame;
pub mod link;
