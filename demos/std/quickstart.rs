//! # Quickstart Example
//!
//! Minimal example demonstrating the basics of dglink:
//! - Encode a frame into a buffer and inspect the wire bytes
//! - Connect two links through an in-memory serial line
//! - Send application datagrams and console lines, then read the statistics
//!
//! This example uses `std` and `tokio` for a quick trial run.
//!
//! ```bash
//! cargo run --example quickstart
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use dglink::core::datagram_type;
use dglink::error::LinkError;
use dglink::protocol::console::Console;
use dglink::protocol::frame::{encoder::encode_frame, max_encoded_len};
use dglink::protocol::link::traits::{
    link_clock::LinkClock, link_handler::LinkHandler, link_transport::LinkTransport,
};
use dglink::protocol::link::{Link, LinkConfig};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_time::{Duration, Instant};
use static_cell::StaticCell;

/// Console staging storage, handed out once as `&'static mut` like on a target.
static CONSOLE_STORAGE: StaticCell<[u8; 64]> = StaticCell::new();

/// Serial line: everything written lands in a shared byte vector.
#[derive(Clone, Default)]
struct Line(Rc<RefCell<Vec<u8>>>);

impl LinkTransport for Line {
    type Error = ();

    async fn write_bytes<'a>(&'a mut self, bytes: &'a [u8]) -> Result<(), Self::Error> {
        self.0.borrow_mut().extend_from_slice(bytes);
        Ok(())
    }

    async fn end_transmission(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Clock backed by `std::time` and `tokio::time::sleep`.
struct HostClock(std::time::Instant);

impl LinkClock for HostClock {
    fn now(&self) -> Instant {
        Instant::from_micros(self.0.elapsed().as_micros() as u64)
    }

    async fn delay(&self, duration: Duration) {
        tokio::time::sleep(std::time::Duration::from_micros(duration.as_micros())).await;
    }
}

/// Prints every frame and error it receives.
struct Printer;

impl LinkHandler for Printer {
    fn on_frame(&mut self, node: u8, data: &[u8]) {
        let Some((header, payload)) = data.split_first() else {
            return;
        };
        if *header == datagram_type::CONSOLE {
            print!("   [node {node}] console: {}", String::from_utf8_lossy(payload));
        } else {
            println!(
                "   [node {node}] header {header:#04x}, {} byte(s): {payload:02X?}",
                payload.len()
            );
        }
    }

    fn on_error(&mut self, error: &LinkError) {
        println!("   link error {} ({})", error.reason(), error.code());
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    println!("=== dglink Quickstart ===\n");

    // ======================================================================
    // 1. Encode a single frame
    // ======================================================================
    println!("1. Encoding a frame to node 5");

    let payload = [0x10, 0x00, 0x00, 0x20];
    let mut buffer = [0u8; max_encoded_len(4)];
    match encode_frame(5, 0, datagram_type::TELEMLINK, &payload, &mut buffer) {
        Ok(len) => println!("   Wire bytes: {:02X?}\n", &buffer[..len]),
        Err(e) => eprintln!("   Encoding error: {e:?}\n"),
    }

    // ======================================================================
    // 2. Connect two links
    // ======================================================================
    println!("2. Sending datagrams from node 1 to node 2, heard by a monitor (node 0)");

    let line = Line::default();
    let origin = std::time::Instant::now();
    let config = LinkConfig::new(1).with_min_inter_delay(Duration::from_millis(2));
    let sender: Link<NoopRawMutex, _, _, _, 64> =
        Link::new(config, line.clone(), HostClock(origin), ()).expect("node 1 is valid");
    let receiver: Link<NoopRawMutex, _, _, _, 128> =
        Link::new(LinkConfig::new(0), Line::default(), HostClock(origin), Printer)
            .expect("node 0 is valid");

    for reading in [21u16, 22, 0] {
        let mut tx = sender
            .transmit_start_to(2, datagram_type::TELEMLINK)
            .await
            .expect("link is free");
        tx.write(&reading.to_le_bytes()).await.expect("write");
        tx.end().await.expect("end");
    }
    receiver.receive_bytes(&line.0.take());
    println!();

    // ======================================================================
    // 3. Console lines share the same link
    // ======================================================================
    println!("3. Console output");

    let storage = CONSOLE_STORAGE.init([0; 64]);
    let console = Console::<NoopRawMutex>::new(storage).expect("power of two storage");
    console.write("staged text\n");
    console.flush(&sender).await.expect("flush");
    console
        .debug_line(&sender, "immediate line")
        .await
        .expect("debug line");
    receiver.receive_bytes(&line.0.take());
    println!();

    // ======================================================================
    // 4. Statistics
    // ======================================================================
    println!("4. Link statistics");

    println!("   Monitor alive: {}", receiver.is_alive());
    println!("   Frames to node 2: {:?}", receiver.rx_status(2));
    println!("   Frames to node 1: {:?}", receiver.rx_status(1));
    println!("   Monitor:  {:?}", receiver.link_status());
    println!("   Sender:   {:?}\n", sender.link_status());

    println!("Quickstart complete.");
}
