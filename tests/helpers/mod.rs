/// Test doubles to simulate the serial wire, the clock and the frame consumer
/// during integration tests.
use dglink::error::LinkError;
use dglink::protocol::frame::{encoder::encode_frame, max_encoded_len};
use dglink::protocol::link::traits::{
    link_clock::LinkClock, link_handler::LinkHandler, link_transport::LinkTransport,
};
use embassy_time::{Duration, Instant};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::sync::mpsc;

#[derive(Clone, Default)]
#[allow(dead_code)]
/// Transport capturing every written byte for later inspection.
pub struct CaptureWire {
    bytes: Rc<RefCell<Vec<u8>>>,
}

#[allow(dead_code)]
impl CaptureWire {
    /// Remove and return everything written so far.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.bytes.borrow_mut())
    }
}

impl LinkTransport for CaptureWire {
    type Error = ();

    async fn write_bytes<'a>(&'a mut self, bytes: &'a [u8]) -> Result<(), Self::Error> {
        self.bytes.borrow_mut().extend_from_slice(bytes);
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn end_transmission(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Clone)]
#[allow(dead_code)]
/// Transport forwarding each write to an unbounded channel, like a UART
/// whose other end is serviced by another task.
pub struct MockSerial {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

#[allow(dead_code)]
impl MockSerial {
    /// Build the transmit end and the matching receive end.
    pub fn create() -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LinkTransport for MockSerial {
    type Error = ();

    async fn write_bytes<'a>(&'a mut self, bytes: &'a [u8]) -> Result<(), Self::Error> {
        self.tx.send(bytes.to_vec()).map_err(|_| ())
    }

    async fn end_transmission(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Clone, Default)]
#[allow(dead_code)]
/// Clock advanced by hand; `delay` jumps forward instead of sleeping.
pub struct ManualClock {
    millis: Rc<Cell<u64>>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn advance(&self, millis: u64) {
        self.millis.set(self.millis.get() + millis);
    }

    pub fn millis(&self) -> u64 {
        self.millis.get()
    }
}

impl LinkClock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.millis.get())
    }

    async fn delay(&self, duration: Duration) {
        self.advance(duration.as_millis());
        tokio::task::yield_now().await;
    }
}

#[derive(Clone)]
#[allow(dead_code)]
/// Clock based on `std::time` and `tokio::time::sleep`.
pub struct TokioClock {
    origin: std::time::Instant,
}

#[allow(dead_code)]
impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl LinkClock for TokioClock {
    fn now(&self) -> Instant {
        Instant::from_micros(self.origin.elapsed().as_micros() as u64)
    }

    async fn delay(&self, duration: Duration) {
        tokio::time::sleep(std::time::Duration::from_micros(duration.as_micros())).await;
    }
}

#[derive(Clone, Default)]
#[allow(dead_code)]
/// Handler recording every frame and error it is given.
pub struct Recorder {
    pub frames: Rc<RefCell<Vec<(u8, Vec<u8>)>>>,
    pub errors: Rc<RefCell<Vec<LinkError>>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn frame_count(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.borrow().len()
    }
}

impl LinkHandler for Recorder {
    fn on_frame(&mut self, node: u8, data: &[u8]) {
        self.frames.borrow_mut().push((node, data.to_vec()));
    }

    fn on_error(&mut self, error: &LinkError) {
        self.errors.borrow_mut().push(*error);
    }
}

#[allow(dead_code)]
/// Reference encoding of one complete frame, breaks included.
pub fn encode(node: u8, sequence: u8, header: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; max_encoded_len(payload.len())];
    let len = encode_frame(node, sequence, header, payload, &mut out).expect("encodable frame");
    out.truncate(len);
    out
}

#[allow(dead_code)]
/// Header byte followed by the payload, as handed to [`LinkHandler::on_frame`].
pub fn frame_data(header: u8, payload: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(payload.len() + 1);
    data.push(header);
    data.extend_from_slice(payload);
    data
}
