//! Transmit-side escaping writer.
//!
//! [`FrameEncoder`] owns the running TX CRC and the pending escape run. Input is
//! turned into a lazy sequence of [`Segment`]s: literal slices borrowed from the
//! caller's data, and two-byte escape pairs. Literal runs are flushed verbatim
//! when a delimiter interrupts them or the input ends; escape runs are only
//! flushed when the next non-delimiter byte arrives (or by
//! [`FrameEncoder::flush_run`] at frame end), so a run spanning several writes
//! still costs one pair per 255 bytes.
use crate::core::{address_marker, is_valid_node, BREAK, DELIMITER};
use crate::error::EncodeError;
use crate::infra::crc::Crc16;
use crate::protocol::frame::MAX_ESCAPE_RUN;

//==================================================================================Segment
/// A piece of encoded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'d> {
    /// Bytes copied verbatim from the input (no delimiter inside).
    Literal(&'d [u8]),
    /// Escape pair `(DELIMITER, DELIMITER + run_length)`.
    Run([u8; 2]),
}

impl<'d> Segment<'d> {
    /// Bytes to put on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Segment::Literal(bytes) => bytes,
            Segment::Run(pair) => pair,
        }
    }
}

//==================================================================================FrameEncoder
/// Streaming state of one outgoing frame.
#[derive(Debug, Default, Clone)]
pub struct FrameEncoder {
    crc: Crc16,
    pending_run: usize,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self {
            crc: Crc16::new(),
            pending_run: 0,
        }
    }

    /// Start a new frame: reseed the CRC and forget any pending run.
    pub fn reset(&mut self) {
        self.crc.reset();
        self.pending_run = 0;
    }

    /// CRC of every byte escaped since the last reset.
    pub fn crc(&self) -> u16 {
        self.crc.value()
    }

    /// Delimiter-valued bytes accepted but not yet emitted.
    pub fn pending_run(&self) -> usize {
        self.pending_run
    }

    /// Escape `data`, yielding the segments to write in order.
    pub fn escape<'e, 'd>(&'e mut self, data: &'d [u8]) -> Escape<'e, 'd> {
        Escape {
            encoder: self,
            data,
            position: 0,
            literal_start: None,
        }
    }

    /// Emit the pending escape run, one pair per chunk of at most 255 bytes.
    pub fn flush_run(&mut self) -> RunFlush<'_> {
        RunFlush { encoder: self }
    }

    fn take_run_chunk(&mut self) -> Option<[u8; 2]> {
        if self.pending_run == 0 {
            return None;
        }
        let chunk = self.pending_run.min(MAX_ESCAPE_RUN);
        self.pending_run -= chunk;
        Some([DELIMITER, DELIMITER + chunk as u8])
    }
}

//==================================================================================Iterators
/// Lazy iterator over the segments encoding one input buffer.
pub struct Escape<'e, 'd> {
    encoder: &'e mut FrameEncoder,
    data: &'d [u8],
    position: usize,
    literal_start: Option<usize>,
}

impl<'e, 'd> Iterator for Escape<'e, 'd> {
    type Item = Segment<'d>;

    fn next(&mut self) -> Option<Self::Item> {
        let data = self.data;
        while let Some(&byte) = data.get(self.position) {
            if byte == DELIMITER {
                if let Some(start) = self.literal_start.take() {
                    return Some(Segment::Literal(&data[start..self.position]));
                }
                self.encoder.crc.push(byte);
                self.encoder.pending_run += 1;
            } else {
                if let Some(pair) = self.encoder.take_run_chunk() {
                    return Some(Segment::Run(pair));
                }
                self.encoder.crc.push(byte);
                if self.literal_start.is_none() {
                    self.literal_start = Some(self.position);
                }
            }
            self.position += 1;
        }

        self.literal_start
            .take()
            .map(|start| Segment::Literal(&data[start..]))
    }
}

/// Iterator over the escape pairs still owed at the end of a frame.
pub struct RunFlush<'e> {
    encoder: &'e mut FrameEncoder,
}

impl<'e> Iterator for RunFlush<'e> {
    type Item = [u8; 2];

    fn next(&mut self) -> Option<Self::Item> {
        self.encoder.take_run_chunk()
    }
}

//==================================================================================encode_frame
/// Serialize a complete frame, opening and closing breaks included, into `out`.
///
/// Returns the number of bytes written. Size `out` with
/// [`max_encoded_len`](crate::protocol::frame::max_encoded_len) to never hit
/// [`EncodeError::BufferTooSmall`].
pub fn encode_frame(
    node: u8,
    sequence: u8,
    header: u8,
    payload: &[u8],
    out: &mut [u8],
) -> Result<usize, EncodeError> {
    if !is_valid_node(node) {
        return Err(EncodeError::InvalidNode { node });
    }

    let mut writer = SliceWriter { out, len: 0 };
    let mut encoder = FrameEncoder::new();

    writer.put(&BREAK)?;
    for part in [&[address_marker(node), sequence][..], &[header][..], payload] {
        for segment in encoder.escape(part) {
            writer.put(segment.as_bytes())?;
        }
    }

    let crc = encoder.crc().to_le_bytes();
    for segment in encoder.escape(&crc) {
        writer.put(segment.as_bytes())?;
    }
    for pair in encoder.flush_run() {
        writer.put(&pair)?;
    }
    writer.put(&BREAK)?;

    Ok(writer.len)
}

struct SliceWriter<'o> {
    out: &'o mut [u8],
    len: usize,
}

impl<'o> SliceWriter<'o> {
    fn put(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        let end = self.len + bytes.len();
        if end > self.out.len() {
            return Err(EncodeError::BufferTooSmall);
        }
        self.out[self.len..end].copy_from_slice(bytes);
        self.len = end;
        Ok(())
    }
}
