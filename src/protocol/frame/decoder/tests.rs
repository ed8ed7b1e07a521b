//! Decoder state machine tests covering resynchronization, escaping, filtering and rejection paths.
use super::*;
use crate::core::BROADCAST_NODE;
use crate::protocol::frame::encoder::encode_frame;
use crate::protocol::frame::max_encoded_len;
use std::vec::Vec;

#[derive(Debug, PartialEq, Eq)]
enum Owned {
    Frame { node: u8, sequence: u8, data: Vec<u8> },
    Error(LinkError),
}

fn feed_all<const N: usize>(decoder: &mut FrameDecoder<N>, stream: &[u8]) -> Vec<Owned> {
    let mut events = Vec::new();
    for &byte in stream {
        match decoder.feed(byte) {
            Some(RxEvent::Frame(frame)) => events.push(Owned::Frame {
                node: frame.node,
                sequence: frame.sequence,
                data: frame.data.to_vec(),
            }),
            Some(RxEvent::Error(error)) => events.push(Owned::Error(error)),
            None => {}
        }
    }
    events
}

fn encode(node: u8, sequence: u8, header: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = std::vec![0u8; max_encoded_len(payload.len())];
    let len = encode_frame(node, sequence, header, payload, &mut out).unwrap();
    out.truncate(len);
    out
}

#[test]
fn test_decodes_single_frame() {
    let mut decoder = FrameDecoder::<64>::new(0);
    let events = feed_all(&mut decoder, &encode(5, 42, 0x20, b"payload"));

    let mut data = Vec::from([0x20u8]);
    data.extend_from_slice(b"payload");
    assert_eq!(
        events,
        [Owned::Frame {
            node: 5,
            sequence: 42,
            data
        }]
    );
    assert_eq!(decoder.state(), RxState::Addressing);
}

#[test]
fn test_completed_frame_accessors() {
    let mut decoder = FrameDecoder::<64>::new(0);
    let stream = encode(1, 0, 0x80, &[1, 2, 3]);
    let mut found = false;
    for &byte in &stream {
        if let Some(RxEvent::Frame(frame)) = decoder.feed(byte) {
            assert_eq!(frame.header(), Some(0x80));
            assert_eq!(frame.body(), &[1, 2, 3]);
            found = true;
        }
    }
    assert!(found);
}

#[test]
/// Noise before the first break is never stored nor reported.
fn test_ignores_bytes_before_first_break() {
    let mut decoder = FrameDecoder::<64>::new(0);
    let mut stream = Vec::from([0x13u8, 0x37, 0x00, 0xC4, 0x99]);
    stream.extend_from_slice(&encode(3, 1, 0, b"ok"));

    let events = feed_all(&mut decoder, &stream);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], Owned::Frame { node: 3, .. }));
}

#[test]
/// Frames separated only by one break are decoded back to back.
fn test_back_to_back_frames_share_break() {
    let mut decoder = FrameDecoder::<64>::new(0);
    let first = encode(1, 1, 0x20, b"one");
    let second = encode(2, 2, 0x21, b"two");
    let mut stream = first.clone();
    stream.extend_from_slice(&second[2..]);

    let events = feed_all(&mut decoder, &stream);
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], Owned::Frame { node: 1, sequence: 1, .. }));
    assert!(matches!(events[1], Owned::Frame { node: 2, sequence: 2, .. }));
}

#[test]
fn test_escape_pairs_restore_delimiter_runs() {
    let mut decoder = FrameDecoder::<700>::new(0);
    for len in [1usize, 2, 255, 256, 300, 511] {
        let payload = std::vec![0u8; len];
        let events = feed_all(&mut decoder, &encode(0, 0, 0, &payload));
        let mut expected = Vec::from([0u8]);
        expected.extend_from_slice(&payload);
        assert_eq!(
            events,
            [Owned::Frame {
                node: 0,
                sequence: 0,
                data: expected
            }],
            "run of {len}"
        );
    }
}

#[test]
/// An invalid marker is reported and the decoder waits for the next break.
fn test_bad_address_resynchronizes() {
    let mut decoder = FrameDecoder::<64>::new(0);
    let mut stream = Vec::from([0x00u8, 0x00, 0x10, 0x55, 0x66]);
    stream.extend_from_slice(&encode(4, 9, 1, b"after"));

    let events = feed_all(&mut decoder, &stream);
    assert_eq!(events[0], Owned::Error(LinkError::BadAddress { byte: 0x10 }));
    assert_eq!(events.len(), 2);
    assert!(matches!(events[1], Owned::Frame { node: 4, sequence: 9, .. }));
}

#[test]
fn test_crc_mismatch_reports_received_crc() {
    let mut decoder = FrameDecoder::<64>::new(0);
    let stream = [0x00, 0x00, 0xFE, 0x05, 0x20, 0x34, 0x12, 0x00, 0x00];
    let events = feed_all(&mut decoder, &stream);
    assert_eq!(events, [Owned::Error(LinkError::Crc { received: 0x1234 })]);
}

#[test]
/// Assemblies shorter than sequence + CRC are dropped silently.
fn test_short_frame_is_silently_dropped() {
    let mut decoder = FrameDecoder::<64>::new(0);
    let events = feed_all(&mut decoder, &[0x00, 0x00, 0xFE, 0x05, 0x06, 0x00, 0x00]);
    assert!(events.is_empty());
    assert_eq!(decoder.state(), RxState::Addressing);
}

#[test]
fn test_overflow_reports_once_then_recovers() {
    let mut decoder = FrameDecoder::<40>::new(0);
    let mut stream = encode(2, 0, 0x20, &[0xAB; 64]);
    stream.extend_from_slice(&encode(2, 1, 0x20, b"fits"));

    let events = feed_all(&mut decoder, &stream);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], Owned::Error(LinkError::Overflow));
    assert!(matches!(events[1], Owned::Frame { sequence: 1, .. }));
}

#[test]
/// A non-zero local node only takes its own and broadcast frames.
fn test_address_filtering() {
    let mut decoder = FrameDecoder::<64>::new(7);
    let mut stream = encode(3, 0, 0, b"other");
    stream.extend_from_slice(&encode(7, 1, 0, b"mine"));
    stream.extend_from_slice(&encode(BROADCAST_NODE, 2, 0, b"all"));

    let events = feed_all(&mut decoder, &stream);
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], Owned::Frame { node: 7, .. }));
    assert!(matches!(events[1], Owned::Frame { node: BROADCAST_NODE, .. }));
}

#[test]
fn test_reset_drops_frame_in_progress() {
    let mut decoder = FrameDecoder::<64>::new(0);
    let stream = encode(1, 0, 0, b"partial");
    feed_all(&mut decoder, &stream[..6]);
    assert!(matches!(decoder.state(), RxState::Receiving { node: 1, .. }));
    assert!(decoder.assembled() > 0);

    decoder.reset();
    assert_eq!(decoder.state(), RxState::Idle);
    assert_eq!(decoder.assembled(), 0);
    assert!(feed_all(&mut decoder, &stream[6..]).is_empty());
}
