//! Frames staged through a [`ByteChannel`] by [`ChannelTransport`] and drained
//! by a separate consumer, the way a UART interrupt or DMA task would.
mod helpers;

use dglink::infra::channel::ByteChannel;
use dglink::protocol::link::{ChannelTransport, Link, LinkConfig};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use helpers::{frame_data, CaptureWire, ManualClock, Recorder};

type StagedLink<'c, 'a> =
    Link<NoopRawMutex, ChannelTransport<'c, 'a, NoopRawMutex>, ManualClock, (), 64>;
type RxLink = Link<NoopRawMutex, CaptureWire, ManualClock, Recorder, 128>;

fn receiver() -> (RxLink, Recorder) {
    let recorder = Recorder::default();
    let link = Link::new(
        LinkConfig::new(0),
        CaptureWire::default(),
        ManualClock::default(),
        recorder.clone(),
    )
    .expect("valid node");
    (link, recorder)
}

#[tokio::test]
/// Frames larger than the staging channel are throttled, not truncated.
async fn test_frames_flow_through_small_channel() {
    let mut storage = [0u8; 32];
    let channel = ByteChannel::<NoopRawMutex>::new(&mut storage).expect("power of two");
    let tx_link: StagedLink<'_, '_> = Link::new(
        LinkConfig::new(0),
        ChannelTransport::new(&channel),
        ManualClock::default(),
        (),
    )
    .expect("valid node");
    let (rx_link, recorder) = receiver();

    let producer = async {
        for round in 0..5u8 {
            let mut tx = tx_link.transmit_start_to(3, 0x20).await.unwrap();
            tx.write(&[round; 40]).await.unwrap();
            tx.end().await.unwrap();
        }
    };
    let consumer = async {
        let mut chunk = [0u8; 7];
        while recorder.frame_count() < 5 {
            channel.wait_watermark().await;
            let count = channel.extract(&mut chunk);
            rx_link.receive_bytes(&chunk[..count]);
        }
    };
    tokio::join!(producer, consumer);

    let frames = recorder.frames.borrow();
    assert_eq!(frames.len(), 5);
    for (round, (node, data)) in frames.iter().enumerate() {
        assert_eq!(*node, 3);
        assert_eq!(*data, frame_data(0x20, &[round as u8; 40]));
    }
    assert_eq!(channel.gauge(), 0);
    assert!(!channel.take_overrun());
    assert_eq!(recorder.error_count(), 0);
}

#[tokio::test]
async fn test_disabled_channel_swallows_frames() {
    let disabled = ByteChannel::<NoopRawMutex>::disabled();
    let link: StagedLink<'_, '_> = Link::new(
        LinkConfig::new(0),
        ChannelTransport::new(&disabled),
        ManualClock::default(),
        (),
    )
    .expect("valid node");

    let mut tx = link.transmit_start_to(1, 0).await.unwrap();
    tx.write(b"into the void").await.unwrap();
    tx.end().await.unwrap();

    assert_eq!(disabled.gauge(), 0);
    assert_eq!(disabled.capacity(), 0);
    assert_eq!(link.link_status().tx_datagrams, 1);
}
