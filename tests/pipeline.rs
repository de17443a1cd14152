// Copyright 2024 The MirageKit Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! End-to-end tests driving real UDP sockets through the packet router,
//! frame reassembler, decoder controller, and lifecycle coordinator
//! together, rather than exercising any one component in isolation.

use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;

use miragekit_stream::cache::FrameCache;
use miragekit_stream::config::StreamConfig;
use miragekit_stream::control::{ControlEvent, RecordingControlChannel};
use miragekit_stream::decoder::hevc::tests_support::build_framed_keyframe;
use miragekit_stream::decoder::session::test_support::TestDecoderSessionFactory;
use miragekit_stream::lifecycle::StreamLifecycle;
use miragekit_stream::router::PacketRouter;
use miragekit_stream::wire::{checksum, ContentRect, FrameHeader, StreamId, FLAG_KEYFRAME};

const STREAM_ID: StreamId = 42;

fn fragment_header(
    frame_number: u32,
    fragment_index: u16,
    fragment_count: u16,
    keyframe: bool,
    dimension_token: u16,
    payload: &[u8],
) -> FrameHeader {
    FrameHeader {
        version: 1,
        flags: if keyframe { FLAG_KEYFRAME } else { 0 },
        stream_id: STREAM_ID,
        sequence_number: 0,
        timestamp: frame_number as u64,
        frame_number,
        fragment_index,
        fragment_count,
        payload_length: payload.len() as u32,
        frame_byte_count: payload.len() as u32,
        checksum: checksum(payload),
        content_rect: ContentRect { x: 0.0, y: 0.0, w: 640.0, h: 480.0 },
        dimension_token,
        epoch: 0,
    }
}

fn datagram(header: &FrameHeader, payload: &[u8]) -> Vec<u8> {
    let mut buf = header.encode().to_vec();
    buf.extend_from_slice(payload);
    buf
}

struct Harness {
    router: PacketRouter,
    lifecycle: StreamLifecycle<TestDecoderSessionFactory>,
    frame_cache: FrameCache,
    factory: TestDecoderSessionFactory,
    sender: UdpSocket,
}

impl Harness {
    async fn new() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let router = PacketRouter::new(socket);
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let frame_cache = FrameCache::new();
        let factory = TestDecoderSessionFactory::default();
        let mut lifecycle = StreamLifecycle::new(
            STREAM_ID,
            StreamConfig::default(),
            factory.clone(),
            Box::new(RecordingControlChannel::default()),
            frame_cache.clone(),
        );
        lifecycle.start();

        Self { router, lifecycle, frame_cache, factory, sender }
    }

    fn spawn_receive_loop(&self) -> tokio::sync::mpsc::UnboundedReceiver<miragekit_stream::router::RoutedPacket> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        self.router.register(STREAM_ID, tx);
        let router = self.router.clone();
        tokio::spawn(async move {
            let _ = router.run().await;
        });
        rx
    }

    async fn send(&self, header: &FrameHeader, payload: &[u8]) {
        let addr = self.router.local_addr().unwrap();
        self.sender.send_to(&datagram(header, payload), addr).await.unwrap();
    }
}

async fn recv_and_admit(
    lifecycle: &mut StreamLifecycle<TestDecoderSessionFactory>,
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<miragekit_stream::router::RoutedPacket>,
) {
    let packet = timeout(Duration::from_secs(1), rx.recv()).await.expect("packet arrived").expect("channel open");
    lifecycle.admit_packet(&packet.header, &packet.payload);
}

#[tokio::test]
async fn keyframe_round_trips_over_udp_and_reaches_the_frame_cache() {
    let mut harness = Harness::new().await;
    let mut rx = harness.spawn_receive_loop();

    let keyframe = build_framed_keyframe(640, 480);
    let header = fragment_header(1, 0, 1, true, 0, &keyframe);
    harness.send(&header, &keyframe).await;
    recv_and_admit(&mut harness.lifecycle, &mut rx).await;

    assert!(harness.frame_cache.latest(STREAM_ID).is_some());
    assert_eq!(harness.lifecycle.stats().decoded_picture_count, 1);
}

#[tokio::test]
async fn out_of_order_fragments_reassemble_into_one_decoded_frame() {
    let mut harness = Harness::new().await;
    let mut rx = harness.spawn_receive_loop();

    let keyframe = build_framed_keyframe(640, 480);
    let header = fragment_header(1, 0, 1, true, 0, &keyframe);
    harness.send(&header, &keyframe).await;
    recv_and_admit(&mut harness.lifecycle, &mut rx).await;

    let parts: [&[u8]; 3] = [b"AAA", b"BBB", b"CCC"];
    // Send fragment 2, then 0, then 1: arrival order must not matter.
    for &index in &[2u16, 0, 1] {
        let payload = parts[index as usize];
        let header = fragment_header(2, index, 3, false, 0, payload);
        harness.send(&header, payload).await;
    }
    for _ in 0..3 {
        recv_and_admit(&mut harness.lifecycle, &mut rx).await;
    }

    let picture = harness.frame_cache.latest(STREAM_ID).unwrap();
    let bytes = picture.buffer.downcast_ref::<Vec<u8>>().unwrap();
    assert_eq!(bytes, b"AAABBBCCC");
    assert_eq!(harness.lifecycle.stats().decoded_picture_count, 2);
}

#[tokio::test]
async fn corrupted_payload_is_dropped_without_reaching_the_decoder() {
    let mut harness = Harness::new().await;
    let mut rx = harness.spawn_receive_loop();

    let keyframe = build_framed_keyframe(640, 480);
    let header = fragment_header(1, 0, 1, true, 0, &keyframe);
    harness.send(&header, &keyframe).await;
    recv_and_admit(&mut harness.lifecycle, &mut rx).await;

    let mut header = fragment_header(2, 0, 1, false, 0, b"hello");
    header.checksum = checksum(b"hello");
    // Datagram payload diverges from what checksum was computed over.
    let addr = harness.router.local_addr().unwrap();
    harness.sender.send_to(&datagram(&header, b"hellp"), addr).await.unwrap();

    // Give the router a moment to process and drop the corrupted datagram,
    // then confirm no second decode ever lands.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.lifecycle.stats().decoded_picture_count, 1);
    assert_eq!(harness.lifecycle.reassembler_stats().checksum_drops, 1);
}

#[tokio::test]
async fn dimension_token_mismatch_is_rejected_until_the_next_keyframe() {
    let mut harness = Harness::new().await;
    let mut rx = harness.spawn_receive_loop();
    harness.lifecycle.handle_control_event(ControlEvent::StreamStarted {
        stream_id: STREAM_ID,
        min_width: 640,
        min_height: 480,
        initial_dimension_token: 5,
    });

    let mut header = fragment_header(1, 0, 1, false, 6, b"stale-token");
    header.checksum = checksum(b"stale-token");
    harness.send(&header, b"stale-token").await;

    let keyframe = build_framed_keyframe(640, 480);
    let mut keyframe_header = fragment_header(2, 0, 1, true, 6, &keyframe);
    keyframe_header.checksum = checksum(&keyframe);
    harness.send(&keyframe_header, &keyframe).await;

    recv_and_admit(&mut harness.lifecycle, &mut rx).await;
    assert_eq!(harness.lifecycle.reassembler_stats().dimension_token_drops, 1);

    recv_and_admit(&mut harness.lifecycle, &mut rx).await;
    assert_eq!(harness.lifecycle.stats().decoded_picture_count, 1);
}

#[tokio::test]
async fn decode_error_threshold_requests_a_keyframe_and_recovers() {
    let mut harness = Harness::new().await;
    let mut rx = harness.spawn_receive_loop();

    let keyframe = build_framed_keyframe(640, 480);
    let header = fragment_header(1, 0, 1, true, 0, &keyframe);
    harness.send(&header, &keyframe).await;
    recv_and_admit(&mut harness.lifecycle, &mut rx).await;

    harness.factory.queue_failures(5);
    for frame_number in 2..=6u32 {
        let payload = [0u8, 0, 0, 1, 0x02];
        let header = fragment_header(frame_number, 0, 1, false, 0, &payload);
        harness.send(&header, &payload).await;
        recv_and_admit(&mut harness.lifecycle, &mut rx).await;
    }

    assert_eq!(harness.lifecycle.stats().keyframe_requests, 1);
    assert!(harness.lifecycle.is_input_blocked());

    let recovery_keyframe = build_framed_keyframe(640, 480);
    let recovery_header = fragment_header(7, 0, 1, true, 0, &recovery_keyframe);
    harness.send(&recovery_header, &recovery_keyframe).await;
    recv_and_admit(&mut harness.lifecycle, &mut rx).await;

    assert!(!harness.lifecycle.is_input_blocked());
}
