// Copyright 2024 The MirageKit Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! C1: the packet router.
//!
//! One shared UDP socket demultiplexes incoming datagrams to per-stream
//! queues by `streamId`. No locks on the hot path beyond a read-mostly
//! registry lookup; registration changes are infrequent (stream
//! start/stop), following the same read-mostly shared-map convention as
//! [`crate::cache::FrameCache`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::error::RouterDropReason;
use crate::wire::{FrameHeader, StreamId, HEADER_LEN};

/// One admitted datagram, handed off to the stream's owning task.
pub struct RoutedPacket {
    pub header: FrameHeader,
    pub payload: Bytes,
}

#[derive(Debug, Default)]
pub struct RouterStats {
    pub short_packet_drops: u64,
    pub bad_magic_drops: u64,
    pub bad_version_drops: u64,
    pub unknown_stream_drops: u64,
    pub length_mismatch_drops: u64,
}

#[derive(Default)]
struct AtomicRouterStats {
    short_packet_drops: AtomicU64,
    bad_magic_drops: AtomicU64,
    bad_version_drops: AtomicU64,
    unknown_stream_drops: AtomicU64,
    length_mismatch_drops: AtomicU64,
}

impl AtomicRouterStats {
    fn count(&self, reason: RouterDropReason) {
        let counter = match reason {
            RouterDropReason::ShortPacket => &self.short_packet_drops,
            RouterDropReason::BadMagic => &self.bad_magic_drops,
            RouterDropReason::BadVersion => &self.bad_version_drops,
            RouterDropReason::UnknownStream => &self.unknown_stream_drops,
            RouterDropReason::LengthMismatch => &self.length_mismatch_drops,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        log::trace!("dropping datagram: {reason}");
    }

    fn snapshot(&self) -> RouterStats {
        RouterStats {
            short_packet_drops: self.short_packet_drops.load(Ordering::Relaxed),
            bad_magic_drops: self.bad_magic_drops.load(Ordering::Relaxed),
            bad_version_drops: self.bad_version_drops.load(Ordering::Relaxed),
            unknown_stream_drops: self.unknown_stream_drops.load(Ordering::Relaxed),
            length_mismatch_drops: self.length_mismatch_drops.load(Ordering::Relaxed),
        }
    }
}

const PROTOCOL_VERSION: u8 = 1;

/// Demultiplexes one shared socket's datagrams to registered per-stream
/// queues. Cloning shares the same registry and socket, so a router
/// handle may be passed to the owning lifecycle coordinator for
/// `register`/`unregister` while `run()` drives the receive loop
/// elsewhere.
#[derive(Clone)]
pub struct PacketRouter {
    socket: Arc<UdpSocket>,
    registry: Arc<RwLock<HashMap<StreamId, mpsc::UnboundedSender<RoutedPacket>>>>,
    stats: Arc<AtomicRouterStats>,
}

impl PacketRouter {
    pub fn new(socket: UdpSocket) -> Self {
        Self {
            socket: Arc::new(socket),
            registry: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(AtomicRouterStats::default()),
        }
    }

    /// Registers the queue a stream's owning task reads admitted packets
    /// from. Replaces any existing registration for `stream_id`.
    pub fn register(&self, stream_id: StreamId, sender: mpsc::UnboundedSender<RoutedPacket>) {
        self.registry.write().unwrap().insert(stream_id, sender);
    }

    /// Deregisters a stream. Must complete before the corresponding
    /// reassembler task is torn down, so no packet is routed to a
    /// destroyed destination.
    pub fn unregister(&self, stream_id: StreamId) {
        self.registry.write().unwrap().remove(&stream_id);
    }

    pub fn stats(&self) -> RouterStats {
        self.stats.snapshot()
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }

    /// Runs the receive loop until the socket errors. Socket errors are
    /// returned to the caller, which surfaces them to C4 as a transport
    /// failure tearing down all streams.
    pub async fn run(&self) -> std::io::Result<()> {
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let (len, _from) = self.socket.recv_from(&mut buf).await?;
            self.admit(&buf[..len]);
        }
    }

    fn admit(&self, datagram: &[u8]) {
        if datagram.len() < HEADER_LEN {
            self.stats.count(RouterDropReason::ShortPacket);
            return;
        }

        let header = match FrameHeader::decode(datagram) {
            Some(header) => header,
            None => {
                self.stats.count(RouterDropReason::BadMagic);
                return;
            }
        };

        if header.version != PROTOCOL_VERSION {
            self.stats.count(RouterDropReason::BadVersion);
            return;
        }

        let registry = self.registry.read().unwrap();
        let Some(sender) = registry.get(&header.stream_id) else {
            drop(registry);
            self.stats.count(RouterDropReason::UnknownStream);
            return;
        };

        let payload = &datagram[HEADER_LEN..];
        if payload.len() as u32 != header.payload_length {
            self.stats.count(RouterDropReason::LengthMismatch);
            return;
        }

        let _ = sender.send(RoutedPacket { header, payload: Bytes::copy_from_slice(payload) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{ContentRect, MAGIC};
    use byteorder::{ByteOrder, LittleEndian};

    fn encode_datagram(stream_id: StreamId, payload: &[u8]) -> Vec<u8> {
        let header = FrameHeader {
            version: PROTOCOL_VERSION,
            flags: 0,
            stream_id,
            sequence_number: 0,
            timestamp: 0,
            frame_number: 1,
            fragment_index: 0,
            fragment_count: 1,
            payload_length: payload.len() as u32,
            frame_byte_count: payload.len() as u32,
            checksum: crate::wire::checksum(payload),
            content_rect: ContentRect { x: 0.0, y: 0.0, w: 0.0, h: 0.0 },
            dimension_token: 0,
            epoch: 0,
        };
        let mut datagram = header.encode().to_vec();
        datagram.extend_from_slice(payload);
        datagram
    }

    async fn bound_socket() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").await.unwrap()
    }

    #[tokio::test]
    async fn routes_to_registered_stream() {
        let router = PacketRouter::new(bound_socket().await);
        let (tx, mut rx) = mpsc::unbounded_channel();
        router.register(7, tx);

        let datagram = encode_datagram(7, b"hello");
        router.admit(&datagram);

        let routed = rx.try_recv().expect("one packet routed");
        assert_eq!(routed.header.stream_id, 7);
        assert_eq!(&routed.payload[..], b"hello");
        assert_eq!(router.stats().unknown_stream_drops, 0);
    }

    #[tokio::test]
    async fn unknown_stream_is_dropped_and_counted() {
        let router = PacketRouter::new(bound_socket().await);
        let datagram = encode_datagram(9, b"x");
        router.admit(&datagram);
        assert_eq!(router.stats().unknown_stream_drops, 1);
    }

    #[tokio::test]
    async fn short_datagram_is_dropped_and_counted() {
        let router = PacketRouter::new(bound_socket().await);
        router.admit(&[0u8; 10]);
        assert_eq!(router.stats().short_packet_drops, 1);
    }

    #[tokio::test]
    async fn bad_magic_is_dropped_and_counted() {
        let router = PacketRouter::new(bound_socket().await);
        let mut datagram = encode_datagram(1, b"x");
        LittleEndian::write_u32(&mut datagram[0..4], MAGIC.wrapping_add(1));
        router.admit(&datagram);
        assert_eq!(router.stats().bad_magic_drops, 1);
    }

    #[tokio::test]
    async fn unregister_stops_routing() {
        let router = PacketRouter::new(bound_socket().await);
        let (tx, _rx) = mpsc::unbounded_channel();
        router.register(3, tx);
        router.unregister(3);

        let datagram = encode_datagram(3, b"x");
        router.admit(&datagram);
        assert_eq!(router.stats().unknown_stream_drops, 1);
    }

    #[tokio::test]
    async fn bad_version_is_dropped_and_counted_distinctly_from_bad_magic() {
        let router = PacketRouter::new(bound_socket().await);
        let mut datagram = encode_datagram(1, b"x");
        datagram[4] = PROTOCOL_VERSION + 1;
        router.admit(&datagram);
        assert_eq!(router.stats().bad_version_drops, 1);
        assert_eq!(router.stats().bad_magic_drops, 0);
    }

    #[tokio::test]
    async fn unknown_stream_takes_priority_over_length_mismatch() {
        let router = PacketRouter::new(bound_socket().await);
        let mut datagram = encode_datagram(9, b"x");
        // payload_length no longer matches the truncated datagram below,
        // but stream 9 is unregistered, so that should be reported first.
        datagram.truncate(datagram.len() - 1);
        router.admit(&datagram);
        assert_eq!(router.stats().unknown_stream_drops, 1);
        assert_eq!(router.stats().length_mismatch_drops, 0);
    }
}
