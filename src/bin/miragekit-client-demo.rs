// Copyright 2024 The MirageKit Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Minimal standalone client: binds one UDP socket, routes its traffic to
//! a single demo stream, and logs what the pipeline does with it. No real
//! hardware decoder is involved; [`LoggingDecoderSession`] just logs each
//! submitted slice and reports success, standing in for a platform
//! backend (VideoToolbox, MediaCodec, VAAPI, ...).

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::UdpSocket;

use miragekit_stream::cache::FrameCache;
use miragekit_stream::config::StreamConfig;
use miragekit_stream::control::ControlChannel;
use miragekit_stream::decoder::session::{
    FormatDescription, FramedSample, HardwareDecoderSession, HardwareDecoderSessionFactory,
};
use miragekit_stream::lifecycle::StreamLifecycle;
use miragekit_stream::pixel_buffer::PixelBuffer;
use miragekit_stream::router::PacketRouter;
use miragekit_stream::wire::StreamId;

const DEMO_STREAM_ID: StreamId = 1;

struct LoggingDecoderSession {
    format: FormatDescription,
}

impl HardwareDecoderSession for LoggingDecoderSession {
    fn submit(&mut self, sample: FramedSample, on_result: miragekit_stream::decoder::session::DecodeCallback) {
        log::debug!(
            "decoding {} bytes at pts {} ({}x{})",
            sample.data.len(),
            sample.presentation_timestamp,
            self.format.width,
            self.format.height
        );
        on_result(Ok(PixelBuffer::new(sample.data)));
    }
}

#[derive(Default)]
struct LoggingDecoderSessionFactory;

impl HardwareDecoderSessionFactory for LoggingDecoderSessionFactory {
    type Session = LoggingDecoderSession;

    fn create(&self, format: &FormatDescription) -> Result<Self::Session> {
        log::info!("creating decoder session for {}x{}", format.width, format.height);
        Ok(LoggingDecoderSession { format: format.clone() })
    }
}

struct LoggingControlChannel;

impl ControlChannel for LoggingControlChannel {
    fn send_keyframe_request(&mut self, stream_id: StreamId) {
        log::info!("host keyframe request for stream {stream_id}");
    }

    fn notify_stream_unrecoverable(&mut self, stream_id: StreamId) {
        log::error!("stream {stream_id} is unrecoverable, tearing it down");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let bind_addr: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "0.0.0.0:5004".to_string())
        .parse()
        .context("invalid bind address")?;

    let socket = UdpSocket::bind(bind_addr).await.context("failed to bind data-port socket")?;
    log::info!("listening on {bind_addr}");

    let router = PacketRouter::new(socket);
    let frame_cache = FrameCache::new();

    let mut lifecycle = StreamLifecycle::new(
        DEMO_STREAM_ID,
        StreamConfig::default(),
        LoggingDecoderSessionFactory,
        Box::new(LoggingControlChannel),
        frame_cache.clone(),
    );
    lifecycle.set_input_blocking_handler(|blocked| {
        log::warn!("input blocking for stream {DEMO_STREAM_ID}: {blocked}");
    });
    lifecycle.start();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    router.register(DEMO_STREAM_ID, tx);

    let router_handle = router.clone();
    let mut router_task = tokio::spawn(async move { router_handle.run().await });

    loop {
        tokio::select! {
            packet = rx.recv() => {
                match packet {
                    Some(packet) => lifecycle.admit_packet(&packet.header, &packet.payload),
                    None => break,
                }
            }
            result = &mut router_task => {
                // TransportFailure: a datagram socket error is session-level,
                // so every stream on this socket is torn down.
                match result {
                    Ok(Err(err)) => log::error!("transport failure, stopping all streams: {err}"),
                    Ok(Ok(())) => log::error!("router receive loop exited unexpectedly"),
                    Err(join_err) => log::error!("router task panicked: {join_err}"),
                }
                lifecycle.stop();
                router.unregister(DEMO_STREAM_ID);
                return Ok(());
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutting down");
                break;
            }
        }
    }

    router.unregister(DEMO_STREAM_ID);
    lifecycle.stop();
    router_task.abort();

    Ok(())
}
