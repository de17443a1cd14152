// Copyright 2024 The MirageKit Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! C4: the per-stream lifecycle coordinator.
//!
//! Owns one [`FrameReassembler`] and one [`DecoderController`], and wires
//! the signals each emits into the other and into the host: a completed
//! frame goes straight to the decoder, a decoder error threshold puts the
//! reassembler into keyframe-only mode and asks the host for a new
//! keyframe, and a decoded picture lands in the shared [`FrameCache`].
//! Follows the same extracted-shared-state pattern as
//! [`crate::decoder::DecoderController`]: only the fields a callback needs
//! live behind the `Arc<Mutex<..>>`, everything else stays on the
//! single-owner struct.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::cache::FrameCache;
use crate::config::StreamConfig;
use crate::control::{ControlChannel, ControlEvent};
use crate::decoder::session::HardwareDecoderSessionFactory;
use crate::decoder::DecoderController;
use crate::error::{DecoderError, LifecycleError};
use crate::pixel_buffer::DecodedPicture;
use crate::reassembler::{CompleteFrame, FrameReassembler, ReassemblerStats};
use crate::wire::{FrameHeader, StreamId};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleStats {
    pub decoded_picture_count: u64,
    pub decoder_errors: u64,
    pub keyframe_requests: u64,
    pub suppressed_keyframe_requests: u64,
}

struct LifecycleShared {
    stream_id: StreamId,
    reassembler: FrameReassembler,
    control: Box<dyn ControlChannel>,
    keyframe_request_cooldown: Duration,
    last_keyframe_request: Option<Instant>,
    last_known_dimensions: Option<(u32, u32)>,
    first_frame_received: bool,
    stats: LifecycleStats,
}

impl LifecycleShared {
    /// Sends a keyframe request unless one went out within the cooldown
    /// window, regardless of which caller asked for it.
    fn request_keyframe(&mut self) {
        let now = Instant::now();
        let cooled_down = self
            .last_keyframe_request
            .map(|t| now.duration_since(t) >= self.keyframe_request_cooldown)
            .unwrap_or(true);
        if cooled_down {
            self.last_keyframe_request = Some(now);
            self.control.send_keyframe_request(self.stream_id);
            self.stats.keyframe_requests += 1;
        } else {
            self.stats.suppressed_keyframe_requests += 1;
        }
    }
}

/// Coordinates one stream's reassembler and decoder controller. `F` is the
/// hardware decoder backend's session factory.
pub struct StreamLifecycle<F: HardwareDecoderSessionFactory> {
    stream_id: StreamId,
    controller: DecoderController<F>,
    shared: Arc<Mutex<LifecycleShared>>,
    frame_cache: FrameCache,
    pending_complete: Arc<Mutex<Vec<CompleteFrame>>>,
}

impl<F: HardwareDecoderSessionFactory> StreamLifecycle<F> {
    pub fn new(
        stream_id: StreamId,
        config: StreamConfig,
        factory: F,
        control: Box<dyn ControlChannel>,
        frame_cache: FrameCache,
    ) -> Self {
        let mut reassembler = FrameReassembler::new(config);
        let pending_complete = Arc::new(Mutex::new(Vec::new()));
        let pending_complete_clone = pending_complete.clone();
        reassembler.on_complete_frame(move |frame| {
            pending_complete_clone.lock().unwrap().push(frame);
        });

        let shared = Arc::new(Mutex::new(LifecycleShared {
            stream_id,
            reassembler,
            control,
            keyframe_request_cooldown: config.keyframe_request_cooldown,
            last_keyframe_request: None,
            last_known_dimensions: None,
            first_frame_received: false,
            stats: LifecycleStats::default(),
        }));

        let mut controller = DecoderController::new(config, factory);

        let error_shared = shared.clone();
        controller.set_error_threshold_handler(move || {
            let mut shared = error_shared.lock().unwrap();
            shared.reassembler.enter_keyframe_only_mode();
            shared.request_keyframe();
        });

        let dimension_shared = shared.clone();
        controller.set_dimension_change_handler(move |width, height| {
            dimension_shared.lock().unwrap().last_known_dimensions = Some((width, height));
        });

        Self { stream_id, controller, shared, frame_cache, pending_complete }
    }

    /// Registers the handler C3's input-blocking transitions are forwarded
    /// to, for propagation to the input layer.
    pub fn set_input_blocking_handler<G>(&mut self, handler: G)
    where
        G: FnMut(bool) + Send + 'static,
    {
        self.controller.set_input_blocking_handler(handler);
    }

    pub fn start(&mut self) {
        let shared = self.shared.clone();
        let frame_cache = self.frame_cache.clone();
        let stream_id = self.stream_id;
        self.controller.start(move |buffer, presentation_timestamp, content_rect| {
            frame_cache.publish(stream_id, DecodedPicture { buffer, presentation_timestamp, content_rect });
            let mut shared = shared.lock().unwrap();
            shared.first_frame_received = true;
            shared.stats.decoded_picture_count += 1;
        });
    }

    pub fn stop(&mut self) {
        self.controller.stop();
        self.frame_cache.remove(self.stream_id);
    }

    /// Resets both owned components to their just-started state, for
    /// reconnection after a transport-level drop.
    pub fn reset_for_new_session(&mut self) {
        self.controller.reset_for_new_session();
        let mut shared = self.shared.lock().unwrap();
        shared.reassembler.reset();
        shared.first_frame_received = false;
        shared.last_known_dimensions = None;
        shared.last_keyframe_request = None;
    }

    /// Recovery after a host-level interruption (e.g. app backgrounding):
    /// drops in-flight reconfiguration state and asks for a fresh
    /// keyframe, without tearing down the decoding session.
    pub fn request_recovery(&mut self) {
        self.controller.clear_pending_state();
        self.shared.lock().unwrap().request_keyframe();
    }

    /// Admits one fragment. Runs reassembly to completion, then feeds any
    /// resulting complete frames to the decoder controller in order.
    pub fn admit_packet(&mut self, header: &FrameHeader, payload: &[u8]) {
        {
            let mut shared = self.shared.lock().unwrap();
            shared.reassembler.process(header, payload);
        }

        let frames: Vec<CompleteFrame> = std::mem::take(&mut *self.pending_complete.lock().unwrap());
        for frame in frames {
            let result = self.controller.decode(
                &frame.frame_bytes,
                frame.timestamp,
                frame.is_keyframe,
                frame.content_rect,
            );
            if let Err(err) = result {
                let fatal = matches!(err, DecoderError::Fatal(_));
                self.shared.lock().unwrap().stats.decoder_errors += 1;
                if fatal {
                    self.fail_unrecoverable(LifecycleError::from(err));
                    return;
                }
                log::warn!("decoder error on stream {}: {err}", self.stream_id);
                let mut shared = self.shared.lock().unwrap();
                shared.reassembler.enter_keyframe_only_mode();
                shared.request_keyframe();
            }
        }
    }

    /// `DecoderFatal`: cannot create a session from well-formed parameter
    /// sets. Tears the stream down and notifies the control channel,
    /// matching the C4 policy for an unrecoverable decoder error.
    fn fail_unrecoverable(&mut self, err: LifecycleError) {
        log::error!("stream {} unrecoverable, tearing it down: {err}", self.stream_id);
        self.shared.lock().unwrap().control.notify_stream_unrecoverable(self.stream_id);
        self.stop();
    }

    /// Reacts to host control-channel events addressed to this stream;
    /// events for other streams are ignored.
    pub fn handle_control_event(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::StreamStarted { stream_id, initial_dimension_token, .. }
                if stream_id == self.stream_id =>
            {
                self.shared.lock().unwrap().reassembler.set_expected_dimension_token(initial_dimension_token);
            }
            ControlEvent::DisplayResolutionChange { stream_id, width, height }
                if stream_id == self.stream_id =>
            {
                self.controller.prepare_for_dimension_change(Some(width), Some(height));
            }
            ControlEvent::StreamStopped { stream_id } if stream_id == self.stream_id => {
                self.stop();
            }
            _ => {}
        }
    }

    pub fn has_received_first_frame(&self) -> bool {
        self.shared.lock().unwrap().first_frame_received
    }

    pub fn last_known_dimensions(&self) -> Option<(u32, u32)> {
        self.shared.lock().unwrap().last_known_dimensions
    }

    pub fn stats(&self) -> LifecycleStats {
        self.shared.lock().unwrap().stats
    }

    pub fn reassembler_stats(&self) -> ReassemblerStats {
        self.shared.lock().unwrap().reassembler.stats()
    }

    pub fn is_input_blocked(&self) -> bool {
        self.controller.is_input_blocked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::RecordingControlChannel;
    use crate::decoder::hevc::tests_support::build_framed_keyframe;
    use crate::decoder::session::test_support::TestDecoderSessionFactory;
    use crate::wire::{checksum, ContentRect, FLAG_KEYFRAME};

    fn single_fragment_header(stream_id: StreamId, frame_number: u32, keyframe: bool, payload: &[u8]) -> FrameHeader {
        FrameHeader {
            version: 1,
            flags: if keyframe { FLAG_KEYFRAME } else { 0 },
            stream_id,
            sequence_number: 0,
            timestamp: frame_number as u64,
            frame_number,
            fragment_index: 0,
            fragment_count: 1,
            payload_length: payload.len() as u32,
            frame_byte_count: payload.len() as u32,
            checksum: checksum(payload),
            content_rect: ContentRect { x: 0.0, y: 0.0, w: 640.0, h: 480.0 },
            dimension_token: 0,
            epoch: 0,
        }
    }

    #[test]
    fn decoded_keyframe_is_published_to_frame_cache() {
        let frame_cache = FrameCache::new();
        let mut lifecycle = StreamLifecycle::new(
            1,
            StreamConfig::default(),
            TestDecoderSessionFactory::default(),
            Box::new(RecordingControlChannel::default()),
            frame_cache.clone(),
        );
        lifecycle.start();

        let keyframe = build_framed_keyframe(640, 480);
        let header = single_fragment_header(1, 10, true, &keyframe);
        lifecycle.admit_packet(&header, &keyframe);

        assert!(frame_cache.latest(1).is_some());
        assert_eq!(lifecycle.stats().decoded_picture_count, 1);
        assert!(lifecycle.has_received_first_frame());
    }

    #[test]
    fn error_threshold_enters_keyframe_only_mode_and_requests_keyframe() {
        let factory = TestDecoderSessionFactory::default();
        let mut lifecycle = StreamLifecycle::new(
            1,
            StreamConfig::default(),
            factory.clone(),
            Box::new(RecordingControlChannel::default()),
            FrameCache::new(),
        );
        lifecycle.start();

        let keyframe = build_framed_keyframe(640, 480);
        let header = single_fragment_header(1, 1, true, &keyframe);
        lifecycle.admit_packet(&header, &keyframe);

        factory.queue_failures(5);
        for frame_number in 2..=6u32 {
            let payload = [0u8, 0, 0, 1, 0x02];
            let header = single_fragment_header(1, frame_number, false, &payload);
            lifecycle.admit_packet(&header, &payload);
        }

        assert_eq!(lifecycle.stats().keyframe_requests, 1);
        assert_eq!(lifecycle.reassembler_stats().keyframe_only_drops, 0);

        // A subsequent non-keyframe is now dropped by the reassembler
        // itself, since enter_keyframe_only_mode() took effect.
        let payload = b"p";
        let header = single_fragment_header(1, 7, false, payload);
        lifecycle.admit_packet(&header, payload);
        assert_eq!(lifecycle.reassembler_stats().keyframe_only_drops, 1);
    }

    #[test]
    fn keyframe_request_cooldown_suppresses_rapid_repeats() {
        let mut lifecycle = StreamLifecycle::new(
            1,
            StreamConfig::default(),
            TestDecoderSessionFactory::default(),
            Box::new(RecordingControlChannel::default()),
            FrameCache::new(),
        );
        lifecycle.start();

        lifecycle.request_recovery();
        lifecycle.request_recovery();

        assert_eq!(lifecycle.stats().keyframe_requests, 1);
        assert_eq!(lifecycle.stats().suppressed_keyframe_requests, 1);
    }

    /// Records unrecoverable-stream notifications via a shared `Arc`,
    /// since `RecordingControlChannel` itself is moved into the
    /// `Box<dyn ControlChannel>` and unobservable from outside.
    struct ObservingControlChannel {
        unrecoverable: Arc<Mutex<Vec<StreamId>>>,
    }

    impl ControlChannel for ObservingControlChannel {
        fn send_keyframe_request(&mut self, _stream_id: StreamId) {}

        fn notify_stream_unrecoverable(&mut self, stream_id: StreamId) {
            self.unrecoverable.lock().unwrap().push(stream_id);
        }
    }

    #[test]
    fn session_creation_failure_escalates_and_tears_down_the_stream() {
        let frame_cache = FrameCache::new();
        let factory = TestDecoderSessionFactory::default();
        factory.set_fail_creation(true);
        let unrecoverable = Arc::new(Mutex::new(Vec::new()));
        let mut lifecycle = StreamLifecycle::new(
            1,
            StreamConfig::default(),
            factory,
            Box::new(ObservingControlChannel { unrecoverable: unrecoverable.clone() }),
            frame_cache.clone(),
        );
        lifecycle.start();

        let keyframe = build_framed_keyframe(640, 480);
        for frame_number in 0..5u32 {
            let header = single_fragment_header(1, frame_number, true, &keyframe);
            lifecycle.admit_packet(&header, &keyframe);
        }

        assert_eq!(*unrecoverable.lock().unwrap(), vec![1]);
        assert!(frame_cache.latest(1).is_none());
    }

    #[test]
    fn stop_removes_frame_cache_entry() {
        let frame_cache = FrameCache::new();
        let mut lifecycle = StreamLifecycle::new(
            1,
            StreamConfig::default(),
            TestDecoderSessionFactory::default(),
            Box::new(RecordingControlChannel::default()),
            frame_cache.clone(),
        );
        lifecycle.start();

        let keyframe = build_framed_keyframe(640, 480);
        let header = single_fragment_header(1, 1, true, &keyframe);
        lifecycle.admit_packet(&header, &keyframe);
        assert!(frame_cache.latest(1).is_some());

        lifecycle.stop();
        assert!(frame_cache.latest(1).is_none());
    }
}
