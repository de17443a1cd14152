// Copyright 2024 The MirageKit Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! C3: the per-stream decoder controller.
//!
//! Drives a hardware decoder session across keyframe-triggered
//! reconfiguration and transient decode errors. A plain single-owner
//! state struct, not an actor, following the same style as
//! [`crate::reassembler::FrameReassembler`].

pub mod hevc;
pub mod session;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::StreamConfig;
use crate::error::DecoderError;
use crate::pixel_buffer::PixelBuffer;
use crate::wire::ContentRect;
use session::{
    FormatDescription, FramedSample, HardwareDecoderSession, HardwareDecoderSessionFactory,
};

type ErrorThresholdHandler = Box<dyn FnMut() + Send>;
type DimensionChangeHandler = Box<dyn FnMut(u32, u32) + Send>;
type InputBlockingHandler = Box<dyn FnMut(bool) + Send>;
type DecodedPictureHandler = Box<dyn FnMut(PixelBuffer, u64, ContentRect) + Send>;

/// Tracks consecutive/lifetime decode errors and decides when to fire the
/// keyframe-threshold callback, refire it, and when a session recreation
/// is due.
struct ErrorTracker {
    consecutive: u32,
    total: u64,
    fired: bool,
    last_fire: Option<Instant>,
    recreation_attempted: bool,
    last_recreation: Option<Instant>,
    error_threshold: u32,
    refire_threshold: u32,
    refire_cooldown: Duration,
    recreation_cooldown: Duration,
}

impl ErrorTracker {
    fn new(config: &StreamConfig) -> Self {
        Self {
            consecutive: 0,
            total: 0,
            fired: false,
            last_fire: None,
            recreation_attempted: false,
            last_recreation: None,
            error_threshold: config.error_threshold,
            refire_threshold: config.error_refire_threshold,
            refire_cooldown: config.error_refire_cooldown,
            recreation_cooldown: config.session_recreation_cooldown,
        }
    }

    /// Returns `true` if the threshold callback should fire (first
    /// crossing or a cooled-down refire).
    fn record_error(&mut self, now: Instant) -> bool {
        self.consecutive += 1;
        self.total += 1;

        if !self.fired && self.consecutive >= self.error_threshold {
            self.fired = true;
            self.last_fire = Some(now);
            return true;
        }

        if self.fired && self.consecutive >= self.refire_threshold {
            let cooled_down = self
                .last_fire
                .map(|t| now.duration_since(t) >= self.refire_cooldown)
                .unwrap_or(true);
            if cooled_down {
                self.last_fire = Some(now);
                self.consecutive = 0;
                return true;
            }
        }

        false
    }

    /// Returns `true` if input-blocking should now be released.
    fn record_success(&mut self) -> bool {
        let was_unhealthy = self.fired || self.consecutive > self.error_threshold;
        self.fired = false;
        self.recreation_attempted = false;
        self.consecutive = 0;
        was_unhealthy
    }

    fn request_keyframe_for_dimension_change(&mut self) {
        self.consecutive = 0;
        self.fired = true;
    }

    fn should_recreate_session(&self, now: Instant) -> bool {
        if self.consecutive == 0 {
            return false;
        }
        if !self.recreation_attempted {
            return true;
        }
        self.last_recreation.map(|t| now.duration_since(t) >= self.recreation_cooldown).unwrap_or(true)
    }

    fn note_session_recreated(&mut self, now: Instant) {
        self.recreation_attempted = true;
        self.last_recreation = Some(now);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Stopped,
}

/// State a decode-result callback needs to touch, kept apart from
/// `session`/`format` so a session's `submit` (which may call back
/// synchronously) never re-borrows the controller itself. Shared between
/// the controller and every in-flight decode callback; `stop()` makes it
/// inert by clearing the picture handler so late callbacks are no-ops.
struct ControllerShared {
    run_state: RunState,
    error_tracker: ErrorTracker,
    awaiting_dimension_change: bool,
    input_blocked: bool,
    on_decoded_picture: Option<DecodedPictureHandler>,
    on_error_threshold: Option<ErrorThresholdHandler>,
    on_input_blocking: Option<InputBlockingHandler>,
}

impl ControllerShared {
    fn set_input_blocked(&mut self, blocked: bool) {
        if self.input_blocked != blocked {
            self.input_blocked = blocked;
            if let Some(handler) = self.on_input_blocking.as_mut() {
                handler(blocked);
            }
        }
    }

    fn fire_error_threshold(&mut self) {
        self.set_input_blocked(true);
        if let Some(handler) = self.on_error_threshold.as_mut() {
            handler();
        }
    }

    fn handle_decode_result(
        &mut self,
        result: anyhow::Result<PixelBuffer>,
        presentation_timestamp: u64,
        content_rect: ContentRect,
    ) {
        if self.run_state != RunState::Running {
            return;
        }
        match result {
            Ok(buffer) => {
                let should_unblock = self.error_tracker.record_success();
                if should_unblock && !self.awaiting_dimension_change {
                    self.set_input_blocked(false);
                }
                if let Some(handler) = self.on_decoded_picture.as_mut() {
                    handler(buffer, presentation_timestamp, content_rect);
                }
            }
            Err(_) => {
                let now = Instant::now();
                if self.error_tracker.record_error(now) {
                    self.fire_error_threshold();
                }
            }
        }
    }
}

/// The decoder controller for one stream. `F` is the hardware decoder
/// backend's session factory, swapped for [`session::test_support`]
/// types in tests.
pub struct DecoderController<F: HardwareDecoderSessionFactory> {
    config: StreamConfig,
    factory: F,
    session: Option<F::Session>,
    format: Option<FormatDescription>,
    cached_parameter_sets: Option<hevc::ParameterSets>,
    dimension_change_deadline: Option<Instant>,
    expected_dimensions: Option<(u32, u32)>,
    on_dimension_change: Option<DimensionChangeHandler>,
    shared: Arc<Mutex<ControllerShared>>,
    /// Consecutive session-creation failures since the last successful
    /// creation. Only ever touched from `decode`, which is the single
    /// synchronous caller, so it lives outside `ControllerShared`.
    consecutive_session_creation_failures: u32,
}

impl<F: HardwareDecoderSessionFactory> DecoderController<F> {
    pub fn new(config: StreamConfig, factory: F) -> Self {
        let shared = ControllerShared {
            run_state: RunState::Idle,
            error_tracker: ErrorTracker::new(&config),
            awaiting_dimension_change: false,
            input_blocked: false,
            on_decoded_picture: None,
            on_error_threshold: None,
            on_input_blocking: None,
        };
        Self {
            config,
            factory,
            session: None,
            format: None,
            cached_parameter_sets: None,
            dimension_change_deadline: None,
            expected_dimensions: None,
            on_dimension_change: None,
            shared: Arc::new(Mutex::new(shared)),
            consecutive_session_creation_failures: 0,
        }
    }

    pub fn set_error_threshold_handler<G>(&mut self, handler: G)
    where
        G: FnMut() + Send + 'static,
    {
        self.shared.lock().unwrap().on_error_threshold = Some(Box::new(handler));
    }

    pub fn set_dimension_change_handler<G>(&mut self, handler: G)
    where
        G: FnMut(u32, u32) + Send + 'static,
    {
        self.on_dimension_change = Some(Box::new(handler));
    }

    pub fn set_input_blocking_handler<G>(&mut self, handler: G)
    where
        G: FnMut(bool) + Send + 'static,
    {
        self.shared.lock().unwrap().on_input_blocking = Some(Box::new(handler));
    }

    pub fn start<G>(&mut self, on_decoded_picture: G)
    where
        G: FnMut(PixelBuffer, u64, ContentRect) + Send + 'static,
    {
        let mut shared = self.shared.lock().unwrap();
        shared.on_decoded_picture = Some(Box::new(on_decoded_picture));
        shared.run_state = RunState::Running;
    }

    pub fn stop(&mut self) {
        let mut shared = self.shared.lock().unwrap();
        shared.run_state = RunState::Stopped;
        shared.on_decoded_picture = None;
        drop(shared);
        self.session = None;
    }

    pub fn reset_for_new_session(&mut self) {
        self.session = None;
        self.format = None;
        self.cached_parameter_sets = None;
        self.dimension_change_deadline = None;
        self.expected_dimensions = None;
        self.consecutive_session_creation_failures = 0;
        let mut shared = self.shared.lock().unwrap();
        shared.error_tracker = ErrorTracker::new(&self.config);
        shared.awaiting_dimension_change = false;
        shared.run_state = RunState::Running;
        shared.set_input_blocked(false);
    }

    /// Called when the client initiates a resize: all P-frames are
    /// discarded until a keyframe reconfigures the session.
    pub fn prepare_for_dimension_change(&mut self, expected_width: Option<u32>, expected_height: Option<u32>) {
        let mut shared = self.shared.lock().unwrap();
        shared.awaiting_dimension_change = true;
        shared.set_input_blocked(true);
        drop(shared);
        self.dimension_change_deadline = Some(Instant::now() + self.config.dimension_change_deadline);
        self.expected_dimensions = match (expected_width, expected_height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        };
    }

    /// Recovery hook after app-background etc: drops any in-flight
    /// reconfiguration state without tearing the session down.
    pub fn clear_pending_state(&mut self) {
        self.shared.lock().unwrap().awaiting_dimension_change = false;
        self.dimension_change_deadline = None;
        self.expected_dimensions = None;
    }

    pub fn is_input_blocked(&self) -> bool {
        self.shared.lock().unwrap().input_blocked
    }

    pub fn total_error_count(&self) -> u64 {
        self.shared.lock().unwrap().error_tracker.total
    }

    pub fn decode(
        &mut self,
        frame_bytes: &[u8],
        presentation_timestamp: u64,
        is_keyframe: bool,
        content_rect: ContentRect,
    ) -> Result<(), DecoderError> {
        {
            let shared = self.shared.lock().unwrap();
            if shared.run_state != RunState::Running {
                return Ok(());
            }
        }

        let now = Instant::now();
        let awaiting_dimension_change = self.shared.lock().unwrap().awaiting_dimension_change;

        if awaiting_dimension_change && !is_keyframe {
            let deadline_exceeded = self.dimension_change_deadline.map(|d| now >= d).unwrap_or(false);
            if deadline_exceeded {
                self.shared.lock().unwrap().fire_error_threshold();
                self.dimension_change_deadline = Some(now + self.config.dimension_change_deadline);
            }
            return Ok(());
        }

        let mut slice_bytes = frame_bytes.to_vec();

        if is_keyframe {
            match hevc::split_keyframe(frame_bytes) {
                Some((parameter_sets, slice)) => {
                    let new_format = FormatDescription {
                        width: parameter_sets.width,
                        height: parameter_sets.height,
                        bits_per_component: parameter_sets.bits_per_component,
                        nal_unit_header_length: 4,
                    };
                    let dimensions_changed = self
                        .format
                        .as_ref()
                        .map(|f| f.width != new_format.width || f.height != new_format.height)
                        .unwrap_or(false);
                    let recreating_for_errors =
                        self.shared.lock().unwrap().error_tracker.should_recreate_session(now);

                    self.cached_parameter_sets = Some(parameter_sets);
                    self.format = Some(new_format.clone());
                    slice_bytes = hevc::strip_leading_sei(&slice);

                    if dimensions_changed || recreating_for_errors {
                        self.session = None;
                        let mut shared = self.shared.lock().unwrap();
                        shared.error_tracker = ErrorTracker::new(&self.config);
                        shared.set_input_blocked(true);
                        shared.error_tracker.request_keyframe_for_dimension_change();
                        shared.fire_error_threshold();
                        drop(shared);
                        if let Some(handler) = self.on_dimension_change.as_mut() {
                            handler(new_format.width, new_format.height);
                        }
                    }

                    if self
                        .expected_dimensions
                        .map(|(w, h)| w == new_format.width && h == new_format.height)
                        .unwrap_or(true)
                    {
                        self.shared.lock().unwrap().awaiting_dimension_change = false;
                        self.dimension_change_deadline = None;
                        self.expected_dimensions = None;
                    }
                }
                None => match self.cached_parameter_sets.as_ref() {
                    None => return Ok(()),
                    Some(cached) => {
                        // Extraction failed on this keyframe's bitstream;
                        // reuse the last-known-good parameter sets' format
                        // so decoding continues rather than stalling.
                        self.format = Some(FormatDescription {
                            width: cached.width,
                            height: cached.height,
                            bits_per_component: cached.bits_per_component,
                            nal_unit_header_length: 4,
                        });
                        slice_bytes = hevc::strip_leading_sei(frame_bytes);
                    }
                },
            }
        }

        let format = match self.format.clone() {
            Some(format) => format,
            None => return Ok(()),
        };

        if self.session.is_none() {
            match self.factory.create(&format) {
                Ok(session) => {
                    self.session = Some(session);
                    self.consecutive_session_creation_failures = 0;
                    self.shared.lock().unwrap().error_tracker.note_session_recreated(now);
                }
                Err(err) => {
                    self.consecutive_session_creation_failures += 1;
                    if self.consecutive_session_creation_failures >= self.config.error_threshold {
                        return Err(DecoderError::Fatal(err));
                    }
                    return Err(DecoderError::SessionCreation(err));
                }
            }
        }

        let sample = FramedSample { data: slice_bytes, presentation_timestamp };
        let shared = self.shared.clone();
        let on_result: session::DecodeCallback = Box::new(move |result| {
            shared.lock().unwrap().handle_decode_result(result, presentation_timestamp, content_rect);
        });

        if let Some(session) = self.session.as_mut() {
            session.submit(sample, on_result);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::hevc::tests_support::build_framed_keyframe;
    use crate::decoder::session::test_support::TestDecoderSessionFactory;
    use std::sync::{Arc, Mutex};

    fn rect() -> ContentRect {
        ContentRect { x: 0.0, y: 0.0, w: 640.0, h: 480.0 }
    }

    #[test]
    fn decodes_keyframe_and_emits_picture() {
        let factory = TestDecoderSessionFactory::default();
        let mut controller = DecoderController::new(StreamConfig::default(), factory);
        let pictures = Arc::new(Mutex::new(Vec::new()));
        let pics_clone = pictures.clone();
        controller.start(move |buf, ts, rect| pics_clone.lock().unwrap().push((buf, ts, rect)));

        let keyframe = build_framed_keyframe(640, 480);
        controller.decode(&keyframe, 1000, true, rect()).unwrap();

        assert_eq!(pictures.lock().unwrap().len(), 1);
        assert!(!controller.is_input_blocked());
    }

    #[test]
    fn error_threshold_fires_once_and_blocks_input() {
        let factory = TestDecoderSessionFactory::default();
        let mut controller = DecoderController::new(StreamConfig::default(), factory.clone());
        let fires = Arc::new(Mutex::new(0u32));
        let fires_clone = fires.clone();
        controller.set_error_threshold_handler(move || *fires_clone.lock().unwrap() += 1);
        let blocking = Arc::new(Mutex::new(Vec::new()));
        let blocking_clone = blocking.clone();
        controller.set_input_blocking_handler(move |b| blocking_clone.lock().unwrap().push(b));
        controller.start(|_, _, _| {});

        let keyframe = build_framed_keyframe(640, 480);
        controller.decode(&keyframe, 0, true, rect()).unwrap();

        factory.queue_failures(5);
        for i in 1..=5u64 {
            controller.decode(&[0u8, 0, 0, 1, 0x02], i, false, rect()).unwrap();
        }

        assert_eq!(*fires.lock().unwrap(), 1);
        assert_eq!(blocking.lock().unwrap().last(), Some(&true));
        assert!(controller.is_input_blocked());
    }

    #[test]
    fn session_creation_failure_escalates_to_fatal_after_error_threshold() {
        let factory = TestDecoderSessionFactory::default();
        factory.set_fail_creation(true);
        let mut controller = DecoderController::new(StreamConfig::default(), factory);
        controller.start(|_, _, _| {});

        let keyframe = build_framed_keyframe(640, 480);
        for i in 0..4u64 {
            match controller.decode(&keyframe, i, true, rect()) {
                Err(crate::error::DecoderError::SessionCreation(_)) => {}
                other => panic!("expected recoverable SessionCreation error, got {other:?}"),
            }
        }

        match controller.decode(&keyframe, 4, true, rect()) {
            Err(crate::error::DecoderError::Fatal(_)) => {}
            other => panic!("expected Fatal error on the 5th consecutive failure, got {other:?}"),
        }
    }

    #[test]
    fn dimension_change_on_new_keyframe_fires_handler() {
        let factory = TestDecoderSessionFactory::default();
        let mut controller = DecoderController::new(StreamConfig::default(), factory);
        let dim_events = Arc::new(Mutex::new(Vec::new()));
        let dim_clone = dim_events.clone();
        controller.set_dimension_change_handler(move |w, h| dim_clone.lock().unwrap().push((w, h)));
        controller.start(|_, _, _| {});

        let first = build_framed_keyframe(640, 480);
        controller.decode(&first, 0, true, rect()).unwrap();

        let second = build_framed_keyframe(1280, 720);
        controller.decode(&second, 1, true, rect()).unwrap();

        assert_eq!(dim_events.lock().unwrap().as_slice(), &[(1280, 720)]);
    }

    #[test]
    fn awaiting_dimension_change_drops_non_keyframes_until_deadline() {
        let factory = TestDecoderSessionFactory::default();
        let mut controller = DecoderController::new(StreamConfig::default(), factory);
        let fires = Arc::new(Mutex::new(0u32));
        let fires_clone = fires.clone();
        controller.set_error_threshold_handler(move || *fires_clone.lock().unwrap() += 1);
        controller.start(|_, _, _| {});
        controller.prepare_for_dimension_change(Some(1280), Some(720));
        assert!(controller.is_input_blocked());

        // Immediately after entering the state, a P-frame is dropped
        // silently (deadline not yet exceeded).
        controller.decode(&[0u8, 0, 0, 1, 0x02], 5, false, rect()).unwrap();
        assert_eq!(*fires.lock().unwrap(), 0);
    }

    #[test]
    fn recovers_after_error_threshold_fires_on_next_successful_decode() {
        let factory = TestDecoderSessionFactory::default();
        let mut controller = DecoderController::new(StreamConfig::default(), factory.clone());
        let blocking = Arc::new(Mutex::new(Vec::new()));
        let blocking_clone = blocking.clone();
        controller.set_input_blocking_handler(move |b| blocking_clone.lock().unwrap().push(b));
        controller.start(|_, _, _| {});

        let keyframe = build_framed_keyframe(640, 480);
        controller.decode(&keyframe, 0, true, rect()).unwrap();

        factory.queue_failures(5);
        for i in 1..=5u64 {
            controller.decode(&[0u8, 0, 0, 1, 0x02], i, false, rect()).unwrap();
        }
        assert!(controller.is_input_blocked());

        controller.decode(&[0u8, 0, 0, 1, 0x02], 6, false, rect()).unwrap();
        assert!(!controller.is_input_blocked());
        assert_eq!(blocking.lock().unwrap().last(), Some(&false));
    }
}
