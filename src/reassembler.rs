// Copyright 2024 The MirageKit Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! C2: the per-stream frame reassembler.
//!
//! A plain synchronous struct, not an actor: `process()` runs to
//! completion before the caller admits the next packet for this stream.
//! Modeled after the single-owner, no-internal-locking state struct style
//! of `cros-codecs::decoder::stateless::StatelessDecoder`.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::config::StreamConfig;
use crate::error::ReassemblerDropReason;
use crate::wire::{checksum, ContentRect, FrameHeader};

/// One frame still being assembled from its fragments.
struct PendingFrame {
    fragments: BTreeMap<u16, Vec<u8>>,
    total_fragments: u16,
    /// Sticky: set by any fragment that carries the KEYFRAME flag,
    /// regardless of arrival order.
    is_keyframe: bool,
    timestamp: u64,
    content_rect: ContentRect,
    first_received_at: Instant,
}

impl PendingFrame {
    fn new(header: &FrameHeader, now: Instant) -> Self {
        Self {
            fragments: BTreeMap::new(),
            total_fragments: header.fragment_count,
            is_keyframe: header.is_keyframe(),
            timestamp: header.timestamp,
            content_rect: header.content_rect,
            first_received_at: now,
        }
    }

    fn insert(&mut self, header: &FrameHeader, payload: &[u8]) {
        if header.is_keyframe() {
            self.is_keyframe = true;
        }
        // If an index is received twice, prefer the later bytes: a plain
        // overwrite, acceptable since payload is identical after CRC
        // validation.
        self.fragments.insert(header.fragment_index, payload.to_vec());
    }

    fn is_complete(&self) -> bool {
        self.fragments.len() as u16 == self.total_fragments
    }

    fn concat_in_order(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for bytes in self.fragments.values() {
            out.extend_from_slice(bytes);
        }
        out
    }

    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.first_received_at)
    }
}

/// Diagnostic counters, exposed for operator tooling and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReassemblerStats {
    pub dropped_frame_count: u64,
    pub dimension_token_drops: u64,
    pub keyframe_only_drops: u64,
    pub checksum_drops: u64,
    pub stale_drops: u64,
    pub discarded_completed_count: u64,
}

/// A successfully assembled, delivered frame.
pub struct CompleteFrame {
    pub frame_bytes: Vec<u8>,
    pub is_keyframe: bool,
    pub timestamp: u64,
    pub content_rect: ContentRect,
}

pub struct FrameReassembler {
    config: StreamConfig,
    pending_frames: BTreeMap<u32, PendingFrame>,
    last_completed_frame_number: u32,
    last_delivered_keyframe_number: u32,
    awaiting_keyframe: bool,
    expected_dimension_token: u16,
    dimension_token_validation_enabled: bool,
    stats: ReassemblerStats,
    on_complete: Option<Box<dyn FnMut(CompleteFrame) + Send>>,
}

impl FrameReassembler {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            pending_frames: BTreeMap::new(),
            last_completed_frame_number: 0,
            last_delivered_keyframe_number: 0,
            awaiting_keyframe: false,
            expected_dimension_token: 0,
            dimension_token_validation_enabled: false,
            stats: ReassemblerStats::default(),
            on_complete: None,
        }
    }

    pub fn on_complete_frame<F>(&mut self, callback: F)
    where
        F: FnMut(CompleteFrame) + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
    }

    /// Called by C4 on stream-start and after a host-signalled resize.
    pub fn set_expected_dimension_token(&mut self, token: u16) {
        self.expected_dimension_token = token;
        self.dimension_token_validation_enabled = true;
    }

    /// Called by C4 when C3 reports a decode-error threshold: all
    /// subsequent non-keyframe packets are dropped until a keyframe
    /// completes.
    pub fn enter_keyframe_only_mode(&mut self) {
        self.awaiting_keyframe = true;
    }

    /// Called on stream reset; yields the same delivery sequence for the
    /// same subsequent packet stream as a fresh reassembler.
    pub fn reset(&mut self) {
        self.pending_frames.clear();
        self.last_completed_frame_number = 0;
        self.last_delivered_keyframe_number = 0;
        self.awaiting_keyframe = false;
        self.expected_dimension_token = 0;
        self.dimension_token_validation_enabled = false;
        self.stats = ReassemblerStats::default();
    }

    pub fn stats(&self) -> ReassemblerStats {
        self.stats
    }

    pub fn should_request_keyframe(&self) -> bool {
        self.pending_frames.len() > self.config.pending_frame_request_threshold
    }

    /// Admits one fragment, running every admission check to completion
    /// before returning.
    pub fn process(&mut self, header: &FrameHeader, payload: &[u8]) {
        let now = Instant::now();
        self.expire_timeouts(now);

        if !self.admit(header, payload) {
            return;
        }

        let pending = self
            .pending_frames
            .entry(header.frame_number)
            .or_insert_with(|| PendingFrame::new(header, now));
        pending.insert(header, payload);

        if pending.is_complete() {
            self.try_deliver(header.frame_number);
        }
    }

    /// Runs the dimension-token, keyframe-only, checksum, and staleness
    /// admission checks in order, dropping on first failure.
    fn admit(&mut self, header: &FrameHeader, payload: &[u8]) -> bool {
        if self.dimension_token_validation_enabled
            && header.dimension_token != self.expected_dimension_token
        {
            if header.is_keyframe() {
                self.expected_dimension_token = header.dimension_token;
            } else {
                self.count_drop(ReassemblerDropReason::DimensionToken);
                return false;
            }
        }

        if self.awaiting_keyframe && !header.is_keyframe() {
            self.count_drop(ReassemblerDropReason::KeyframeOnly);
            return false;
        }

        if checksum(payload) != header.checksum {
            self.count_drop(ReassemblerDropReason::ChecksumMismatch);
            return false;
        }

        if !header.is_keyframe() {
            let delta = wrapping_behind(self.last_completed_frame_number, header.frame_number);
            if delta < self.config.stale_frame_window {
                self.count_drop(ReassemblerDropReason::Stale);
                return false;
            }
        }

        true
    }

    fn count_drop(&mut self, reason: ReassemblerDropReason) {
        match reason {
            ReassemblerDropReason::DimensionToken => self.stats.dimension_token_drops += 1,
            ReassemblerDropReason::KeyframeOnly => self.stats.keyframe_only_drops += 1,
            ReassemblerDropReason::ChecksumMismatch => self.stats.checksum_drops += 1,
            ReassemblerDropReason::Stale => self.stats.stale_drops += 1,
        }
        log::trace!("dropping fragment: {reason}");
    }

    fn try_deliver(&mut self, frame_number: u32) {
        let is_keyframe = match self.pending_frames.get(&frame_number) {
            Some(pending) => pending.is_keyframe,
            None => return,
        };

        let should_deliver = if is_keyframe {
            frame_number > self.last_delivered_keyframe_number
                || self.last_delivered_keyframe_number == 0
        } else {
            frame_number > self.last_completed_frame_number
                && frame_number > self.last_delivered_keyframe_number
        };

        let pending = self.pending_frames.remove(&frame_number).expect("just checked present");

        if !should_deliver {
            self.stats.discarded_completed_count += 1;
            return;
        }

        let frame_bytes = pending.concat_in_order();

        if is_keyframe {
            self.last_delivered_keyframe_number = frame_number;
            self.awaiting_keyframe = false;
        }
        self.last_completed_frame_number = frame_number;

        self.discard_superseded_non_keyframes(frame_number);

        if let Some(callback) = self.on_complete.as_mut() {
            callback(CompleteFrame {
                frame_bytes,
                is_keyframe,
                timestamp: pending.timestamp,
                content_rect: pending.content_rect,
            });
        }
    }

    /// Discards pending non-keyframe frames superseded by a just-delivered
    /// frame. Pending keyframes are never evicted here: they may still
    /// complete and are needed for recovery.
    fn discard_superseded_non_keyframes(&mut self, delivered_frame_number: u32) {
        let window = self.config.stale_frame_window;
        let stale: Vec<u32> = self
            .pending_frames
            .iter()
            .filter(|(&frame_number, pending)| {
                !pending.is_keyframe
                    && wrapping_behind(delivered_frame_number, frame_number) < window
                    && frame_number != delivered_frame_number
            })
            .map(|(&frame_number, _)| frame_number)
            .collect();
        for frame_number in stale {
            self.pending_frames.remove(&frame_number);
        }
    }

    fn expire_timeouts(&mut self, now: Instant) {
        let p_frame_timeout = self.config.p_frame_timeout;
        let keyframe_timeout = self.config.keyframe_timeout;
        let expired: Vec<u32> = self
            .pending_frames
            .iter()
            .filter(|(_, pending)| {
                let timeout = if pending.is_keyframe { keyframe_timeout } else { p_frame_timeout };
                pending.age(now) >= timeout
            })
            .map(|(&frame_number, _)| frame_number)
            .collect();
        for frame_number in expired {
            self.pending_frames.remove(&frame_number);
            self.stats.dropped_frame_count += 1;
        }
    }
}

/// Wraparound-aware "is `candidate` behind `current`" distance: small when
/// `candidate` is a little before `current`, large (effectively "not
/// behind") once the gap exceeds the 32-bit wrap interval's plausible
/// range.
fn wrapping_behind(current: u32, candidate: u32) -> u32 {
    current.wrapping_sub(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn header(frame_number: u32, fragment_index: u16, fragment_count: u16, keyframe: bool) -> FrameHeader {
        FrameHeader {
            version: 1,
            flags: if keyframe { crate::wire::FLAG_KEYFRAME } else { 0 },
            stream_id: 1,
            sequence_number: 0,
            timestamp: frame_number as u64,
            frame_number,
            fragment_index,
            fragment_count,
            payload_length: 0,
            frame_byte_count: 0,
            checksum: 0,
            content_rect: ContentRect { x: 0.0, y: 0.0, w: 0.0, h: 0.0 },
            dimension_token: 7,
            epoch: 0,
        }
    }

    fn feed(r: &mut FrameReassembler, frame_number: u32, fragment_index: u16, fragment_count: u16, keyframe: bool, payload: &[u8]) {
        let mut h = header(frame_number, fragment_index, fragment_count, keyframe);
        h.payload_length = payload.len() as u32;
        h.checksum = checksum(payload);
        r.process(&h, payload);
    }

    fn collector() -> (Arc<Mutex<Vec<(u32, bool)>>>, impl FnMut(CompleteFrame) + Send) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        let cb = move |frame: CompleteFrame| {
            // frame_number isn't on CompleteFrame directly; tests key off timestamp,
            // which we set equal to frame_number in `header()`.
            seen2.lock().unwrap().push((frame.timestamp as u32, frame.is_keyframe));
        };
        (seen, cb)
    }

    #[test]
    fn delivers_in_order_single_fragment_frames() {
        let mut r = FrameReassembler::new(StreamConfig::default());
        let (seen, cb) = collector();
        r.on_complete_frame(cb);
        r.set_expected_dimension_token(7);

        feed(&mut r, 10, 0, 1, true, b"A");
        feed(&mut r, 11, 0, 1, false, b"B");
        feed(&mut r, 12, 0, 1, false, b"C");

        assert_eq!(*seen.lock().unwrap(), vec![(10, true), (11, false), (12, false)]);
    }

    #[test]
    fn reassembles_multi_fragment_frame_from_out_of_order_arrival() {
        let mut r = FrameReassembler::new(StreamConfig::default());
        let (seen_bytes, _) = (Arc::new(Mutex::new(Vec::<Vec<u8>>::new())), ());
        let seen2 = seen_bytes.clone();
        r.on_complete_frame(move |frame: CompleteFrame| {
            seen2.lock().unwrap().push(frame.frame_bytes);
        });

        feed(&mut r, 20, 2, 3, false, b"C");
        feed(&mut r, 20, 0, 3, false, b"A");
        feed(&mut r, 20, 1, 3, false, b"B");

        let delivered = seen_bytes.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0], b"ABC".to_vec());
    }

    #[test]
    fn dimension_token_rejection_recovers_on_next_keyframe() {
        let mut r = FrameReassembler::new(StreamConfig::default());
        let (seen, cb) = collector();
        r.on_complete_frame(cb);
        r.set_expected_dimension_token(5);

        let mut h = header(200, 0, 1, false);
        h.dimension_token = 6;
        let payload = b"p";
        h.checksum = checksum(payload);
        r.process(&h, payload);
        assert!(seen.lock().unwrap().is_empty());

        let mut h = header(201, 0, 1, true);
        h.dimension_token = 6;
        let payload = b"k";
        h.checksum = checksum(payload);
        r.process(&h, payload);
        assert_eq!(seen.lock().unwrap().len(), 1);

        let mut h = header(202, 0, 1, false);
        h.dimension_token = 6;
        let payload = b"p2";
        h.checksum = checksum(payload);
        r.process(&h, payload);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn crc_corruption_drops_silently() {
        let mut r = FrameReassembler::new(StreamConfig::default());
        let (seen, cb) = collector();
        r.on_complete_frame(cb);

        let mut h = header(5, 0, 1, false);
        let payload = b"hello";
        h.checksum = checksum(payload);
        h.payload_length = payload.len() as u32;
        // Corrupt payload bytes while leaving header.checksum unchanged.
        r.process(&h, b"hellp");

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(r.stats().checksum_drops, 1);
    }

    #[test]
    fn keyframe_preserved_under_p_frame_flood() {
        let mut r = FrameReassembler::new(StreamConfig::default());
        let (seen, cb) = collector();
        r.on_complete_frame(cb);

        // Keyframe #100: 400 of 500 fragments arrive.
        for i in 0..400u16 {
            feed(&mut r, 100, i, 500, true, b"x");
        }
        // P-frames 101..110 complete.
        for fn_ in 101..=110u32 {
            feed(&mut r, fn_, 0, 1, false, b"p");
        }
        assert_eq!(seen.lock().unwrap().len(), 10);

        // Remaining fragments of keyframe 100 arrive; it must still
        // deliver (never evicted while incomplete).
        for i in 400..500u16 {
            feed(&mut r, 100, i, 500, true, b"x");
        }
        let delivered = seen.lock().unwrap();
        assert_eq!(delivered.len(), 11);
        assert_eq!(delivered.last(), Some(&(100, true)));
    }

    #[test]
    fn enter_keyframe_only_mode_blocks_p_frames_until_keyframe() {
        let mut r = FrameReassembler::new(StreamConfig::default());
        let (seen, cb) = collector();
        r.on_complete_frame(cb);

        r.enter_keyframe_only_mode();
        feed(&mut r, 1, 0, 1, false, b"p");
        assert!(seen.lock().unwrap().is_empty());

        feed(&mut r, 2, 0, 1, true, b"k");
        assert_eq!(seen.lock().unwrap().len(), 1);

        feed(&mut r, 3, 0, 1, false, b"p2");
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn reset_matches_fresh_reassembler_behavior() {
        let mut r = FrameReassembler::new(StreamConfig::default());
        feed(&mut r, 1, 0, 1, true, b"k");
        feed(&mut r, 2, 0, 1, false, b"p");
        r.reset();

        let mut fresh = FrameReassembler::new(StreamConfig::default());

        let (seen_r, cb_r) = collector();
        r.on_complete_frame(cb_r);
        let (seen_fresh, cb_fresh) = collector();
        fresh.on_complete_frame(cb_fresh);

        feed(&mut r, 1, 0, 1, true, b"k");
        feed(&mut r, 2, 0, 1, false, b"p");
        feed(&mut fresh, 1, 0, 1, true, b"k");
        feed(&mut fresh, 2, 0, 1, false, b"p");

        assert_eq!(*seen_r.lock().unwrap(), *seen_fresh.lock().unwrap());
    }

    #[test]
    fn should_request_keyframe_past_threshold() {
        let mut r = FrameReassembler::new(StreamConfig::default());
        for fn_ in 0..6u32 {
            feed(&mut r, fn_, 0, 2, false, b"partial");
        }
        assert!(r.should_request_keyframe());
    }
}
