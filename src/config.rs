// Copyright 2024 The MirageKit Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Tunable timeouts, thresholds, and cooldowns.
//!
//! A plain struct with a `Default` matching the documented tuning values,
//! following `resourced::config`'s convention over a stringly-typed
//! settings map.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamConfig {
    /// How long an incomplete non-keyframe may wait for its remaining
    /// fragments before it is dropped.
    pub p_frame_timeout: Duration,
    /// How long an incomplete keyframe may wait for its remaining
    /// fragments before it is dropped.
    pub keyframe_timeout: Duration,
    /// How long the decoder controller waits for a keyframe at new
    /// dimensions before re-requesting one.
    pub dimension_change_deadline: Duration,
    /// Consecutive decode errors that trigger the first keyframe-threshold
    /// callback.
    pub error_threshold: u32,
    /// Consecutive decode errors, after the first fire, that trigger a
    /// refire to recover from a lost keyframe request.
    pub error_refire_threshold: u32,
    /// Minimum time between refires of the error-threshold callback.
    pub error_refire_cooldown: Duration,
    /// Minimum time between decoder session recreations.
    pub session_recreation_cooldown: Duration,
    /// Minimum time between outgoing keyframe requests, regardless of
    /// source.
    pub keyframe_request_cooldown: Duration,
    /// Wraparound-aware window used to distinguish genuine staleness from
    /// 32-bit frame-number wraparound.
    pub stale_frame_window: u32,
    /// Pending-frame count above which `shouldRequestKeyframe()` returns
    /// true.
    pub pending_frame_request_threshold: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            p_frame_timeout: Duration::from_millis(500),
            keyframe_timeout: Duration::from_secs(3),
            dimension_change_deadline: Duration::from_millis(2000),
            error_threshold: 5,
            error_refire_threshold: 10,
            error_refire_cooldown: Duration::from_secs(1),
            session_recreation_cooldown: Duration::from_millis(2000),
            keyframe_request_cooldown: Duration::from_millis(750),
            stale_frame_window: 1000,
            pending_frame_request_threshold: 5,
        }
    }
}
