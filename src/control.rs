// Copyright 2024 The MirageKit Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Control-channel boundary.
//!
//! Message framing and serialization over the wire are out of scope here.
//! This module defines only the messages the core consumes or emits, and
//! the trait the stream lifecycle coordinator calls into to emit them —
//! not a TCP implementation.

use crate::wire::StreamId;

/// Host-initiated control messages the CORE reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    StreamStarted {
        stream_id: StreamId,
        min_width: u32,
        min_height: u32,
        initial_dimension_token: u16,
    },
    DesktopStreamStarted {
        stream_id: StreamId,
    },
    DisplayResolutionChange {
        stream_id: StreamId,
        width: u32,
        height: u32,
    },
    StreamStopped {
        stream_id: StreamId,
    },
}

/// The outbound half of the control channel: what C4 needs to emit is a
/// keyframe request carrying a stream id, and a one-way notice when a
/// stream has hit an unrecoverable decoder error and been torn down.
pub trait ControlChannel: Send {
    fn send_keyframe_request(&mut self, stream_id: StreamId);

    /// Called once, right before the stream is stopped, when C3 reports
    /// `DecoderError::Fatal` — cannot create a session from well-formed
    /// parameter sets.
    fn notify_stream_unrecoverable(&mut self, stream_id: StreamId);
}

/// An in-memory double used by tests and the demo binary; no network I/O.
#[derive(Default)]
pub struct RecordingControlChannel {
    pub keyframe_requests: Vec<StreamId>,
    pub unrecoverable_streams: Vec<StreamId>,
}

impl ControlChannel for RecordingControlChannel {
    fn send_keyframe_request(&mut self, stream_id: StreamId) {
        self.keyframe_requests.push(stream_id);
    }

    fn notify_stream_unrecoverable(&mut self, stream_id: StreamId) {
        self.unrecoverable_streams.push(stream_id);
    }
}
