// Copyright 2024 The MirageKit Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Per-boundary error types.
//!
//! One enum per propagation boundary (C1/C2/C3/C4), matching the style of
//! `cros-codecs::decoder::stateless`'s `DecodeError` / `StatelessBackendError`
//! split rather than one flat crate-wide error. C1 and C2 never return
//! these as `Err` on their hot paths; they are counted, not propagated.

use thiserror::Error;

/// Reasons C1 (the packet router) drops a datagram. Counted via
/// [`crate::router::RouterStats`], never propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RouterDropReason {
    #[error("datagram shorter than the fixed header")]
    ShortPacket,
    #[error("magic mismatch")]
    BadMagic,
    #[error("protocol version mismatch")]
    BadVersion,
    #[error("no reassembler registered for this stream id")]
    UnknownStream,
    #[error("declared payload_length does not match actual datagram length")]
    LengthMismatch,
}

/// Reasons C2 (the frame reassembler) drops a fragment. Counted via
/// [`crate::reassembler::ReassemblerStats`], never propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReassemblerDropReason {
    #[error("dimension token mismatch on a non-keyframe fragment")]
    DimensionToken,
    #[error("non-keyframe fragment while awaiting a keyframe")]
    KeyframeOnly,
    #[error("CRC-32 mismatch")]
    ChecksumMismatch,
    #[error("frame number is stale relative to the last completed frame")]
    Stale,
}

/// Errors surfaced by C3 (the decoder controller). Only the `Fatal`
/// variant propagates past the controller; transient decode failures are
/// tracked by the error-tracker state machine instead.
#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("failed to extract HEVC parameter sets and no cached format description exists")]
    ParameterSetExtraction,
    #[error("failed to create a decoding session: {0}")]
    SessionCreation(#[source] anyhow::Error),
    #[error("single-frame decode failure: {0}")]
    Transient(#[source] anyhow::Error),
    #[error("decoder cannot recover from well-formed parameter sets: {0}")]
    Fatal(#[source] anyhow::Error),
}

/// User-visible errors surfaced by C4 (the stream lifecycle coordinator).
/// This is the first layer at which an error is not merely counted.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("decoder error: {0}")]
    Decoder(#[from] DecoderError),
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),
    #[error("stream unrecoverable: {0}")]
    Unrecoverable(String),
}
