// Copyright 2024 The MirageKit Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Client-side real-time video transport pipeline for MirageKit remote
//! displays.
//!
//! A UDP datagram arrives at the [`router`] (C1), which demultiplexes it
//! by stream id to a [`reassembler`] (C2), which assembles complete
//! frames and hands them to a [`decoder`] controller (C3), which drives a
//! platform hardware-decoder session and publishes decoded pictures to
//! the shared [`cache`]. [`lifecycle`] (C4) owns one reassembler and one
//! decoder controller per stream and wires the signals between them and
//! the host's [`control`] channel.

pub mod cache;
pub mod config;
pub mod control;
pub mod decoder;
pub mod device_id;
pub mod error;
pub mod lifecycle;
pub mod pixel_buffer;
pub mod reassembler;
pub mod registration;
pub mod router;
pub mod wire;
