// Copyright 2024 The MirageKit Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The hardware-decoder session boundary.
//!
//! Implementers target their platform's native hardware-decoder API
//! directly; this crate only requires configurable parameter sets,
//! asynchronous submission with a per-frame callback, and the ability to
//! invalidate and recreate the session. This mirrors the
//! `StatelessDecoderBackend` / `StatelessVideoDecoder` split in
//! `cros-codecs::decoder::stateless`: a narrow trait the controller
//! drives, with a real backend (VideoToolbox, MediaCodec, VAAPI, ...)
//! implementing it on each platform.

use anyhow::Result;

use crate::pixel_buffer::PixelBuffer;

/// Negotiated decoder parameters derived from a keyframe's VPS/SPS/PPS.
/// `output_pixel_format` follows from `bits_per_component` (8-bit BGRA vs
/// 10-bit wide-gamut). HDR/Rec.2020 fields are deliberately not modeled
/// here; implementers should not attempt to enable them.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatDescription {
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    /// AVCC length-prefix size; fixed at 4.
    pub nal_unit_header_length: u8,
}

impl FormatDescription {
    pub fn output_pixel_format(&self) -> OutputPixelFormat {
        if self.bits_per_component > 8 {
            OutputPixelFormat::TenBitWideGamut
        } else {
            OutputPixelFormat::EightBitBgra
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPixelFormat {
    EightBitBgra,
    TenBitWideGamut,
}

/// One frame ready for submission to the hardware decoder: AVCC slice
/// bytes (parameter sets and leading SEI already stripped) plus its
/// presentation timestamp.
pub struct FramedSample {
    pub data: Vec<u8>,
    pub presentation_timestamp: u64,
}

pub type DecodeCallback = Box<dyn FnOnce(Result<PixelBuffer>) + Send>;

/// A live decoding session bound to one [`FormatDescription`].
///
/// Submission is asynchronous: `submit` may return before `on_result`
/// fires. A real backend posts the result from whatever completion
/// mechanism its platform API uses (a VTDecompressionSession output
/// callback, a MediaCodec output buffer, etc.); the in-repo test backend
/// invokes it inline.
pub trait HardwareDecoderSession: Send {
    fn submit(&mut self, sample: FramedSample, on_result: DecodeCallback);
}

/// Creates sessions for a given format description. Kept distinct from
/// [`HardwareDecoderSession`] so the controller can invalidate and
/// recreate a session without caring how the concrete session type is
/// constructed.
pub trait HardwareDecoderSessionFactory: Send {
    type Session: HardwareDecoderSession;

    fn create(&self, format: &FormatDescription) -> Result<Self::Session>;
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// A session that succeeds unless the caller has told it to fail the
    /// next N submissions, used to drive C3's error-tracker tests without
    /// real hardware.
    pub struct TestDecoderSession {
        pub format: FormatDescription,
        fail_next: Arc<AtomicUsize>,
    }

    impl HardwareDecoderSession for TestDecoderSession {
        fn submit(&mut self, sample: FramedSample, on_result: DecodeCallback) {
            if self.fail_next.load(Ordering::SeqCst) > 0 {
                self.fail_next.fetch_sub(1, Ordering::SeqCst);
                on_result(Err(anyhow::anyhow!("simulated decode failure")));
                return;
            }
            let buffer = PixelBuffer::new(sample.data);
            on_result(Ok(buffer));
            let _ = sample.presentation_timestamp;
        }
    }

    #[derive(Clone, Default)]
    pub struct TestDecoderSessionFactory {
        pub fail_next: Arc<AtomicUsize>,
        pub fail_creation: Arc<std::sync::atomic::AtomicBool>,
    }

    impl TestDecoderSessionFactory {
        pub fn queue_failures(&self, count: usize) {
            self.fail_next.fetch_add(count, Ordering::SeqCst);
        }

        pub fn set_fail_creation(&self, fail: bool) {
            self.fail_creation.store(fail, Ordering::SeqCst);
        }
    }

    impl HardwareDecoderSessionFactory for TestDecoderSessionFactory {
        type Session = TestDecoderSession;

        fn create(&self, format: &FormatDescription) -> Result<Self::Session> {
            if self.fail_creation.load(Ordering::SeqCst) {
                anyhow::bail!("simulated session creation failure");
            }
            Ok(TestDecoderSession { format: format.clone(), fail_next: self.fail_next.clone() })
        }
    }
}
