// Copyright 2024 The MirageKit Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Opaque decoded-picture handle.
//!
//! The pixel buffer's concrete type is owned by the GPU subsystem, not by
//! this crate. This mirrors `cros-codecs::decoder::DecodedHandle`: the
//! core never inspects the payload, only moves and drops a
//! reference-counted handle. A real platform backend stores its
//! `CVPixelBufferRef`/`AHardwareBuffer`/GBM handle behind
//! `PixelBuffer::new`; tests use a `Vec<u8>` payload.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct PixelBuffer {
    inner: Arc<dyn Any + Send + Sync>,
}

impl PixelBuffer {
    pub fn new<T: Any + Send + Sync>(payload: T) -> Self {
        Self { inner: Arc::new(payload) }
    }

    /// Downcasts to the concrete backend payload type, for tests and
    /// backend-specific renderer glue.
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Number of outstanding references to this buffer's payload. A
    /// renderer that still holds a clone keeps the decoder from reusing
    /// the backing memory; it is released once the renderer drops its
    /// clone.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer").field("refs", &self.strong_count()).finish()
    }
}

/// A decoded picture ready for presentation.
#[derive(Debug, Clone)]
pub struct DecodedPicture {
    pub buffer: PixelBuffer,
    pub presentation_timestamp: u64,
    pub content_rect: crate::wire::ContentRect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_roundtrips_payload() {
        let buf = PixelBuffer::new(vec![1u8, 2, 3]);
        assert_eq!(buf.downcast_ref::<Vec<u8>>().unwrap(), &vec![1u8, 2, 3]);
    }

    #[test]
    fn strong_count_tracks_clones() {
        let buf = PixelBuffer::new(42u32);
        assert_eq!(buf.strong_count(), 1);
        let clone = buf.clone();
        assert_eq!(buf.strong_count(), 2);
        drop(clone);
        assert_eq!(buf.strong_count(), 1);
    }
}
