// Copyright 2024 The MirageKit Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Process-wide, per-stream frame cache.
//!
//! Lets a renderer on a thread that cannot suspend on actor calls (e.g. a
//! tight redraw loop) pull the latest decoded frame per stream without
//! going through the stream's owning task. Single writer (the decoder
//! controller's decoded-picture callback) per stream, many readers.
//! Follows the `Arc<Mutex<HashMap<..>>>` shared-state convention used
//! elsewhere for process-wide maps (e.g. `resourced`'s mount point maps).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::pixel_buffer::DecodedPicture;
use crate::wire::StreamId;

#[derive(Clone, Default)]
pub struct FrameCache {
    entries: Arc<Mutex<HashMap<StreamId, DecodedPicture>>>,
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the most recent decoded picture for `stream_id`. The
    /// previously-stored buffer, if any, is dropped here before the new
    /// one is installed, so a decoder-owned buffer is never retained
    /// longer than necessary.
    pub fn publish(&self, stream_id: StreamId, picture: DecodedPicture) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(stream_id, picture);
    }

    /// Returns a clone of the most recent decoded picture for `stream_id`,
    /// if any. Readers take their own reference via `Clone`, never
    /// borrowing the cache's internal state.
    pub fn latest(&self, stream_id: StreamId) -> Option<DecodedPicture> {
        let entries = self.entries.lock().unwrap();
        entries.get(&stream_id).cloned()
    }

    /// Removes the cache entry for `stream_id`. Called by `stop()` so no
    /// stale frame is readable after a stream is torn down.
    pub fn remove(&self, stream_id: StreamId) {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(&stream_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_buffer::PixelBuffer;
    use crate::wire::ContentRect;

    fn picture(ts: u64) -> DecodedPicture {
        DecodedPicture {
            buffer: PixelBuffer::new(vec![0u8; 4]),
            presentation_timestamp: ts,
            content_rect: ContentRect { x: 0.0, y: 0.0, w: 1.0, h: 1.0 },
        }
    }

    #[test]
    fn publish_then_latest_round_trips() {
        let cache = FrameCache::new();
        cache.publish(1, picture(10));
        assert_eq!(cache.latest(1).unwrap().presentation_timestamp, 10);
        assert!(cache.latest(2).is_none());
    }

    #[test]
    fn remove_clears_entry() {
        let cache = FrameCache::new();
        cache.publish(1, picture(10));
        cache.remove(1);
        assert!(cache.latest(1).is_none());
    }

    #[test]
    fn publish_overwrites_previous() {
        let cache = FrameCache::new();
        cache.publish(1, picture(10));
        cache.publish(1, picture(20));
        assert_eq!(cache.latest(1).unwrap().presentation_timestamp, 20);
    }
}
