// Copyright 2024 The MirageKit Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Wire format for MirageKit data-port packets.
//!
//! One UDP datagram carries one fixed-size [`FrameHeader`] followed by
//! `header.payload_length` bytes of payload. All multi-byte integer and
//! float fields are little-endian.

use byteorder::{ByteOrder, LittleEndian};

/// `"MIRG"` read as a little-endian u32, i.e. bytes `['M','I','R','G']` at
/// increasing addresses.
pub const MAGIC: u32 = 0x4752_494D;

/// Size in bytes of the fixed [`FrameHeader`] portion of a datagram.
pub const HEADER_LEN: usize = 61;

pub const FLAG_KEYFRAME: u16 = 1 << 0;
pub const FLAG_END_OF_FRAME: u16 = 1 << 1;

pub type StreamId = u16;

/// A contiguous rectangle within a decoded picture, used to crop capture
/// black-bars. Units are host-defined (typically points or pixels).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// The fixed-size header prefixing every data-port datagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameHeader {
    pub version: u8,
    pub flags: u16,
    pub stream_id: StreamId,
    /// Monotonic per-stream sequence number. Parsed and carried but not
    /// consulted by reassembly logic.
    pub sequence_number: u32,
    /// Opaque host-clock timestamp.
    pub timestamp: u64,
    /// Monotonic per-stream frame number; the field reassembly actually
    /// orders and dedupes on.
    pub frame_number: u32,
    pub fragment_index: u16,
    pub fragment_count: u16,
    pub payload_length: u32,
    pub frame_byte_count: u32,
    pub checksum: u32,
    pub content_rect: ContentRect,
    pub dimension_token: u16,
    pub epoch: u16,
}

impl FrameHeader {
    pub fn is_keyframe(&self) -> bool {
        self.flags & FLAG_KEYFRAME != 0
    }

    pub fn is_end_of_frame(&self) -> bool {
        self.flags & FLAG_END_OF_FRAME != 0
    }

    /// Parses a [`FrameHeader`] from the start of `buf`. Returns `None` if
    /// `buf` is shorter than [`HEADER_LEN`], if the magic doesn't match, or
    /// `fragment_index >= fragment_count`.
    ///
    /// Version mismatches are NOT rejected here: the caller (the router)
    /// decides what versions it accepts, since a header-parsing helper
    /// shouldn't encode protocol-negotiation policy.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_LEN {
            return None;
        }
        let magic = LittleEndian::read_u32(&buf[0..4]);
        if magic != MAGIC {
            return None;
        }
        let header = FrameHeader {
            version: buf[4],
            flags: LittleEndian::read_u16(&buf[5..7]),
            stream_id: LittleEndian::read_u16(&buf[7..9]),
            sequence_number: LittleEndian::read_u32(&buf[9..13]),
            timestamp: LittleEndian::read_u64(&buf[13..21]),
            frame_number: LittleEndian::read_u32(&buf[21..25]),
            fragment_index: LittleEndian::read_u16(&buf[25..27]),
            fragment_count: LittleEndian::read_u16(&buf[27..29]),
            payload_length: LittleEndian::read_u32(&buf[29..33]),
            frame_byte_count: LittleEndian::read_u32(&buf[33..37]),
            checksum: LittleEndian::read_u32(&buf[37..41]),
            content_rect: ContentRect {
                x: LittleEndian::read_f32(&buf[41..45]),
                y: LittleEndian::read_f32(&buf[45..49]),
                w: LittleEndian::read_f32(&buf[49..53]),
                h: LittleEndian::read_f32(&buf[53..57]),
            },
            dimension_token: LittleEndian::read_u16(&buf[57..59]),
            epoch: LittleEndian::read_u16(&buf[59..61]),
        };
        if header.fragment_index >= header.fragment_count {
            return None;
        }
        Some(header)
    }

    /// Serializes this header to its 61-byte wire form.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        LittleEndian::write_u32(&mut buf[0..4], MAGIC);
        buf[4] = self.version;
        LittleEndian::write_u16(&mut buf[5..7], self.flags);
        LittleEndian::write_u16(&mut buf[7..9], self.stream_id);
        LittleEndian::write_u32(&mut buf[9..13], self.sequence_number);
        LittleEndian::write_u64(&mut buf[13..21], self.timestamp);
        LittleEndian::write_u32(&mut buf[21..25], self.frame_number);
        LittleEndian::write_u16(&mut buf[25..27], self.fragment_index);
        LittleEndian::write_u16(&mut buf[27..29], self.fragment_count);
        LittleEndian::write_u32(&mut buf[29..33], self.payload_length);
        LittleEndian::write_u32(&mut buf[33..37], self.frame_byte_count);
        LittleEndian::write_u32(&mut buf[37..41], self.checksum);
        LittleEndian::write_f32(&mut buf[41..45], self.content_rect.x);
        LittleEndian::write_f32(&mut buf[45..49], self.content_rect.y);
        LittleEndian::write_f32(&mut buf[49..53], self.content_rect.w);
        LittleEndian::write_f32(&mut buf[53..57], self.content_rect.h);
        LittleEndian::write_u16(&mut buf[57..59], self.dimension_token);
        LittleEndian::write_u16(&mut buf[59..61], self.epoch);
        buf
    }
}

/// CRC-32/IEEE of `payload`, matching `header.checksum` on a well-formed
/// packet. This is the same polynomial `crc32fast` uses elsewhere in the
/// corpus for frame-content checksums.
pub fn checksum(payload: &[u8]) -> u32 {
    crc32fast::hash(payload)
}

/// Wraparound-aware distance `a - b` over the 32-bit frame-number space,
/// used by the staleness checks that gate late-arriving fragments.
pub fn wrapping_distance(a: u32, b: u32) -> u32 {
    a.wrapping_sub(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> FrameHeader {
        FrameHeader {
            version: 1,
            flags: FLAG_KEYFRAME,
            stream_id: 7,
            sequence_number: 42,
            timestamp: 0x1122_3344_5566_7788,
            frame_number: 100,
            fragment_index: 3,
            fragment_count: 10,
            payload_length: 256,
            frame_byte_count: 2048,
            checksum: 0xdead_beef,
            content_rect: ContentRect { x: 1.0, y: 2.0, w: 3.5, h: 4.5 },
            dimension_token: 9,
            epoch: 2,
        }
    }

    #[test]
    fn encode_decode_is_a_bijection() {
        let header = sample_header();
        let bytes = header.encode();
        assert_eq!(bytes.len(), HEADER_LEN);
        let decoded = FrameHeader::decode(&bytes).expect("valid header");
        assert_eq!(decoded, header);
    }

    #[test]
    fn rejects_short_buffer() {
        let header = sample_header();
        let bytes = header.encode();
        assert!(FrameHeader::decode(&bytes[..HEADER_LEN - 1]).is_none());
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample_header().encode();
        bytes[0] ^= 0xff;
        assert!(FrameHeader::decode(&bytes).is_none());
    }

    #[test]
    fn rejects_fragment_index_out_of_range() {
        let mut header = sample_header();
        header.fragment_index = header.fragment_count;
        let bytes = header.encode();
        assert!(FrameHeader::decode(&bytes).is_none());
    }

    #[test]
    fn checksum_matches_crc32fast() {
        let payload = b"hello mirage";
        assert_eq!(checksum(payload), crc32fast::hash(payload));
    }

    #[test]
    fn corrupting_payload_changes_checksum() {
        let payload = b"hello mirage".to_vec();
        let mut corrupted = payload.clone();
        corrupted[0] ^= 0x01;
        assert_ne!(checksum(&payload), checksum(&corrupted));
    }
}
