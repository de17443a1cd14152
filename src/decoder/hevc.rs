// Copyright 2024 The MirageKit Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! HEVC (H.265) parameter-set extraction.
//!
//! NAL unit type codes are the exact ones used by
//! `cros-codecs::codec::h265::parser::NaluType` (Table 7-1 of the HEVC
//! spec): VPS=32, SPS=33, PPS=34, prefix SEI=39, suffix SEI=40.

/// The 6-bit `nal_unit_type` values this module cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaluType {
    Vps,
    Sps,
    Pps,
    PrefixSei,
    SuffixSei,
    Other(u8),
}

impl From<u8> for NaluType {
    fn from(value: u8) -> Self {
        match value {
            32 => NaluType::Vps,
            33 => NaluType::Sps,
            34 => NaluType::Pps,
            39 => NaluType::PrefixSei,
            40 => NaluType::SuffixSei,
            other => NaluType::Other(other),
        }
    }
}

/// One NAL unit found in an Annex-B byte range: its type and the byte
/// range of its payload (the header is included, start code excluded).
#[derive(Debug, Clone, PartialEq)]
pub struct NalUnit {
    pub nal_type: NaluType,
    pub bytes: Vec<u8>,
}

/// How many leading bytes of a keyframe are scanned for Annex-B start
/// codes looking for parameter sets.
const PARAMETER_SET_SCAN_WINDOW: usize = 200;

/// Scans `buf` for Annex-B start codes (`0x000001` or `0x00000001`) and
/// returns each NAL unit found along with the offset of its first payload
/// byte and the offset right after its last payload byte. Used both on
/// the scan window (for parameter sets) and, conceptually, could be
/// reused for a full Annex-B bitstream; here it's only ever called on the
/// leading window.
fn scan_annex_b(buf: &[u8]) -> Vec<(NalUnit, usize, usize)> {
    let mut starts = Vec::new();
    let mut i = 0;
    while i + 2 < buf.len() {
        if buf[i] == 0 && buf[i + 1] == 0 && buf[i + 2] == 1 {
            starts.push(i + 3);
            i += 3;
        } else {
            i += 1;
        }
    }

    let mut units = Vec::new();
    for (idx, &start) in starts.iter().enumerate() {
        if start >= buf.len() {
            continue;
        }
        let end = starts
            .get(idx + 1)
            .map(|&next| next.saturating_sub(3))
            .unwrap_or(buf.len());
        // Start codes can be 3 or 4 bytes (0x00000001); if the byte right
        // before `start` is also 0x00, the preceding zero belongs to the
        // 4-byte form and isn't part of this NAL's trailing boundary, but
        // since we always cut at `next - 3` that's already handled: any
        // leading extra zero byte of the *next* start code is excluded by
        // construction, and a leading extra zero byte of *this* start
        // code was already consumed as padding, not payload.
        if end <= start {
            continue;
        }
        let nal_header_byte = buf[start];
        let nal_type = NaluType::from((nal_header_byte >> 1) & 0x3f);
        units.push((NalUnit { nal_type, bytes: buf[start..end].to_vec() }, start, end));
    }
    units
}

/// Heuristically locates where the Annex-B parameter-set region starts
/// within a keyframe: offset 0 for raw Annex-B, or offset 4 when the
/// first four bytes are a big-endian length prefix wrapping the
/// parameter-set region.
fn locate_annex_b_start(buf: &[u8]) -> usize {
    let looks_like_start_code = |b: &[u8]| {
        (b.len() >= 3 && b[0] == 0 && b[1] == 0 && b[2] == 1)
            || (b.len() >= 4 && b[0] == 0 && b[1] == 0 && b[2] == 0 && b[3] == 1)
    };
    if looks_like_start_code(buf) {
        0
    } else if buf.len() > 4 && looks_like_start_code(&buf[4..]) {
        4
    } else {
        0
    }
}

/// The three parameter sets a keyframe must carry, and the dimensions
/// parsed from the SPS for dimension-change detection.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSets {
    pub vps: Vec<u8>,
    pub sps: Vec<u8>,
    pub pps: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
}

/// Extracts VPS/SPS/PPS from the leading bytes of a keyframe. Returns
/// `None` if any of the three is missing or the SPS fails to parse, in
/// which case the caller falls back to a cached format description if
/// one exists.
pub fn extract_parameter_sets(keyframe_bytes: &[u8]) -> Option<ParameterSets> {
    let start = locate_annex_b_start(keyframe_bytes);
    let scan_end = keyframe_bytes.len().min(start + PARAMETER_SET_SCAN_WINDOW);
    let window = &keyframe_bytes[start..scan_end];
    let units = scan_annex_b(window);

    let vps = units.iter().find(|(u, ..)| u.nal_type == NaluType::Vps)?.0.bytes.clone();
    let (sps_unit, ..) = units.iter().find(|(u, ..)| u.nal_type == NaluType::Sps)?;
    let pps = units.iter().find(|(u, ..)| u.nal_type == NaluType::Pps)?.0.bytes.clone();

    let (width, height, bits_per_component) = parse_sps_dimensions(&sps_unit.bytes)?;
    let sps = sps_unit.bytes.clone();

    Some(ParameterSets { vps, sps, pps, width, height, bits_per_component })
}

/// Splits a keyframe's raw bytes into its parameter sets and the
/// remaining AVCC-framed slice to submit to the hardware decoder. In the
/// length-prefixed framed form the leading 4-byte big-endian length gives
/// the exact end of the Annex-B parameter-set region. In the raw Annex-B
/// form there is no such marker, so the boundary is found by searching
/// forward from the end of the PPS NAL's start code for the first offset
/// whose 4 bytes, read as a big-endian length, exactly account for the
/// rest of the buffer — the AVCC slice's own length prefix. Returns
/// `None` under the same conditions as [`extract_parameter_sets`], or if
/// no such boundary can be found in the raw Annex-B form.
pub fn split_keyframe(keyframe_bytes: &[u8]) -> Option<(ParameterSets, Vec<u8>)> {
    let start = locate_annex_b_start(keyframe_bytes);
    let scan_end = keyframe_bytes.len().min(start + PARAMETER_SET_SCAN_WINDOW);
    let window = &keyframe_bytes[start..scan_end];
    let units = scan_annex_b(window);

    let (vps_unit, ..) = units.iter().find(|(u, ..)| u.nal_type == NaluType::Vps)?;
    let (sps_unit, ..) = units.iter().find(|(u, ..)| u.nal_type == NaluType::Sps)?;
    let (pps_unit, pps_start, _) = units.iter().find(|(u, ..)| u.nal_type == NaluType::Pps)?;

    let (width, height, bits_per_component) = parse_sps_dimensions(&sps_unit.bytes)?;
    let parameter_sets = ParameterSets {
        vps: vps_unit.bytes.clone(),
        sps: sps_unit.bytes.clone(),
        pps: pps_unit.bytes.clone(),
        width,
        height,
        bits_per_component,
    };

    let slice_start = if start == 4 {
        // Framed form: the leading length prefix (read relative to the
        // whole buffer, not the window) gives the parameter region's
        // exact byte length.
        let param_len = u32::from_be_bytes([
            keyframe_bytes[0],
            keyframe_bytes[1],
            keyframe_bytes[2],
            keyframe_bytes[3],
        ]) as usize;
        4 + param_len
    } else {
        find_avcc_boundary(keyframe_bytes, start + pps_start)?
    };
    let slice = keyframe_bytes.get(slice_start..)?.to_vec();
    Some((parameter_sets, slice))
}

/// Searches `buf[from..]` for the first offset at which the next 4 bytes,
/// read as a big-endian length, exactly account for the remainder of
/// `buf`. Used to find the AVCC slice's start in the raw Annex-B keyframe
/// form, where no explicit boundary marker separates it from the
/// preceding parameter sets.
fn find_avcc_boundary(buf: &[u8], from: usize) -> Option<usize> {
    for candidate in from..buf.len().saturating_sub(3) {
        let len = u32::from_be_bytes([
            buf[candidate],
            buf[candidate + 1],
            buf[candidate + 2],
            buf[candidate + 3],
        ]) as usize;
        if candidate + 4 + len == buf.len() {
            return Some(candidate);
        }
    }
    None
}

/// Strips leading SEI NAL units (prefix or suffix) from an AVCC-framed
/// slice, in case the encoder placed them before the IDR slice; some
/// hardware decoders fail to decode an IDR if SEI precedes it. `slice` is
/// AVCC-framed (4-byte big-endian length prefixes).
pub fn strip_leading_sei(mut slice: &[u8]) -> Vec<u8> {
    loop {
        if slice.len() < 4 {
            break;
        }
        let len = u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]) as usize;
        if slice.len() < 4 + len || len == 0 {
            break;
        }
        let nal_type = NaluType::from((slice[4] >> 1) & 0x3f);
        if matches!(nal_type, NaluType::PrefixSei | NaluType::SuffixSei) {
            slice = &slice[4 + len..];
        } else {
            break;
        }
    }
    slice.to_vec()
}

/// A minimal MSB-first bit reader over a byte slice, used only for the
/// handful of SPS fields this crate needs (width, height, bit depth).
/// Modeled on `cros-codecs::bitstream_utils::BitReader`'s interface, but
/// without the full HEVC profile_tier_level/VUI parsing `cros-codecs`
/// implements — this crate only needs dimensions and bit depth for
/// dimension-change detection and pixel-format selection, not a
/// conformant full SPS parse.
struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    fn read_bit(&mut self) -> Option<u32> {
        let byte = self.bit_pos / 8;
        if byte >= self.data.len() {
            return None;
        }
        let shift = 7 - (self.bit_pos % 8);
        let bit = (self.data[byte] >> shift) & 1;
        self.bit_pos += 1;
        Some(bit as u32)
    }

    fn read_bits(&mut self, n: u32) -> Option<u32> {
        let mut value = 0u32;
        for _ in 0..n {
            value = (value << 1) | self.read_bit()?;
        }
        Some(value)
    }

    /// Exp-Golomb unsigned (`ue(v)`), per H.26x bitstream convention.
    fn read_ue(&mut self) -> Option<u32> {
        let mut leading_zero_bits = 0u32;
        while self.read_bit()? == 0 {
            leading_zero_bits += 1;
            if leading_zero_bits > 32 {
                return None;
            }
        }
        if leading_zero_bits == 0 {
            return Some(0);
        }
        let suffix = self.read_bits(leading_zero_bits)?;
        Some((1u32 << leading_zero_bits) - 1 + suffix)
    }
}

/// Parses just enough of an HEVC SPS (Annex-B NAL, header included) to
/// recover `pic_width_in_luma_samples`, `pic_height_in_luma_samples`, and
/// luma bit depth. Only supports the common case of a single temporal
/// sub-layer (`sps_max_sub_layers_minus1 == 0`); streams using temporal
/// sub-layering in their profile_tier_level fall back to `None`, which
/// the caller treats like any other extraction failure, reusing the
/// cached format description instead.
fn parse_sps_dimensions(sps_nal: &[u8]) -> Option<(u32, u32, u8)> {
    // Skip the 2-byte HEVC NAL header.
    let mut r = BitReader::new(sps_nal.get(2..)?);

    let _video_parameter_set_id = r.read_bits(4)?;
    let max_sub_layers_minus1 = r.read_bits(3)?;
    let _temporal_id_nesting_flag = r.read_bit()?;

    if max_sub_layers_minus1 != 0 {
        return None;
    }

    // general profile_tier_level: a fixed 96 bits when there is no
    // sub-layer loop to follow (see module docs).
    r.read_bits(32)?;
    r.read_bits(32)?;
    r.read_bits(32)?;

    let _seq_parameter_set_id = r.read_ue()?;
    let chroma_format_idc = r.read_ue()?;
    if chroma_format_idc == 3 {
        let _separate_colour_plane_flag = r.read_bit()?;
    }

    let width = r.read_ue()?;
    let height = r.read_ue()?;

    let conformance_window_flag = r.read_bit()?;
    if conformance_window_flag != 0 {
        let _conf_win_left_offset = r.read_ue()?;
        let _conf_win_right_offset = r.read_ue()?;
        let _conf_win_top_offset = r.read_ue()?;
        let _conf_win_bottom_offset = r.read_ue()?;
    }

    let bit_depth_luma_minus8 = r.read_ue()?;

    Some((width, height, (bit_depth_luma_minus8 + 8) as u8))
}

/// Minimal HEVC bitstream builders shared by this crate's own tests and
/// by callers elsewhere in the crate that need a real keyframe buffer to
/// drive against (the decoder controller's tests, in particular).
#[cfg(any(test, feature = "test-support"))]
pub mod tests_support {
    use super::*;

    struct BitWriter {
        bytes: Vec<u8>,
        bit_pos: usize,
    }

    impl BitWriter {
        fn new() -> Self {
            Self { bytes: Vec::new(), bit_pos: 0 }
        }

        fn push_bit(&mut self, bit: u32) {
            if self.bit_pos % 8 == 0 {
                self.bytes.push(0);
            }
            let byte_idx = self.bit_pos / 8;
            let shift = 7 - (self.bit_pos % 8);
            self.bytes[byte_idx] |= ((bit & 1) as u8) << shift;
            self.bit_pos += 1;
        }

        fn push_bits(&mut self, value: u32, n: u32) {
            for i in (0..n).rev() {
                self.push_bit((value >> i) & 1);
            }
        }

        fn push_ue(&mut self, value: u32) {
            let value_plus1 = value + 1;
            let bits = 32 - value_plus1.leading_zeros();
            for _ in 0..bits - 1 {
                self.push_bit(0);
            }
            self.push_bits(value_plus1, bits);
        }

        fn finish(mut self) -> Vec<u8> {
            while self.bit_pos % 8 != 0 {
                self.push_bit(0);
            }
            self.bytes
        }
    }

    fn build_sps_nal(width: u32, height: u32) -> Vec<u8> {
        let mut w = BitWriter::new();
        w.push_bits(0, 4);
        w.push_bits(0, 3);
        w.push_bit(0);
        w.push_bits(0, 32);
        w.push_bits(0, 32);
        w.push_bits(0, 32);
        w.push_ue(0);
        w.push_ue(1);
        w.push_ue(width);
        w.push_ue(height);
        w.push_bit(0);
        w.push_ue(0);
        w.push_ue(0);
        let payload = w.finish();

        let mut nal = vec![0u8, 0u8, 1u8];
        nal.push(33u8 << 1);
        nal.push(0x01);
        nal.extend_from_slice(&payload);
        nal
    }

    fn build_nal(nal_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut nal = vec![0u8, 0u8, 1u8];
        nal.push(nal_type << 1);
        nal.push(0x01);
        nal.extend_from_slice(payload);
        nal
    }

    /// A raw-Annex-B-form keyframe: VPS/SPS/PPS Annex-B NAL units for
    /// `width`x`height` at 8-bit depth, followed by a short AVCC-framed
    /// slice NAL.
    pub fn build_framed_keyframe(width: u32, height: u32) -> Vec<u8> {
        let mut stream = Vec::new();
        stream.extend(build_nal(32, &[0xaa, 0xbb]));
        stream.extend(build_sps_nal(width, height));
        stream.extend(build_nal(34, &[0xcc]));
        let slice_payload = [0x26u8, 0x01, 0xde, 0xad];
        stream.extend_from_slice(&(slice_payload.len() as u32).to_be_bytes());
        stream.extend_from_slice(&slice_payload);
        stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a minimal, single-sub-layer HEVC SPS NAL (Annex-B, header
    /// included) for `width`x`height` at 8-bit depth. Only the fields
    /// `parse_sps_dimensions` reads are meaningful; everything else is
    /// zeroed, which is a valid (if semantically empty) bitstream for
    /// this reader's purposes.
    struct BitWriter {
        bytes: Vec<u8>,
        bit_pos: usize,
    }

    impl BitWriter {
        fn new() -> Self {
            Self { bytes: Vec::new(), bit_pos: 0 }
        }

        fn push_bit(&mut self, bit: u32) {
            if self.bit_pos % 8 == 0 {
                self.bytes.push(0);
            }
            let byte_idx = self.bit_pos / 8;
            let shift = 7 - (self.bit_pos % 8);
            self.bytes[byte_idx] |= ((bit & 1) as u8) << shift;
            self.bit_pos += 1;
        }

        fn push_bits(&mut self, value: u32, n: u32) {
            for i in (0..n).rev() {
                self.push_bit((value >> i) & 1);
            }
        }

        fn push_ue(&mut self, value: u32) {
            let value_plus1 = value + 1;
            let bits = 32 - value_plus1.leading_zeros();
            for _ in 0..bits - 1 {
                self.push_bit(0);
            }
            self.push_bits(value_plus1, bits);
        }

        fn finish(mut self) -> Vec<u8> {
            while self.bit_pos % 8 != 0 {
                self.push_bit(0);
            }
            self.bytes
        }
    }

    fn build_sps_nal(width: u32, height: u32, bit_depth_minus8: u32) -> Vec<u8> {
        let mut w = BitWriter::new();
        w.push_bits(0, 4); // vps id
        w.push_bits(0, 3); // max_sub_layers_minus1
        w.push_bit(0); // temporal_id_nesting_flag
        w.push_bits(0, 32); // profile_tier_level chunk 1
        w.push_bits(0, 32); // profile_tier_level chunk 2
        w.push_bits(0, 32); // profile_tier_level chunk 3
        w.push_ue(0); // seq_parameter_set_id
        w.push_ue(1); // chroma_format_idc (4:2:0, no extra bit)
        w.push_ue(width);
        w.push_ue(height);
        w.push_bit(0); // conformance_window_flag
        w.push_ue(bit_depth_minus8); // bit_depth_luma_minus8
        w.push_ue(0); // bit_depth_chroma_minus8 (unread by parser)
        let payload = w.finish();

        let mut nal = vec![0u8, 0u8, 1u8]; // start code
        nal.push((33u8) << 1); // nal_unit_type = 33 (SPS) in bits [1..6]
        nal.push(0x01); // layer/temporal id byte
        nal.extend_from_slice(&payload);
        nal
    }

    fn build_nal(nal_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut nal = vec![0u8, 0u8, 1u8];
        nal.push(nal_type << 1);
        nal.push(0x01);
        nal.extend_from_slice(payload);
        nal
    }

    #[test]
    fn parses_width_height_and_bit_depth() {
        let sps = build_sps_nal(1920, 1080, 0);
        // sps[3..] is the NAL starting after the start code.
        let (width, height, bpc) = parse_sps_dimensions(&sps[3..]).expect("parses");
        assert_eq!((width, height, bpc), (1920, 1080, 8));
    }

    #[test]
    fn extracts_all_three_parameter_sets_framed_keyframe() {
        let mut stream = Vec::new();
        stream.extend(build_nal(32, &[0xaa, 0xbb])); // VPS
        stream.extend(build_sps_nal(640, 480, 0)); // SPS
        stream.extend(build_nal(34, &[0xcc])); // PPS
        // AVCC slice follows, irrelevant to extraction.
        stream.extend_from_slice(&[0, 0, 0, 2, 0x26, 0x01]);

        let sets = extract_parameter_sets(&stream).expect("all three present");
        assert_eq!(sets.width, 640);
        assert_eq!(sets.height, 480);
        assert_eq!(sets.bits_per_component, 8);
    }

    #[test]
    fn split_keyframe_separates_parameter_sets_from_avcc_slice() {
        let mut stream = Vec::new();
        stream.extend(build_nal(32, &[0xaa, 0xbb])); // VPS
        stream.extend(build_sps_nal(640, 480, 0)); // SPS
        stream.extend(build_nal(34, &[0xcc])); // PPS
        let avcc_slice = [0u8, 0, 0, 2, 0x26, 0x01];
        stream.extend_from_slice(&avcc_slice);

        let (sets, slice) = split_keyframe(&stream).expect("splits cleanly");
        assert_eq!(sets.width, 640);
        assert_eq!(sets.height, 480);
        assert_eq!(slice, avcc_slice);
    }

    #[test]
    fn missing_pps_fails_extraction() {
        let mut stream = Vec::new();
        stream.extend(build_nal(32, &[0xaa]));
        stream.extend(build_sps_nal(640, 480, 0));
        assert!(extract_parameter_sets(&stream).is_none());
    }

    #[test]
    fn strip_leading_sei_removes_prefix_sei_before_idr() {
        let mut slice = Vec::new();
        // AVCC-framed prefix SEI (type 39) then an IDR slice (type 19).
        let sei_payload = [39u8 << 1, 0x01, 0xde, 0xad];
        slice.extend_from_slice(&(sei_payload.len() as u32).to_be_bytes());
        slice.extend_from_slice(&sei_payload);
        let idr_payload = [19u8 << 1, 0x01, 0xbe, 0xef];
        slice.extend_from_slice(&(idr_payload.len() as u32).to_be_bytes());
        slice.extend_from_slice(&idr_payload);

        let stripped = strip_leading_sei(&slice);
        let expected_len = idr_payload.len() as u32;
        let mut expected = expected_len.to_be_bytes().to_vec();
        expected.extend_from_slice(&idr_payload);
        assert_eq!(stripped, expected);
    }
}
