// Copyright 2024 The MirageKit Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The client-to-host stream-registration datagram: 4 bytes
//! `"MIRG"` + 2 bytes little-endian `streamId` + 16 bytes `deviceId`.
//! Sent once per stream on the data port after the TCP hello, so the host
//! can bind the UDP flow to the stream.

use byteorder::{ByteOrder, LittleEndian};

use crate::device_id::DeviceId;
use crate::wire::{StreamId, MAGIC};

pub const REGISTRATION_LEN: usize = 4 + 2 + 16;

pub fn encode_registration(stream_id: StreamId, device_id: DeviceId) -> [u8; REGISTRATION_LEN] {
    let mut buf = [0u8; REGISTRATION_LEN];
    LittleEndian::write_u32(&mut buf[0..4], MAGIC);
    LittleEndian::write_u16(&mut buf[4..6], stream_id);
    buf[6..22].copy_from_slice(&device_id.as_bytes());
    buf
}

pub fn decode_registration(buf: &[u8]) -> Option<(StreamId, [u8; 16])> {
    if buf.len() < REGISTRATION_LEN {
        return None;
    }
    if LittleEndian::read_u32(&buf[0..4]) != MAGIC {
        return None;
    }
    let stream_id = LittleEndian::read_u16(&buf[4..6]);
    let mut device_id = [0u8; 16];
    device_id.copy_from_slice(&buf[6..22]);
    Some((stream_id, device_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn round_trips() {
        let device_id = DeviceId(Uuid::new_v4());
        let bytes = encode_registration(7, device_id);
        let (stream_id, device_bytes) = decode_registration(&bytes).unwrap();
        assert_eq!(stream_id, 7);
        assert_eq!(device_bytes, device_id.as_bytes());
    }
}
