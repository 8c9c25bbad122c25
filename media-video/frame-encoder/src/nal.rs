//! Annex-B byte stream helpers

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::{iter::from_fn, mem::take};

pub const ANNEXB_START_CODE: [u8; 4] = [0, 0, 0, 1];

const NAL_UNIT_HEADER_TYPE_MASK: u8 = 0b00011111;

pub const NAL_UNIT_IDR: u8 = 5;
pub const NAL_UNIT_SPS: u8 = 7;
pub const NAL_UNIT_PPS: u8 = 8;

/// Type of a NAL unit without start code, 0 for an empty unit
pub fn nal_unit_type(nal_unit: &[u8]) -> u8 {
    nal_unit
        .first()
        .map(|header| header & NAL_UNIT_HEADER_TYPE_MASK)
        .unwrap_or(0)
}

/// Locate the next 3 or 4 byte start code, returns `(offset, length)`
///
/// Engines emit whole access units, so a stream without any start code is treated as a single
/// NAL unit.
fn find_start_code(stream: &[u8]) -> Option<(usize, usize)> {
    let mut zeros = 0;

    for (index, &byte) in stream.iter().enumerate() {
        match byte {
            0 => zeros += 1,
            1 if zeros >= 2 => return Some((index - zeros, zeros + 1)),
            _ => zeros = 0,
        }
    }

    None
}

/// Split an Annex-B byte stream into NAL units, start codes are removed
pub fn nal_units(mut stream: Bytes) -> impl Iterator<Item = Bytes> {
    from_fn(move || {
        while !stream.is_empty() {
            let Some((offset, length)) = find_start_code(&stream) else {
                return Some(take(&mut stream));
            };

            let nal_unit = stream.split_to(offset);
            stream.advance(length);

            if !nal_unit.is_empty() {
                return Some(nal_unit);
            }
        }

        None
    })
}

/// Join NAL units into an Annex-B byte stream using 4 byte start codes
pub fn to_annexb<I>(nal_units: I) -> Bytes
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let mut out = BytesMut::new();

    for nal_unit in nal_units {
        out.put_slice(&ANNEXB_START_CODE);
        out.put_slice(nal_unit.as_ref());
    }

    out.freeze()
}

/// Extract the SPS and PPS NAL units of an Annex-B byte stream, in stream order
pub fn parameter_sets(bytes: Bytes) -> Bytes {
    to_annexb(
        nal_units(bytes)
            .filter(|nal_unit| matches!(nal_unit_type(nal_unit), NAL_UNIT_SPS | NAL_UNIT_PPS)),
    )
}
