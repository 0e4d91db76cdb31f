//! Packetized elementary stream framing.

use crate::{Error, Result};
use bytes::{BufMut, BytesMut};

pub(crate) const STREAM_ID_VIDEO: u8 = 0xE0;
pub(crate) const STREAM_ID_AUDIO: u8 = 0xC0;

/// Build one PES packet around `payload`.
///
/// `bounded` packets carry their real length and fail when it exceeds the
/// 16-bit field; unbounded packets (video only) write a zero length.
pub(crate) fn pes_packet(
    stream_id: u8,
    pts: u64,
    dts: Option<u64>,
    payload: &[u8],
    bounded: bool,
) -> Result<BytesMut> {
    let header_data_len: usize = if dts.is_some() { 10 } else { 5 };
    let packet_len = 3 + header_data_len + payload.len();

    let length_field = if bounded {
        u16::try_from(packet_len).map_err(|_| Error::PayloadTooLarge {
            len: payload.len(),
        })?
    } else {
        0
    };

    let mut buf = BytesMut::with_capacity(6 + packet_len);
    buf.put_slice(&[0x00, 0x00, 0x01, stream_id]);
    buf.put_u16(length_field);
    buf.put_u8(0x80); // marker bits, no scrambling
    buf.put_u8(if dts.is_some() { 0xC0 } else { 0x80 });
    buf.put_u8(header_data_len as u8);

    match dts {
        Some(dts) => {
            put_timestamp(&mut buf, 0x3, pts);
            put_timestamp(&mut buf, 0x1, dts);
        }
        None => put_timestamp(&mut buf, 0x2, pts),
    }

    buf.put_slice(payload);
    Ok(buf)
}

/// Encode a 33-bit timestamp with its 4-bit prefix and marker bits.
fn put_timestamp(buf: &mut BytesMut, prefix: u8, ts: u64) {
    buf.put_u8((prefix << 4) | ((((ts >> 30) & 0x07) as u8) << 1) | 1);
    buf.put_u16(((((ts >> 15) & 0x7FFF) as u16) << 1) | 1);
    buf.put_u16((((ts & 0x7FFF) as u16) << 1) | 1);
}

/// Decode a timestamp written by [`put_timestamp`].
#[cfg(test)]
fn read_timestamp(bytes: &[u8]) -> Option<u64> {
    if bytes.len() < 5 {
        return None;
    }
    let high = u64::from((bytes[0] >> 1) & 0x07);
    let mid = u64::from(u16::from_be_bytes([bytes[1], bytes[2]]) >> 1);
    let low = u64::from(u16::from_be_bytes([bytes[3], bytes[4]]) >> 1);
    Some((high << 30) | (mid << 15) | low)
}
