//! Transport packet framing.

use super::{PACKET_SIZE, SYNC_BYTE};
use bytes::{BufMut, BytesMut};

/// Bytes available after the 4-byte packet header.
const PAYLOAD_CAPACITY: usize = PACKET_SIZE - 4;

/// Size of an encoded PCR field.
const PCR_LEN: usize = 6;

/// Adaptation-field content for the first packet of a payload unit.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PacketOptions {
    /// Program clock reference base (90 kHz).
    pub pcr: Option<u64>,
    /// Set the random-access indicator.
    pub random_access: bool,
}

/// Split one payload unit into packets appended to `buf`.
///
/// The first packet carries the payload-unit-start indicator and the
/// adaptation field described by `opts`. The final packet is padded with
/// adaptation-field stuffing. `counter` is advanced once per packet.
pub(crate) fn packetize(
    buf: &mut BytesMut,
    pid: u16,
    counter: &mut u8,
    payload: &[u8],
    opts: PacketOptions,
) {
    let mut offset = 0;
    let mut first = true;

    loop {
        let remaining = payload.len() - offset;
        let pcr = if first { opts.pcr } else { None };
        let random_access = first && opts.random_access;

        // Adaptation field body without stuffing: flags byte + optional PCR.
        let base = if pcr.is_some() || random_access {
            Some(1 + if pcr.is_some() { PCR_LEN } else { 0 })
        } else {
            None
        };
        let overhead = base.map(|len| len + 1).unwrap_or(0);
        let space = PAYLOAD_CAPACITY - overhead;
        let take = remaining.min(space);
        let gap = space - take;

        let adaptation_len = match base {
            Some(len) => Some(len + gap),
            None if gap == 0 => None,
            // The length byte itself fills one byte of the gap.
            None => Some(gap - 1),
        };

        buf.reserve(PACKET_SIZE);
        buf.put_u8(SYNC_BYTE);
        let pusi = if first { 0x40 } else { 0x00 };
        buf.put_u8(pusi | ((pid >> 8) as u8 & 0x1F));
        buf.put_u8((pid & 0xFF) as u8);
        let control = if adaptation_len.is_some() { 0x30 } else { 0x10 };
        buf.put_u8(control | (*counter & 0x0F));
        *counter = (*counter + 1) & 0x0F;

        if let Some(len) = adaptation_len {
            buf.put_u8(len as u8);
            if len > 0 {
                let mut flags = 0u8;
                if random_access {
                    flags |= 0x40;
                }
                if pcr.is_some() {
                    flags |= 0x10;
                }
                buf.put_u8(flags);

                let mut used = 1;
                if let Some(base) = pcr {
                    put_pcr(buf, base);
                    used += PCR_LEN;
                }
                buf.put_bytes(0xFF, len - used);
            }
        }

        buf.put_slice(&payload[offset..offset + take]);
        offset += take;
        first = false;

        if offset >= payload.len() {
            break;
        }
    }
}

/// Write a PCR with the given 33-bit base and a zero extension.
fn put_pcr(buf: &mut BytesMut, base: u64) {
    let base = base & 0x1_FFFF_FFFF;
    buf.put_u32((base >> 1) as u32);
    buf.put_u8((((base & 1) as u8) << 7) | 0x7E);
    buf.put_u8(0);
}
