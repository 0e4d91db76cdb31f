//! Program-specific information tables.

use super::{Tracks, PACKET_SIZE, PID_AUDIO, PID_NULL, PID_PMT, PID_VIDEO, PROGRAM_NUMBER};
use bytes::{BufMut, BytesMut};
use crc::{Crc, CRC_32_MPEG_2};

pub(crate) const PSI_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

const TABLE_ID_PAT: u8 = 0x00;
const TABLE_ID_PMT: u8 = 0x02;
const TRANSPORT_STREAM_ID: u16 = 0x0001;

/// Program association section for the single program.
pub(crate) fn pat_section() -> BytesMut {
    let mut buf = BytesMut::with_capacity(16);
    buf.put_u8(TABLE_ID_PAT);
    // section_syntax_indicator, reserved bits, section_length
    buf.put_u16(0xB000 | 13);
    buf.put_u16(TRANSPORT_STREAM_ID);
    buf.put_u8(0xC1); // version 0, current_next_indicator
    buf.put_u8(0); // section_number
    buf.put_u8(0); // last_section_number
    buf.put_u16(PROGRAM_NUMBER);
    buf.put_u16(0xE000 | PID_PMT);
    finish_section(&mut buf);
    buf
}

/// Program map section advertising the tracks that are present.
pub(crate) fn pmt_section(tracks: &Tracks) -> BytesMut {
    let mut streams: Vec<(u8, u16)> = Vec::with_capacity(2);
    if let Some(video) = tracks.video {
        streams.push((video.stream_type(), PID_VIDEO));
    }
    if let Some(audio) = tracks.audio {
        streams.push((audio.stream_type(), PID_AUDIO));
    }

    let section_length = 13 + 5 * streams.len() as u16;
    let mut buf = BytesMut::with_capacity(3 + section_length as usize);
    buf.put_u8(TABLE_ID_PMT);
    buf.put_u16(0xB000 | section_length);
    buf.put_u16(PROGRAM_NUMBER);
    buf.put_u8(0xC1);
    buf.put_u8(0);
    buf.put_u8(0);
    buf.put_u16(0xE000 | pcr_pid(tracks));
    buf.put_u16(0xF000); // program_info_length = 0

    for (stream_type, pid) in streams {
        buf.put_u8(stream_type);
        buf.put_u16(0xE000 | pid);
        buf.put_u16(0xF000); // ES_info_length = 0
    }

    finish_section(&mut buf);
    buf
}

/// PID whose packets carry the program clock reference.
pub(crate) fn pcr_pid(tracks: &Tracks) -> u16 {
    if tracks.video.is_some() {
        PID_VIDEO
    } else if tracks.audio.is_some() {
        PID_AUDIO
    } else {
        PID_NULL
    }
}

/// Wrap a section as a full packet payload: pointer field, section, 0xFF fill.
pub(crate) fn psi_payload(section: &[u8]) -> BytesMut {
    let capacity = PACKET_SIZE - 4;
    let mut buf = BytesMut::with_capacity(capacity);
    buf.put_u8(0); // pointer_field
    buf.put_slice(section);
    let fill = capacity.saturating_sub(buf.len());
    buf.put_bytes(0xFF, fill);
    buf
}

fn finish_section(buf: &mut BytesMut) {
    let crc = PSI_CRC.checksum(&buf[..]);
    buf.put_u32(crc);
}
