//! Read-side helpers for checking written segments.
//!
//! This is not a demuxer. It decodes packet headers and the PMT, enough to
//! verify continuity, clock placement and the advertised stream list.

use super::psi::PSI_CRC;
use super::{PACKET_SIZE, SYNC_BYTE};
use crate::{Error, Result};

/// Decoded transport packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub pid: u16,
    pub payload_unit_start: bool,
    pub continuity_counter: u8,
    pub has_adaptation: bool,
    pub random_access: bool,
    /// PCR base (90 kHz) when present.
    pub pcr: Option<u64>,
}

/// Decoded program map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramMap {
    pub pcr_pid: u16,
    /// `(stream_type, pid)` in table order.
    pub streams: Vec<(u8, u16)>,
}

/// Decode every packet header in `data`.
pub fn packets(data: &[u8]) -> Result<Vec<PacketHeader>> {
    if data.len() % PACKET_SIZE != 0 {
        return Err(Error::invalid_packet(format!(
            "length {} is not a multiple of {PACKET_SIZE}",
            data.len()
        )));
    }

    data.chunks(PACKET_SIZE)
        .enumerate()
        .map(|(index, packet)| parse_header(packet).map_err(|e| annotate(e, index)))
        .collect()
}

fn annotate(err: Error, index: usize) -> Error {
    match err {
        Error::InvalidPacket(msg) => Error::invalid_packet(format!("packet {index}: {msg}")),
        other => other,
    }
}

fn parse_header(packet: &[u8]) -> Result<PacketHeader> {
    if packet[0] != SYNC_BYTE {
        return Err(Error::invalid_packet(format!(
            "bad sync byte {:#04x}",
            packet[0]
        )));
    }

    let pid = (u16::from(packet[1] & 0x1F) << 8) | u16::from(packet[2]);
    let has_adaptation = packet[3] & 0x20 != 0;
    let mut header = PacketHeader {
        pid,
        payload_unit_start: packet[1] & 0x40 != 0,
        continuity_counter: packet[3] & 0x0F,
        has_adaptation,
        random_access: false,
        pcr: None,
    };

    if has_adaptation && packet[4] > 0 {
        let flags = packet[5];
        header.random_access = flags & 0x40 != 0;
        if flags & 0x10 != 0 {
            let b = &packet[6..12];
            let base = (u64::from(b[0]) << 25)
                | (u64::from(b[1]) << 17)
                | (u64::from(b[2]) << 9)
                | (u64::from(b[3]) << 1)
                | u64::from(b[4] >> 7);
            header.pcr = Some(base);
        }
    }

    Ok(header)
}

/// Decode the PMT carried in a single packet.
pub fn read_pmt(packet: &[u8]) -> Result<ProgramMap> {
    if packet.len() != PACKET_SIZE {
        return Err(Error::invalid_packet("PMT must be one packet"));
    }
    let header = parse_header(packet)?;
    if !header.payload_unit_start {
        return Err(Error::invalid_packet("PMT packet does not start a section"));
    }

    let mut pos = 4;
    if header.has_adaptation {
        pos += 1 + packet[4] as usize;
    }
    pos += 1 + packet[pos] as usize; // pointer_field

    let section = &packet[pos..];
    if section.len() < 3 || section[0] != 0x02 {
        return Err(Error::invalid_packet("not a PMT section"));
    }
    let section_length = (usize::from(section[1] & 0x0F) << 8) | usize::from(section[2]);
    let end = 3 + section_length;
    if end > section.len() || section_length < 13 {
        return Err(Error::invalid_packet("PMT section length out of range"));
    }
    let section = &section[..end];
    if PSI_CRC.checksum(section) != 0 {
        return Err(Error::invalid_packet("PMT CRC mismatch"));
    }

    let pcr_pid = (u16::from(section[8] & 0x1F) << 8) | u16::from(section[9]);
    let program_info_length = (usize::from(section[10] & 0x0F) << 8) | usize::from(section[11]);

    let mut streams = Vec::new();
    let mut i = 12 + program_info_length;
    let streams_end = end - 4;
    while i + 5 <= streams_end {
        let stream_type = section[i];
        let pid = (u16::from(section[i + 1] & 0x1F) << 8) | u16::from(section[i + 2]);
        let es_info_length = (usize::from(section[i + 3] & 0x0F) << 8) | usize::from(section[i + 4]);
        streams.push((stream_type, pid));
        i += 5 + es_info_length;
    }

    Ok(ProgramMap { pcr_pid, streams })
}
