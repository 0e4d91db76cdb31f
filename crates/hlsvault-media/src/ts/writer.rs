//! Segment writer.

use super::packet::{packetize, PacketOptions};
use super::pes::{pes_packet, STREAM_ID_AUDIO, STREAM_ID_VIDEO};
use super::psi::{pat_section, pmt_section, psi_payload};
use super::{
    to_90khz, AudioFrame, ContinuityState, Tracks, VideoFrame, PACKET_SIZE, PID_AUDIO, PID_PAT,
    PID_PMT, PID_VIDEO,
};
use crate::{Error, Result};
use bytes::BytesMut;
use std::io::Write;

/// Writes one transport-stream segment.
///
/// The writer owns the output handle for the lifetime of the segment but not
/// the continuity counters: every call takes the session's
/// [`ContinuityState`] so counters carry over into the next segment.
#[derive(Debug)]
pub struct SegmentWriter<W: Write> {
    out: W,
    tracks: Tracks,
    buf: BytesMut,
    bytes_written: u64,
}

impl<W: Write> SegmentWriter<W> {
    /// Start a segment: one PAT packet, then one PMT packet for `tracks`.
    pub fn begin(out: W, tracks: Tracks, cc: &mut ContinuityState) -> Result<Self> {
        let mut writer = Self {
            out,
            tracks,
            buf: BytesMut::with_capacity(PACKET_SIZE * 8),
            bytes_written: 0,
        };

        packetize(
            &mut writer.buf,
            PID_PAT,
            &mut cc.pat,
            &psi_payload(&pat_section()),
            PacketOptions::default(),
        );
        packetize(
            &mut writer.buf,
            PID_PMT,
            &mut cc.pmt,
            &psi_payload(&pmt_section(&tracks)),
            PacketOptions::default(),
        );
        writer.flush_buf()?;

        Ok(writer)
    }

    /// Write one audio frame as a PES packet on the audio PID.
    ///
    /// In audio-only streams every audio frame is a random-access point and
    /// carries the PCR.
    pub fn write_audio(&mut self, frame: &AudioFrame, cc: &mut ContinuityState) -> Result<()> {
        if self.tracks.audio.is_none() {
            return Err(Error::TrackNotConfigured("audio"));
        }

        let pts = to_90khz(frame.timestamp);
        let pes = pes_packet(STREAM_ID_AUDIO, pts, None, &frame.payload, true)?;
        let carries_pcr = !self.tracks.has_video();
        let opts = PacketOptions {
            pcr: carries_pcr.then_some(pts),
            random_access: carries_pcr,
        };

        packetize(&mut self.buf, PID_AUDIO, &mut cc.audio, &pes, opts);
        self.flush_buf()
    }

    /// Write one video frame as a PES packet on the video PID.
    ///
    /// Keyframes are flagged random-access and carry the PCR.
    pub fn write_video(&mut self, frame: &VideoFrame, cc: &mut ContinuityState) -> Result<()> {
        if self.tracks.video.is_none() {
            return Err(Error::TrackNotConfigured("video"));
        }

        let dts = to_90khz(frame.timestamp);
        let pts = to_90khz(frame.timestamp.saturating_add(frame.composition_offset));
        let dts_field = (frame.composition_offset > 0).then_some(dts);
        let pes = pes_packet(STREAM_ID_VIDEO, pts, dts_field, &frame.payload, false)?;
        let opts = PacketOptions {
            pcr: frame.keyframe.then_some(dts),
            random_access: frame.keyframe,
        };

        packetize(&mut self.buf, PID_VIDEO, &mut cc.video, &pes, opts);
        self.flush_buf()
    }

    /// Tracks advertised in this segment's PMT.
    pub fn tracks(&self) -> &Tracks {
        &self.tracks
    }

    /// Bytes written to the output so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Finish the segment, flushing and returning the output handle.
    pub fn end(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }

    fn flush_buf(&mut self) -> Result<()> {
        self.out.write_all(&self.buf)?;
        self.bytes_written += self.buf.len() as u64;
        self.buf.clear();
        Ok(())
    }
}
