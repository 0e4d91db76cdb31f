//! Segment formatters.
//!
//! A formatter turns frames into the bytes of one segment file at a time. The
//! session decides when segments start and end; the formatter owns the file
//! handle and any state that must survive from one segment to the next.

use hlsvault_common::{Error, Format, Result};
use hlsvault_media::{AudioFrame, ContinuityState, SegmentWriter, Tracks, VideoFrame};
use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Writes frames into segment files.
pub trait SegmentFormatter: Send {
    /// Extension of the segment files this formatter writes.
    fn extension(&self) -> &'static str;

    /// Set the tracks advertised by segments begun from now on.
    fn set_tracks(&mut self, tracks: Tracks);

    /// Open `path` and write the segment preamble.
    ///
    /// An open segment is ended first.
    fn begin_segment(&mut self, path: &Path, append: bool) -> Result<()>;

    fn write_audio(&mut self, frame: &AudioFrame) -> Result<()>;

    fn write_video(&mut self, frame: &VideoFrame) -> Result<()>;

    /// Flush and close the open segment, if any.
    fn end_segment(&mut self) -> Result<()>;
}

/// Create the formatter for a recording format.
pub fn formatter_for(format: Format) -> Box<dyn SegmentFormatter> {
    match format {
        Format::Hls => Box::new(TsFormatter::new()),
    }
}

/// MPEG transport-stream formatter for HLS.
///
/// Continuity counters are kept across segments.
#[derive(Debug, Default)]
pub struct TsFormatter {
    tracks: Tracks,
    cc: ContinuityState,
    writer: Option<SegmentWriter<BufWriter<File>>>,
    path: Option<PathBuf>,
}

impl TsFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters the next packet on each PID will carry.
    pub fn continuity(&self) -> ContinuityState {
        self.cc
    }

    /// Path of the open segment.
    pub fn current_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn no_segment() -> Error {
    Error::internal("no segment is open")
}

impl SegmentFormatter for TsFormatter {
    fn extension(&self) -> &'static str {
        Format::Hls.segment_extension()
    }

    fn set_tracks(&mut self, tracks: Tracks) {
        self.tracks = tracks;
    }

    fn begin_segment(&mut self, path: &Path, append: bool) -> Result<()> {
        self.end_segment()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.create(true);
        if append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        let file = options.open(path)?;

        let writer = SegmentWriter::begin(BufWriter::new(file), self.tracks, &mut self.cc)?;
        self.writer = Some(writer);
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    fn write_audio(&mut self, frame: &AudioFrame) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(no_segment)?;
        writer.write_audio(frame, &mut self.cc)?;
        Ok(())
    }

    fn write_video(&mut self, frame: &VideoFrame) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(no_segment)?;
        writer.write_video(frame, &mut self.cc)?;
        Ok(())
    }

    fn end_segment(&mut self) -> Result<()> {
        self.path = None;
        if let Some(writer) = self.writer.take() {
            let out = writer.end()?;
            out.into_inner().map_err(|e| e.into_error())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hlsvault_common::{AudioCodec, VideoCodec};
    use hlsvault_media::ts::{inspect, PID_AUDIO, PID_VIDEO};
    use tempfile::TempDir;

    #[test]
    fn test_write_without_segment_fails() {
        let mut formatter = TsFormatter::new();
        let err = formatter
            .write_audio(&AudioFrame::new(0, vec![0u8; 4]))
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_segments_share_counters() {
        let dir = TempDir::new().unwrap();
        let mut formatter = TsFormatter::new();
        formatter.set_tracks(Tracks::video(VideoCodec::H264, Some(AudioCodec::Aac)));

        let first = dir.path().join("2024-01/05/100.ts");
        let second = dir.path().join("2024-01/05/105.ts");

        formatter.begin_segment(&first, false).unwrap();
        formatter
            .write_video(&VideoFrame::new(0, true, vec![0u8; 1000]))
            .unwrap();
        formatter
            .write_audio(&AudioFrame::new(0, vec![0u8; 100]))
            .unwrap();
        let after_first = formatter.continuity();

        formatter.begin_segment(&second, false).unwrap();
        assert_eq!(formatter.current_path(), Some(second.as_path()));
        formatter
            .write_video(&VideoFrame::new(5000, true, vec![0u8; 100]))
            .unwrap();
        formatter.end_segment().unwrap();

        let data = fs::read(&second).unwrap();
        let packets = inspect::packets(&data).unwrap();
        let video = packets.iter().find(|p| p.pid == PID_VIDEO).unwrap();
        assert_eq!(video.continuity_counter, after_first.video);
        assert_eq!(packets[0].continuity_counter, 1);
        assert!(packets.iter().all(|p| p.pid != PID_AUDIO));
    }

    #[test]
    fn test_append_keeps_existing_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fixed.ts");
        let mut formatter = TsFormatter::new();
        formatter.set_tracks(Tracks::audio_only(AudioCodec::Aac));

        formatter.begin_segment(&path, false).unwrap();
        formatter.end_segment().unwrap();
        let first_len = fs::metadata(&path).unwrap().len();

        formatter.begin_segment(&path, true).unwrap();
        formatter.end_segment().unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), first_len * 2);

        formatter.begin_segment(&path, false).unwrap();
        formatter.end_segment().unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), first_len);
    }
}
