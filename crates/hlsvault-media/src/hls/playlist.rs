//! HLS playlist structures.

use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Closing tag of an ended (VOD) playlist.
pub const END_LIST: &str = "#EXT-X-ENDLIST";

/// One media segment listed in a playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Segment path as written in the playlist (forward slashes).
    pub file_name: String,
    /// Unix seconds derived from the file name, `None` if it is not numeric.
    pub start_time: Option<i64>,
    /// Duration in seconds.
    pub duration: f64,
}

impl Segment {
    /// Create a segment, deriving its start time from the file name.
    pub fn new(file_name: impl Into<String>, duration: f64) -> Self {
        let file_name = file_name.into();
        let start_time = start_time_from_file_name(&file_name);
        Self {
            file_name,
            start_time,
            duration,
        }
    }

    /// Start time, with an unset start treated as zero.
    pub fn start(&self) -> i64 {
        self.start_time.unwrap_or(0)
    }
}

/// An ordered list of segments plus the header text that preceded them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Playlist {
    /// Header lines before the first `#EXTINF`, newline-terminated.
    pub header: String,
    /// Segments in chronological order.
    pub segments: Vec<Segment>,
    /// `#EXT-X-TARGETDURATION` value, when known.
    pub target_duration: Option<u64>,
    /// Where the playlist lives on disk.
    pub path: Option<PathBuf>,
}

impl Playlist {
    /// Build a playlist from segments with a standard header.
    ///
    /// The target duration is the ceiling of the longest segment.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        let target = segments
            .iter()
            .map(|s| s.duration)
            .fold(0.0_f64, f64::max)
            .ceil() as u64;

        Self {
            header: header(target),
            segments,
            target_duration: Some(target),
            path: None,
        }
    }

    /// Set the on-disk location.
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Start of the first segment, 0 when empty or unset.
    pub fn start_time(&self) -> i64 {
        self.segments.first().map(Segment::start).unwrap_or(0)
    }

    /// Sum of all segment durations.
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Start plus the total duration, rounded to whole seconds.
    pub fn end_time(&self) -> i64 {
        self.start_time() + self.total_duration().round() as i64
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Render to M3U8 text.
    ///
    /// `join_path` is prefixed to each segment file name. An `ended` playlist is
    /// closed with [`END_LIST`].
    pub fn render(&self, join_path: &str, ended: bool) -> String {
        let mut out = self.header.clone();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }

        for segment in &self.segments {
            let file = format!("{}{}", join_path, segment.file_name);
            out.push_str(&entry(segment.duration, &file));
        }

        if ended {
            writeln!(out, "{}", END_LIST).unwrap();
        }

        out
    }
}

/// Standard playlist header for the given target duration.
pub fn header(target_duration: u64) -> String {
    let mut out = String::new();

    writeln!(out, "#EXTM3U").unwrap();
    writeln!(out, "#EXT-X-VERSION:3").unwrap();
    writeln!(out, "#EXT-X-MEDIA-SEQUENCE:0").unwrap();
    writeln!(out, "#EXT-X-TARGETDURATION:{}", target_duration).unwrap();

    out
}

/// One `#EXTINF` entry with its file line.
pub fn entry(duration: f64, file_name: &str) -> String {
    let mut out = String::new();

    writeln!(out, "#EXTINF:{},", format_duration(duration)).unwrap();
    writeln!(out, "{}", file_name).unwrap();

    out
}

/// Format a duration with millisecond precision and no trailing zeros.
pub fn format_duration(duration: f64) -> String {
    let text = format!("{:.3}", duration);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Parse the unix start time encoded in a segment file name.
///
/// `2024-01/05/1704412800.ts` yields `Some(1704412800)`.
pub fn start_time_from_file_name(file_name: &str) -> Option<i64> {
    let base = file_name.rsplit(['/', '\\']).next()?;
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => base,
    };
    stem.trim().parse().ok()
}
