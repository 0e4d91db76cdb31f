//! Playlist parser.
//!
//! Recovers segment timing from playlists on disk. Day playlists are appended
//! to while they are read, so the parser is lenient: an unterminated final
//! line is ignored and malformed entries are skipped rather than failing the
//! whole file.

use super::playlist::{Playlist, Segment};
use crate::Result;
use std::fs;
use std::path::Path;

const EXTINF: &str = "#EXTINF:";
const TARGET_DURATION: &str = "#EXT-X-TARGETDURATION:";

/// A parsed playlist and how many entries were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPlaylist {
    pub playlist: Playlist,
    /// Malformed `#EXTINF` entries that were skipped.
    pub skipped: usize,
}

/// Read and parse a playlist file.
pub fn parse_file(path: impl AsRef<Path>) -> Result<ParsedPlaylist> {
    let path = path.as_ref();
    let data = fs::read(path)?;
    let text = String::from_utf8_lossy(&data);

    let mut parsed = parse_str(&text);
    parsed.playlist.path = Some(path.to_path_buf());
    Ok(parsed)
}

/// Parse playlist text.
pub fn parse_str(text: &str) -> ParsedPlaylist {
    let lines = complete_lines(text);
    let mut parsed = ParsedPlaylist::default();
    let mut in_header = true;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        i += 1;

        if let Some(rest) = line.strip_prefix(EXTINF) {
            in_header = false;

            // Next non-empty line names the segment.
            while i < lines.len() && lines[i].trim().is_empty() {
                i += 1;
            }
            let Some(file_line) = lines.get(i).map(|l| l.trim()) else {
                parsed.skipped += 1;
                break;
            };
            if file_line.starts_with('#') {
                // Re-examine the tag on the next iteration.
                parsed.skipped += 1;
                continue;
            }
            i += 1;

            match parse_duration(rest) {
                Some(duration) => {
                    let file_name = file_line.replace('\\', "/");
                    parsed.playlist.segments.push(Segment::new(file_name, duration));
                }
                None => parsed.skipped += 1,
            }
        } else if in_header {
            if let Some(value) = line.strip_prefix(TARGET_DURATION) {
                parsed.playlist.target_duration = value.trim().parse().ok();
            }
            parsed.playlist.header.push_str(line);
            parsed.playlist.header.push('\n');
        }
    }

    parsed
}

/// Lines terminated by a newline, with any `\r` stripped.
fn complete_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.split('\n').collect();
    // The piece after the last newline is either empty or still being written.
    lines.pop();
    lines
        .into_iter()
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect()
}

fn parse_duration(rest: &str) -> Option<f64> {
    let value = rest.split(',').next()?.trim();
    let duration: f64 = value.parse().ok()?;
    (duration.is_finite() && duration >= 0.0).then_some(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hls::header;
    use tempfile::TempDir;

    #[test]
    fn test_parse_round_trip() {
        let text = format!("{}#EXTINF:5,\n100.ts\n#EXTINF:8,\n105.ts\n", header(10));
        let parsed = parse_str(&text);

        assert_eq!(parsed.skipped, 0);
        let playlist = parsed.playlist;
        assert_eq!(playlist.segments.len(), 2);
        assert_eq!(playlist.segments[0].start_time, Some(100));
        assert_eq!(playlist.segments[1].duration, 8.0);
        assert_eq!(playlist.start_time(), 100);
        assert_eq!(playlist.end_time(), 113);
        assert_eq!(playlist.target_duration, Some(10));
        assert_eq!(playlist.header, header(10));
    }

    #[test]
    fn test_incomplete_trailing_line_is_ignored() {
        let text = "#EXTM3U\n#EXTINF:5,\n100.ts\n#EXTINF:4,\n10";
        let parsed = parse_str(text);
        assert_eq!(parsed.playlist.segments.len(), 1);
        assert_eq!(parsed.skipped, 1);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let text = "#EXTM3U\n\
                    #EXTINF:abc,\n\
                    100.ts\n\
                    #EXTINF:3,\n\
                    #EXTINF:4,\n\
                    104.ts\n";
        let parsed = parse_str(text);

        assert_eq!(parsed.skipped, 2);
        assert_eq!(parsed.playlist.segments.len(), 1);
        assert_eq!(parsed.playlist.segments[0].file_name, "104.ts");
        assert_eq!(parsed.playlist.segments[0].duration, 4.0);
    }

    #[test]
    fn test_backslashes_and_crlf() {
        let text = "#EXTM3U\r\n#EXTINF:2.5,\r\n2024-01\\05\\1704412800.ts\r\n";
        let parsed = parse_str(text);
        let segment = &parsed.playlist.segments[0];
        assert_eq!(segment.file_name, "2024-01/05/1704412800.ts");
        assert_eq!(segment.start_time, Some(1_704_412_800));
        assert_eq!(segment.duration, 2.5);
    }

    #[test]
    fn test_non_numeric_name_keeps_segment() {
        let parsed = parse_str("#EXTINF:6,\nlive.ts\n");
        assert_eq!(parsed.playlist.segments.len(), 1);
        assert_eq!(parsed.playlist.segments[0].start_time, None);
        assert_eq!(parsed.playlist.start_time(), 0);
        assert_eq!(parsed.playlist.end_time(), 6);
    }

    #[test]
    fn test_parse_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("19700101.m3u8");
        fs::write(&path, "#EXTM3U\n#EXTINF:5,\n100.ts\n").unwrap();

        let parsed = parse_file(&path).unwrap();
        assert_eq!(parsed.playlist.path.as_deref(), Some(path.as_path()));
        assert_eq!(parsed.playlist.segments.len(), 1);
    }

    #[test]
    fn test_parse_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = parse_file(dir.path().join("missing.m3u8")).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
