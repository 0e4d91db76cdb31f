//! VOD composition.
//!
//! Builds an on-demand playlist for a time window from the day playlists of
//! one stream. Source playlists are only read; the composed playlist is
//! written once to `<base>/<stream>/vod/<start>-<end>.m3u8` and references
//! the original segments through `../`.

use hlsvault_common::paths::{
    is_safe_stream_path, parse_day_playlist_name, to_slash, vod_file_name, VOD_DIR,
    VOD_JOIN_PATH,
};
use hlsvault_common::{DayZone, Error, Result};
use hlsvault_media::hls::{parse_file, Playlist, Segment};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A composed VOD playlist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VodPlaylist {
    /// Start of the first selected segment.
    pub start_time: i64,
    /// End of the last selected segment, rounded to whole seconds.
    pub end_time: i64,
    #[serde(skip)]
    pub segments: Vec<Segment>,
    pub join_path: String,
    /// Where the playlist was written.
    pub path: PathBuf,
}

impl VodPlaylist {
    /// Path of the playlist relative to `base`, with forward slashes.
    pub fn relative_path(&self, base: &Path) -> String {
        to_slash(self.path.strip_prefix(base).unwrap_or(&self.path))
    }
}

/// Composes VOD playlists below a recording base path.
#[derive(Debug, Clone)]
pub struct VodComposer {
    base_path: PathBuf,
    zone: DayZone,
}

impl VodComposer {
    pub fn new(base_path: impl Into<PathBuf>, zone: DayZone) -> Self {
        Self {
            base_path: base_path.into(),
            zone,
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Compose and write the playlist covering `[start, end)` of `stream_path`.
    pub fn compose(&self, stream_path: &str, start: i64, end: i64) -> Result<VodPlaylist> {
        if end <= start {
            return Err(Error::validation(format!(
                "end time {end} must be after start time {start}"
            )));
        }
        if !is_safe_stream_path(stream_path) {
            return Err(Error::validation(format!(
                "invalid stream path: {:?}",
                stream_path
            )));
        }

        let stream_dir = self.base_path.join(stream_path);
        let window = format!("{stream_path} [{start}, {end})");

        let mut segments = Vec::new();
        for path in self.candidates(&stream_dir, start, end, stream_path)? {
            match parse_file(&path) {
                Ok(parsed) => {
                    if parsed.skipped > 0 {
                        tracing::debug!(
                            path = %path.display(),
                            skipped = parsed.skipped,
                            "Skipped malformed playlist entries"
                        );
                    }
                    segments.extend(select_segments(parsed.playlist, start, end));
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to parse day playlist"
                    );
                }
            }
        }

        if segments.is_empty() {
            return Err(Error::not_found("segments", window));
        }
        segments.sort_by_key(Segment::start);

        let playlist = Playlist::from_segments(segments);
        let start_time = playlist.start_time();
        let end_time = match playlist.segments.last() {
            Some(last) => last.start() + last.duration.round() as i64,
            None => start_time,
        };

        let vod_dir = stream_dir.join(VOD_DIR);
        fs::create_dir_all(&vod_dir)?;
        let path = vod_dir.join(vod_file_name(start_time, end_time));
        fs::write(&path, playlist.render(VOD_JOIN_PATH, true))?;

        tracing::info!(
            stream_path = %stream_path,
            path = %path.display(),
            segments = playlist.segments.len(),
            start_time = start_time,
            end_time = end_time,
            "Composed VOD playlist"
        );

        Ok(VodPlaylist {
            start_time,
            end_time,
            segments: playlist.segments,
            join_path: VOD_JOIN_PATH.to_string(),
            path,
        })
    }

    /// Day playlists whose day window intersects `[start, end)`, oldest first.
    fn candidates(
        &self,
        stream_dir: &Path,
        start: i64,
        end: i64,
        stream_path: &str,
    ) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(stream_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::not_found("stream", stream_path));
            }
            Err(e) => return Err(e.into()),
        };

        let mut days = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(day) = name.to_str().and_then(parse_day_playlist_name) else {
                continue;
            };
            let Some((day_start, day_end)) = self.zone.day_window(day) else {
                continue;
            };
            if start < day_end && end > day_start && entry.path().is_file() {
                days.push((day, entry.path()));
            }
        }

        days.sort();
        Ok(days.into_iter().map(|(_, path)| path).collect())
    }
}

/// Segments of `playlist` starting within `[start, end)`.
pub fn select_segments(playlist: Playlist, start: i64, end: i64) -> Vec<Segment> {
    playlist
        .segments
        .into_iter()
        .filter(|s| s.start_time.is_some_and(|t| t >= start && t < end))
        .collect()
}
