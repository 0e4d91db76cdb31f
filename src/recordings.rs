//! Listing of recorded playlists.

use hlsvault_common::paths::to_slash;
use hlsvault_common::{Format, Result};
use hlsvault_media::hls::parse_file;
use serde::Serialize;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// One playlist under the recording base path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingEntry {
    /// Path relative to the base path, forward slashes.
    pub path: String,
    /// File size in bytes.
    pub size: u64,
    /// Total duration in seconds, from the parsed playlist.
    pub duration: f64,
}

/// List every playlist of `format` below `base`, sorted by path.
///
/// A missing base directory lists nothing. Playlists that cannot be read are
/// listed with zero duration.
pub fn tree(base: &Path, format: Option<Format>) -> Result<Vec<RecordingEntry>> {
    if !base.exists() {
        return Ok(Vec::new());
    }

    let extension = format.unwrap_or_default().playlist_extension();
    let mut entries = Vec::new();

    for entry in WalkDir::new(base).min_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if !matches {
            continue;
        }

        let size = fs::metadata(path)?.len();
        let duration = match parse_file(path) {
            Ok(parsed) => parsed.playlist.total_duration(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to parse playlist");
                0.0
            }
        };

        entries.push(RecordingEntry {
            path: to_slash(path.strip_prefix(base).unwrap_or(path)),
            size,
            duration,
        });
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}
