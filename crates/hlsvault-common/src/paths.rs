//! On-disk layout of a recorded stream.
//!
//! Everything for one stream lives under `<base>/<stream path>`:
//!
//! - `<yyyymmdd>.m3u8`: the day playlist
//! - `<yyyy-mm>/<dd>/<unix seconds>.ts`: segments, grouped by month and day
//! - `vod/<start>-<end>.m3u8`: composed VOD playlists

use chrono::NaiveDate;
use std::path::{Component, Path, PathBuf};

/// Subdirectory holding composed VOD playlists.
pub const VOD_DIR: &str = "vod";

/// Prefix that reaches the stream directory from inside [`VOD_DIR`].
pub const VOD_JOIN_PATH: &str = "../";

/// Extension of playlist files.
pub const PLAYLIST_EXTENSION: &str = "m3u8";

/// Extension of transport-stream segments.
pub const SEGMENT_EXTENSION: &str = "ts";

/// File name of the playlist for `date`.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use hlsvault_common::paths::day_playlist_name;
///
/// let date = NaiveDate::from_ymd_opt(2023, 11, 5).unwrap();
/// assert_eq!(day_playlist_name(date), "20231105.m3u8");
/// ```
pub fn day_playlist_name(date: NaiveDate) -> String {
    format!("{}.{}", date.format("%Y%m%d"), PLAYLIST_EXTENSION)
}

/// Recover the day from a playlist file name produced by [`day_playlist_name`].
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use hlsvault_common::paths::parse_day_playlist_name;
///
/// assert_eq!(
///     parse_day_playlist_name("20231105.m3u8"),
///     NaiveDate::from_ymd_opt(2023, 11, 5)
/// );
/// assert_eq!(parse_day_playlist_name("1699142400-1699146000.m3u8"), None);
/// ```
pub fn parse_day_playlist_name(file_name: &str) -> Option<NaiveDate> {
    let stem = file_name.strip_suffix(&format!(".{PLAYLIST_EXTENSION}"))?;
    if stem.len() != 8 || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(stem, "%Y%m%d").ok()
}

/// Directory of the segments recorded on `date`, relative to the stream directory.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use hlsvault_common::paths::segment_dir;
/// use std::path::PathBuf;
///
/// let date = NaiveDate::from_ymd_opt(2023, 11, 5).unwrap();
/// assert_eq!(segment_dir(date), PathBuf::from("2023-11").join("05"));
/// ```
pub fn segment_dir(date: NaiveDate) -> PathBuf {
    PathBuf::from(date.format("%Y-%m").to_string()).join(date.format("%d").to_string())
}

/// File name of a segment that started at `unix_secs`.
pub fn segment_file_name(unix_secs: i64) -> String {
    format!("{unix_secs}.{SEGMENT_EXTENSION}")
}

/// File name of a VOD playlist spanning `[start, end]`.
pub fn vod_file_name(start: i64, end: i64) -> String {
    format!("{start}-{end}.{PLAYLIST_EXTENSION}")
}

/// Render a relative path with forward slashes, as written into playlists.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Check that a stream path stays inside the output tree.
///
/// Stream paths such as `live/cam1` become directories below the base path,
/// so absolute paths and parent components are refused.
pub fn is_safe_stream_path(stream_path: &str) -> bool {
    if stream_path.trim().is_empty() {
        return false;
    }
    Path::new(stream_path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

/// Check if a path has a playlist file extension.
pub fn is_playlist_file(path: &Path) -> bool {
    has_extension(path, PLAYLIST_EXTENSION)
}

/// Check if a path has a transport-stream segment extension.
pub fn is_segment_file(path: &Path) -> bool {
    has_extension(path, SEGMENT_EXTENSION)
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}
