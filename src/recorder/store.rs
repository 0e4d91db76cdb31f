//! Day playlists.
//!
//! Each stream keeps one playlist per calendar day at
//! `<stream dir>/<yyyymmdd>.m3u8`. Entries are appended as segments are
//! finalized and flushed immediately, so readers composing a VOD playlist
//! never see half an entry.

use chrono::NaiveDate;
use hlsvault_common::paths::day_playlist_name;
use hlsvault_common::Result;
use hlsvault_media::hls;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Opens day playlists for one stream.
#[derive(Debug, Clone)]
pub struct PlaylistStore {
    stream_dir: PathBuf,
    target_duration: u64,
}

impl PlaylistStore {
    /// `target_duration` is written into the header of new playlists.
    pub fn new(stream_dir: impl Into<PathBuf>, target_duration: u64) -> Self {
        Self {
            stream_dir: stream_dir.into(),
            target_duration,
        }
    }

    pub fn stream_dir(&self) -> &Path {
        &self.stream_dir
    }

    /// Path of the playlist for `day`.
    pub fn playlist_path(&self, day: NaiveDate) -> PathBuf {
        self.stream_dir.join(day_playlist_name(day))
    }

    /// Open the playlist for `day` for appending, creating it if needed.
    ///
    /// A new or empty file receives the standard header. An existing file is
    /// appended to as is.
    pub fn open(&self, day: NaiveDate) -> Result<DayPlaylist> {
        fs::create_dir_all(&self.stream_dir)?;

        let path = self.playlist_path(day);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;

        let is_new = file.metadata()?.len() == 0;
        if is_new {
            file.write_all(hls::header(self.target_duration).as_bytes())?;
            file.flush()?;
            tracing::info!(path = %path.display(), "Created day playlist");
        } else {
            tracing::debug!(path = %path.display(), "Reopened day playlist");
        }

        Ok(DayPlaylist {
            day,
            path,
            file,
            appended: 0,
        })
    }
}

/// An open day playlist.
#[derive(Debug)]
pub struct DayPlaylist {
    day: NaiveDate,
    path: PathBuf,
    file: File,
    appended: usize,
}

impl DayPlaylist {
    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries appended through this handle.
    pub fn appended(&self) -> usize {
        self.appended
    }

    /// Append one finalized segment record and flush it.
    pub fn append_segment(&mut self, file_name: &str, duration: f64) -> Result<()> {
        let entry = hls::entry(duration, file_name);
        self.file.write_all(entry.as_bytes())?;
        self.file.flush()?;
        self.appended += 1;

        tracing::debug!(
            path = %self.path.display(),
            file = %file_name,
            duration = duration,
            "Appended segment record"
        );
        Ok(())
    }
}
