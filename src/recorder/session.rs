//! Recording session: decides where segments are cut and records their timing.
//!
//! A session consumes the frames of one stream. The first media frame after the
//! track announcement opens the first segment. Each later cut ends the open
//! segment, records its duration in the day playlist and opens the next one,
//! so a segment's duration is only known once its successor starts.

use super::clock::Clock;
use super::formatter::SegmentFormatter;
use super::frame::{Frame, FrameSource, SourceClosed};
use super::registry::{SessionHandle, SessionState};
use super::store::{DayPlaylist, PlaylistStore};
use chrono::{DateTime, Utc};
use hlsvault_common::paths::{segment_dir, to_slash};
use hlsvault_common::{DayZone, Result};
use hlsvault_media::Tracks;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// How long the session waits for a frame before checking its stop flag.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What kind of media frame is being considered for a cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Audio,
    Video { keyframe: bool },
}

/// Decide whether a segment boundary goes before this frame.
///
/// With video, only keyframes can start a segment. Audio-only streams cut on
/// any audio frame. Nothing is ever cut when `fragment_ms` is zero.
///
/// Timestamps are 32-bit milliseconds and the elapsed time wraps with them, so
/// a source that wraps keeps cutting on schedule and one that resets its
/// timestamps cuts at its next eligible frame.
pub fn should_cut(
    fragment_ms: u64,
    has_video: bool,
    kind: FrameKind,
    timestamp: u32,
    skip_timestamp: u32,
) -> bool {
    if fragment_ms == 0 {
        return false;
    }

    let eligible = match kind {
        FrameKind::Audio => !has_video,
        FrameKind::Video { keyframe } => has_video && keyframe,
    };

    eligible && u64::from(timestamp.wrapping_sub(skip_timestamp)) >= fragment_ms
}

/// Per-session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// `<base>/<stream path>`.
    pub stream_dir: PathBuf,
    pub zone: DayZone,
    /// Fixed segment name, used only when fragmenting is off.
    pub file_name: Option<String>,
    /// Append to existing segment files instead of truncating them.
    pub append: bool,
}

/// The segment currently being written.
#[derive(Debug)]
struct PendingSegment {
    /// Path relative to the stream directory, as written in the playlist.
    file_name: String,
    opened_at: DateTime<Utc>,
}

/// One recording of one stream.
pub struct RecordingSession {
    handle: Arc<SessionHandle>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    store: PlaylistStore,
    formatter: Box<dyn SegmentFormatter>,
    tracks: Option<Tracks>,
    playlist: Option<DayPlaylist>,
    pending: Option<PendingSegment>,
    skip_timestamp: u32,
    last_segment_secs: Option<i64>,
}

impl RecordingSession {
    pub fn new(
        handle: Arc<SessionHandle>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
        formatter: Box<dyn SegmentFormatter>,
    ) -> Self {
        let target_duration = handle.fragment().as_secs_f64().ceil() as u64;
        let store = PlaylistStore::new(config.stream_dir.clone(), target_duration);

        Self {
            handle,
            clock,
            config,
            store,
            formatter,
            tracks: None,
            playlist: None,
            pending: None,
            skip_timestamp: 0,
            last_segment_secs: None,
        }
    }

    pub fn handle(&self) -> &Arc<SessionHandle> {
        &self.handle
    }

    /// Consume frames until the stream ends, `Frame::Stop` arrives or a stop
    /// is requested, then close the open segment.
    pub fn run(mut self, mut source: Box<dyn FrameSource>) -> Result<()> {
        tracing::info!(
            session_id = %self.handle.id(),
            stream_path = %self.handle.stream_path(),
            "Recording session started"
        );
        self.handle.set_state(SessionState::Starting);

        let result = self.consume(source.as_mut());
        let finished = self.finish();

        tracing::info!(session_id = %self.handle.id(), "Recording session stopped");
        result.and(finished)
    }

    fn consume(&mut self, source: &mut dyn FrameSource) -> Result<()> {
        loop {
            if self.handle.stop_requested() {
                tracing::debug!(session_id = %self.handle.id(), "Stop requested");
                return Ok(());
            }

            match source.next_frame(POLL_INTERVAL) {
                Ok(Some(frame)) => {
                    if !self.push(frame)? {
                        return Ok(());
                    }
                }
                Ok(None) => {}
                Err(SourceClosed) => {
                    tracing::debug!(session_id = %self.handle.id(), "Frame source closed");
                    return Ok(());
                }
            }
        }
    }

    /// Process one frame. Returns `false` once the stream has ended.
    pub fn push(&mut self, frame: Frame) -> Result<bool> {
        match frame {
            Frame::SessionStart(tracks) => {
                tracing::debug!(
                    session_id = %self.handle.id(),
                    video = ?tracks.video,
                    audio = ?tracks.audio,
                    "Tracks announced"
                );
                self.tracks = Some(tracks);
                self.handle.set_tracks(tracks);
                self.formatter.set_tracks(tracks);
            }
            Frame::Audio(frame) => {
                if self.prepare(FrameKind::Audio, frame.timestamp)? {
                    self.formatter.write_audio(&frame)?;
                }
            }
            Frame::Video(frame) => {
                let kind = FrameKind::Video {
                    keyframe: frame.keyframe,
                };
                if self.prepare(kind, frame.timestamp)? {
                    self.formatter.write_video(&frame)?;
                }
            }
            Frame::Stop => return Ok(false),
        }
        Ok(true)
    }

    /// Open or cut segments ahead of a media frame.
    ///
    /// Returns whether the frame should be written.
    fn prepare(&mut self, kind: FrameKind, timestamp: u32) -> Result<bool> {
        let Some(tracks) = self.tracks else {
            tracing::trace!(
                session_id = %self.handle.id(),
                "Dropping frame before track announcement"
            );
            return Ok(false);
        };

        let carried = match kind {
            FrameKind::Audio => tracks.audio.is_some(),
            FrameKind::Video { .. } => tracks.video.is_some(),
        };
        if !carried {
            return Ok(false);
        }

        if self.pending.is_none() {
            let now = self.clock.now();
            self.skip_timestamp = timestamp;
            self.open_segment(now)?;
            self.handle.mark_started(now);
            self.handle.set_state(SessionState::Recording);
            return Ok(true);
        }

        let fragment_ms = self.handle.fragment().as_millis() as u64;
        if should_cut(
            fragment_ms,
            tracks.has_video(),
            kind,
            timestamp,
            self.skip_timestamp,
        ) {
            self.cut(timestamp)?;
        }

        Ok(true)
    }

    fn cut(&mut self, timestamp: u32) -> Result<()> {
        let now = self.clock.now();
        let elapsed = timestamp.wrapping_sub(self.skip_timestamp);

        self.close_pending(now, None)?;
        self.skip_timestamp = timestamp;
        self.open_segment(now)?;
        self.handle.mark_cut(now);

        tracing::debug!(
            session_id = %self.handle.id(),
            stream_elapsed_ms = elapsed,
            "Segment cut"
        );
        Ok(())
    }

    /// End the open segment and record it.
    ///
    /// Without `fallback` the duration is the wall time since it opened.
    fn close_pending(&mut self, now: DateTime<Utc>, fallback: Option<f64>) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        self.formatter.end_segment()?;

        let duration = fallback.unwrap_or_else(|| wall_secs(pending.opened_at, now));
        if let Some(playlist) = self.playlist.as_mut() {
            playlist.append_segment(&pending.file_name, duration)?;
        }

        tracing::info!(
            session_id = %self.handle.id(),
            file = %pending.file_name,
            duration = duration,
            "Segment finalized"
        );
        Ok(())
    }

    fn open_segment(&mut self, now: DateTime<Utc>) -> Result<()> {
        let day = self.config.zone.date_of(now);
        let rotate = self.handle.take_rotation();

        let reopen = match &self.playlist {
            None => true,
            Some(playlist) => rotate || playlist.day() != day,
        };
        if reopen {
            if let Some(previous) = self.playlist.take() {
                tracing::info!(
                    session_id = %self.handle.id(),
                    from = %previous.path().display(),
                    "Rotating day playlist"
                );
            }
            self.playlist = Some(self.store.open(day)?);
        }

        let relative = segment_dir(day).join(self.segment_name(now));
        let path = self.config.stream_dir.join(&relative);
        self.formatter.begin_segment(&path, self.config.append)?;

        let mut open = vec![path];
        if let Some(playlist) = &self.playlist {
            open.push(playlist.path().to_path_buf());
        }
        self.handle.set_open_paths(open);

        self.pending = Some(PendingSegment {
            file_name: to_slash(&relative),
            opened_at: now,
        });
        Ok(())
    }

    /// File name for a segment opening at `now`.
    ///
    /// Names encode the start second and stay unique within the session.
    fn segment_name(&mut self, now: DateTime<Utc>) -> String {
        let extension = self.formatter.extension();

        if self.handle.fragment().is_zero() {
            if let Some(name) = &self.config.file_name {
                let suffix = format!(".{extension}");
                return if name.ends_with(&suffix) {
                    name.clone()
                } else {
                    format!("{name}{suffix}")
                };
            }
        }

        let mut secs = now.timestamp();
        if let Some(last) = self.last_segment_secs {
            if secs <= last {
                secs = last + 1;
            }
        }
        self.last_segment_secs = Some(secs);
        format!("{secs}.{extension}")
    }

    /// Close the open segment with its fallback duration and release files.
    pub fn finish(&mut self) -> Result<()> {
        self.handle.set_state(SessionState::Stopping);

        let now = self.clock.now();
        let fragment = self.handle.fragment();
        let fallback = (!fragment.is_zero()).then(|| fragment.as_secs_f64());
        let result = self.close_pending(now, fallback);

        self.playlist = None;
        self.handle.set_open_paths(Vec::new());
        self.handle.set_state(SessionState::Stopped);
        result
    }
}

fn wall_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let millis = (to - from).num_milliseconds().max(0);
    millis as f64 / 1000.0
}
