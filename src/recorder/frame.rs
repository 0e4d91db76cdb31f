//! Frames delivered to a recording session.

use hlsvault_media::{AudioFrame, Tracks, VideoFrame};
use std::sync::mpsc;
use std::time::Duration;

/// One event from a live stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Track announcement; media frames before it are dropped.
    SessionStart(Tracks),
    Audio(AudioFrame),
    Video(VideoFrame),
    /// The publisher went away.
    Stop,
}

/// The frame source has ended and will deliver nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("frame source closed")]
pub struct SourceClosed;

/// A subscription to one stream.
pub trait FrameSource: Send {
    /// Wait up to `timeout` for the next frame.
    ///
    /// `Ok(None)` means nothing arrived in time; the caller polls again.
    fn next_frame(&mut self, timeout: Duration) -> Result<Option<Frame>, SourceClosed>;
}

impl FrameSource for mpsc::Receiver<Frame> {
    fn next_frame(&mut self, timeout: Duration) -> Result<Option<Frame>, SourceClosed> {
        match self.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(SourceClosed),
        }
    }
}
