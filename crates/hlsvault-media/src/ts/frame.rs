//! Frames delivered to the segment writer.

use bytes::Bytes;
use hlsvault_common::{AudioCodec, VideoCodec};

/// Elementary streams negotiated for a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Tracks {
    pub video: Option<VideoCodec>,
    pub audio: Option<AudioCodec>,
}

impl Tracks {
    /// A video track with an optional audio track.
    pub fn video(codec: VideoCodec, audio: Option<AudioCodec>) -> Self {
        Self {
            video: Some(codec),
            audio,
        }
    }

    /// An audio-only stream.
    pub fn audio_only(codec: AudioCodec) -> Self {
        Self {
            video: None,
            audio: Some(codec),
        }
    }

    /// Whether the stream carries video.
    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }
}

/// One audio access unit.
///
/// The payload is already framed for transport-stream carriage (ADTS for AAC).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Presentation time in milliseconds.
    pub timestamp: u32,
    pub payload: Bytes,
}

impl AudioFrame {
    pub fn new(timestamp: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            payload: payload.into(),
        }
    }
}

/// One video access unit.
///
/// The payload is already framed for transport-stream carriage (Annex-B).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// Decode time in milliseconds.
    pub timestamp: u32,
    /// Presentation minus decode time in milliseconds.
    pub composition_offset: u32,
    /// Whether the frame starts an independently decodable group.
    pub keyframe: bool,
    pub payload: Bytes,
}

impl VideoFrame {
    pub fn new(timestamp: u32, keyframe: bool, payload: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            composition_offset: 0,
            keyframe,
            payload: payload.into(),
        }
    }

    /// Set the composition offset (B-frame reordering delay).
    pub fn with_composition_offset(mut self, offset: u32) -> Self {
        self.composition_offset = offset;
        self
    }
}
