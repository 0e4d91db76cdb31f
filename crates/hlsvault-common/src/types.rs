//! Core types shared between the packetizer and the recorder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output format of a recording session.
///
/// Only HLS is recorded today; the enum is the key component of session ids
/// (`<stream path>/<format>`) and selects the segment formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Hls,
}

impl Format {
    /// Extension of the playlist files this format writes.
    pub fn playlist_extension(&self) -> &'static str {
        match self {
            Self::Hls => "m3u8",
        }
    }

    /// Extension of the media segment files this format writes.
    pub fn segment_extension(&self) -> &'static str {
        match self {
            Self::Hls => "ts",
        }
    }

    /// Lowercase name used in session ids and query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hls => "hls",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hls" => Ok(Self::Hls),
            other => Err(crate::Error::validation(format!(
                "unsupported recording type: {other}"
            ))),
        }
    }
}

/// Video codec negotiated for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    H265,
}

impl VideoCodec {
    /// Numeric codec id (FLV numbering, 0 is reserved for "absent").
    pub fn codec_id(&self) -> u8 {
        match self {
            Self::H264 => 7,
            Self::H265 => 12,
        }
    }

    /// MPEG-TS `stream_type` advertised in the PMT.
    pub fn stream_type(&self) -> u8 {
        match self {
            Self::H264 => 0x1B,
            Self::H265 => 0x24,
        }
    }
}

/// Audio codec negotiated for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Aac,
    Pcma,
    Pcmu,
}

impl AudioCodec {
    /// Numeric codec id (FLV numbering, 0 is reserved for "absent").
    pub fn codec_id(&self) -> u8 {
        match self {
            Self::Pcma => 7,
            Self::Pcmu => 8,
            Self::Aac => 10,
        }
    }

    /// MPEG-TS `stream_type` advertised in the PMT.
    pub fn stream_type(&self) -> u8 {
        match self {
            Self::Aac => 0x0F,
            Self::Pcma => 0x90,
            Self::Pcmu => 0x91,
        }
    }
}

/// Codec id of an optional video track, 0 when absent.
pub fn video_codec_id(codec: Option<VideoCodec>) -> u8 {
    codec.map(|c| c.codec_id()).unwrap_or(0)
}

/// Codec id of an optional audio track, 0 when absent.
pub fn audio_codec_id(codec: Option<AudioCodec>) -> u8 {
    codec.map(|c| c.codec_id()).unwrap_or(0)
}
