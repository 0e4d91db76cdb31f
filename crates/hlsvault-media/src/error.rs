//! Error types for hlsvault-media.

use std::io;
use thiserror::Error;

/// Result type for hlsvault-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for hlsvault-media operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A frame was written for a track the PMT does not advertise.
    #[error("Track not configured: {0}")]
    TrackNotConfigured(&'static str),

    /// A bounded PES packet cannot hold the payload.
    #[error("Payload too large for PES packet: {len} bytes")]
    PayloadTooLarge { len: usize },

    /// Transport-stream data did not parse.
    #[error("Invalid packet: {0}")]
    InvalidPacket(String),
}

impl Error {
    /// Create an invalid packet error.
    pub fn invalid_packet(msg: impl Into<String>) -> Self {
        Self::InvalidPacket(msg.into())
    }
}

impl From<Error> for hlsvault_common::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(source) => hlsvault_common::Error::Io { source },
            other => hlsvault_common::Error::Media(other.to_string()),
        }
    }
}
