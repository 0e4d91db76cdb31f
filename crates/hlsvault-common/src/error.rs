//! Unified error type for hlsvault.
//!
//! Recorder sessions, playlist handling and VOD composition all funnel their
//! failures into [`Error`], which carries enough context for API handlers to
//! derive an HTTP status code via [`Error::http_status`].

/// Unified error type covering all failure modes in hlsvault.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "session", "segments").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A recording session for the same key is already running.
    #[error("Recording session already exists: {id}")]
    DuplicateSession {
        /// The session id that is already active.
        id: String,
    },

    /// The output location is invalid or cannot be written.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Text could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Segment packetizing failed.
    #[error("Media error: {0}")]
    Media(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a new DuplicateSession error.
    pub fn duplicate_session(id: impl Into<String>) -> Self {
        Self::DuplicateSession { id: id.into() }
    }

    /// Create a new Configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new Validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new Parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::DuplicateSession { .. } => 409,
            Self::Validation(_) | Self::Parse(_) => 400,
            Self::Configuration(_) => 503,
            Self::Io { .. } | Self::Media(_) | Self::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::DuplicateSession { .. } => "duplicate_session",
            Self::Configuration(_) => "configuration_error",
            Self::Validation(_) => "validation_error",
            Self::Parse(_) => "parse_error",
            Self::Io { .. } => "io_error",
            Self::Media(_) => "media_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
