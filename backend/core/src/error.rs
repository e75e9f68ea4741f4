use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the quill client.
#[derive(Debug, Error)]
pub enum QuillError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("session timed out after {0:?}")]
    TimeoutError(Duration),

    #[error("remote error ({code}): {message}")]
    RemoteError { code: i64, message: String },

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse classification of a [`QuillError`], stable for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Transport,
    Timeout,
    Remote,
    Decode,
    Storage,
    Other,
}

impl QuillError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigError(_) => ErrorKind::Config,
            Self::TransportError(_) => ErrorKind::Transport,
            Self::TimeoutError(_) => ErrorKind::Timeout,
            Self::RemoteError { .. } => ErrorKind::Remote,
            Self::DecodeError(_) => ErrorKind::Decode,
            Self::StorageError(_) => ErrorKind::Storage,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    pub fn transport(err: impl fmt::Display) -> Self {
        Self::TransportError(err.to_string())
    }

    pub fn decode(err: impl fmt::Display) -> Self {
        Self::DecodeError(err.to_string())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Config => "config",
            Self::Transport => "transport",
            Self::Timeout => "timeout",
            Self::Remote => "remote",
            Self::Decode => "decode",
            Self::Storage => "storage",
            Self::Other => "other",
        };
        write!(f, "{}", s)
    }
}

impl From<serde_json::Error> for QuillError {
    fn from(err: serde_json::Error) -> Self {
        Self::DecodeError(err.to_string())
    }
}
