//! Error types for nbstore-fs

use crate::NormalizedPath;
use std::path::PathBuf;

/// Result type for nbstore-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in nbstore-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unclassified backend failure. Carries the backend path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: NormalizedPath,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} exists but is not a directory")]
    NotADirectory { path: String },

    #[error("Cannot read non-file {path}")]
    NotAFile { path: String },

    /// Permission failure. `path` is an API path, never a backend path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("Unreadable notebook: {path}: {message}")]
    UnreadableDocument { path: String, message: String },

    #[error("{path} is not UTF-8 encoded")]
    BadFormat { path: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Encoding error saving {path}: {message}")]
    EncodingError { path: String, message: String },

    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Failed to serialize {format} config for {path}: {message}")]
    ConfigSerialize {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },
}

impl Error {
    pub fn io(path: impl Into<NormalizedPath>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error was classified at the point of detection.
    ///
    /// Only raw backend failures are unstructured; callers wrap those with
    /// their own context instead of passing them through.
    pub fn is_structured(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }

    /// The underlying `io::ErrorKind` for raw backend failures.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            Self::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}
