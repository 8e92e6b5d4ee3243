//! Error types for nbstore-core

/// Result type for nbstore-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in document and checkpoint operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Nothing exists at the requested path
    #[error("No such file or directory: {path}")]
    NotFound { path: String },

    /// Rename target is already occupied
    #[error("File already exists: {path}")]
    AlreadyExists { path: String },

    /// The entry exists but is not of the requested type
    #[error("{message}")]
    BadType { path: String, message: String },

    /// Directory delete refused because it holds more than checkpoints
    #[error("Directory {path} not empty")]
    DirectoryNotEmpty { path: String },

    /// A save model lacks a required field
    #[error("No file {field} provided")]
    MissingField { field: &'static str },

    #[error("{message}")]
    InvalidArgument { message: String },

    #[error("Checkpoint does not exist: {path}@{checkpoint_id}")]
    CheckpointNotFound { path: String, checkpoint_id: String },

    /// An unexpected backend failure while saving
    #[error("Unexpected error while saving file: {path} {source}")]
    SaveFailed {
        path: String,
        #[source]
        source: nbstore_fs::Error,
    },

    /// An unexpected backend failure while renaming
    #[error("Unknown error renaming file: {old} {source}")]
    RenameFailed {
        old: String,
        new: String,
        #[source]
        source: nbstore_fs::Error,
    },

    // Transparent wrapper for the I/O layer
    /// Filesystem error from nbstore-fs
    #[error(transparent)]
    Fs(#[from] nbstore_fs::Error),
}

impl Error {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Fs(nbstore_fs::Error::PermissionDenied { .. }))
    }

    /// Whether this is a raw backend failure that nothing has classified.
    pub fn is_unexpected(&self) -> bool {
        match self {
            Self::Fs(e) => !e.is_structured(),
            Self::SaveFailed { .. } | Self::RenameFailed { .. } => true,
            _ => false,
        }
    }

    /// HTTP status an outer service should answer with.
    pub fn status_code(&self) -> u16 {
        use nbstore_fs::Error as FsError;

        match self {
            Self::NotFound { .. } | Self::CheckpointNotFound { .. } => 404,
            Self::AlreadyExists { .. } => 409,
            Self::BadType { .. }
            | Self::DirectoryNotEmpty { .. }
            | Self::MissingField { .. }
            | Self::InvalidArgument { .. } => 400,
            Self::SaveFailed { .. } | Self::RenameFailed { .. } => 500,
            Self::Fs(e) => match e {
                FsError::PermissionDenied { .. } => 403,
                FsError::NotADirectory { .. }
                | FsError::NotAFile { .. }
                | FsError::UnreadableDocument { .. }
                | FsError::BadFormat { .. }
                | FsError::InvalidArgument { .. }
                | FsError::EncodingError { .. } => 400,
                _ => 500,
            },
        }
    }
}
