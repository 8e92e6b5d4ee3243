//! Naming constants and sidecar paths used next to stored documents.

use crate::NormalizedPath;

/// Chunk size for streamed copies.
pub const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Path segments starting with this character are hidden.
pub const HIDDEN_MARKER: char = '.';

/// Extension that marks a file as a notebook document.
pub const NOTEBOOK_EXTENSION: &str = ".ipynb";

/// Default name of the per-directory checkpoint subdirectory.
pub const DEFAULT_CHECKPOINT_DIR: &str = ".ipynb_checkpoints";

/// Owner write bit checked to decide whether an entry is writable.
pub const OWNER_WRITE_BIT: u32 = 0o200;

/// Files kept next to a document by the durability machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sidecar {
    /// `.~<name>`: backup held during an atomic write. The prefix also keeps
    /// sync clients such as Dropbox from picking the file up.
    Intermediate,
    /// `<name>.invalid`: a corrupt document moved aside during recovery.
    Invalid,
}

impl Sidecar {
    /// Path of this sidecar for the document at `path`.
    pub fn path_for(&self, path: &NormalizedPath) -> NormalizedPath {
        let name = path.file_name().unwrap_or_default();
        let sidecar = match self {
            Self::Intermediate => format!(".~{}", name),
            Self::Invalid => format!("{}.invalid", name),
        };
        path.with_file_name(&sidecar)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intermediate => "intermediate",
            Self::Invalid => "invalid",
        }
    }
}

impl std::fmt::Display for Sidecar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
