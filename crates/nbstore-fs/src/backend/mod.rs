//! Storage backend abstraction
//!
//! [`FsBackend`] is the whole capability set the durable I/O layer needs from
//! a filesystem. Bindings for a particular cluster implement it and are
//! handed to [`DurableIo`](crate::DurableIo) at construction time.

mod local;

pub use local::LocalFs;

use chrono::{DateTime, Utc};
use std::io::{self, Read, Write};

use crate::NormalizedPath;

/// Kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Metadata returned by [`FsBackend::info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub kind: EntryKind,
    pub last_modified: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    /// Permission bits, e.g. `0o644`.
    pub permissions: u32,
}

impl EntryInfo {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Operations a storage backend must provide.
///
/// All paths are absolute backend paths. Failures are reported as
/// `io::Error` so that permission and already-exists conditions stay
/// observable through [`io::ErrorKind`].
///
/// None of these operations is expected to be atomic except `rename`.
pub trait FsBackend: Send + Sync + std::fmt::Debug {
    fn exists(&self, path: &NormalizedPath) -> io::Result<bool>;

    fn info(&self, path: &NormalizedPath) -> io::Result<EntryInfo>;

    fn open_read(&self, path: &NormalizedPath) -> io::Result<Box<dyn Read + Send>>;

    /// Open for writing, creating or truncating the file. Missing parent
    /// directories are created.
    fn open_write(&self, path: &NormalizedPath) -> io::Result<Box<dyn Write + Send>>;

    /// Names of the entries in a directory, in backend order.
    fn list(&self, path: &NormalizedPath) -> io::Result<Vec<String>>;

    /// Create a single directory. The parent must already exist.
    ///
    /// Fails with `AlreadyExists` whenever anything occupies the path.
    fn mkdir(&self, path: &NormalizedPath) -> io::Result<()>;

    fn delete(&self, path: &NormalizedPath, recursive: bool) -> io::Result<()>;

    /// Move `src` to `dst`. `dst` must not exist.
    fn rename(&self, src: &NormalizedPath, dst: &NormalizedPath) -> io::Result<()>;

    fn set_permissions(&self, path: &NormalizedPath, mode: u32) -> io::Result<()>;
}
