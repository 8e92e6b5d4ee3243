//! Durable file I/O for notebook-store
//!
//! Everything that touches the storage backend goes through this crate:
//! path translation between API paths and backend paths, atomic writes with
//! rollback, corruption recovery for notebook documents, permission error
//! translation, and streamed copies.

pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod notebook;
pub mod path;

pub use backend::{EntryInfo, EntryKind, FsBackend, LocalFs};
pub use config::{BackendConfig, ConfigStore, StoreConfig};
pub use constants::Sidecar;
pub use error::{Error, Result};
pub use io::{DurableIo, FileFormat, WriteMode, is_hidden};
pub use notebook::{Notebook, NotebookError};
pub use path::{NormalizedPath, PathMapper, normalize_api_path};
