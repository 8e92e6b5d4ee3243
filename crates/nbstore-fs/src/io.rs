//! Durable I/O operations over a storage backend
//!
//! [`DurableIo`] owns the backend handle and the API path mapping. Every
//! write goes through [`DurableIo::atomic_write`], which keeps a backup of
//! the previous content in an intermediate sidecar and restores it when the
//! write fails, so readers observe either the old or the new content.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;
use std::sync::Arc;

use crate::backend::{EntryInfo, FsBackend};
use crate::constants::{COPY_CHUNK_SIZE, HIDDEN_MARKER};
use crate::{Error, NormalizedPath, Notebook, PathMapper, Result, Sidecar, StoreConfig};

/// How writes reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Back up the previous content and restore it if the write fails.
    #[default]
    Atomic,
    /// Write in place. A failed write can leave the target corrupt; meant
    /// for backends that do not order rename against writes.
    Direct,
}

impl WriteMode {
    pub fn is_atomic(self) -> bool {
        self == Self::Atomic
    }
}

/// Encoding of generic file content in a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Text,
    Base64,
}

impl FileFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Base64 => "base64",
        }
    }

    /// MIME type used when none can be guessed from the file name.
    pub fn default_mimetype(&self) -> &'static str {
        match self {
            Self::Text => "text/plain",
            Self::Base64 => "application/octet-stream",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FileFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "base64" => Ok(Self::Base64),
            other => Err(Error::InvalidArgument {
                message: format!(
                    "Must specify format of file contents as 'text' or 'base64', got '{}'",
                    other
                ),
            }),
        }
    }
}

/// Whether any segment of `path` is hidden.
pub fn is_hidden(path: &str) -> bool {
    path.split('/').any(|part| part.starts_with(HIDDEN_MARKER))
}

/// Durable file operations rooted at a backend directory.
#[derive(Debug, Clone)]
pub struct DurableIo {
    backend: Arc<dyn FsBackend>,
    mapper: PathMapper,
    write_mode: WriteMode,
}

impl DurableIo {
    pub fn new(backend: Arc<dyn FsBackend>, root: impl Into<NormalizedPath>) -> Self {
        Self {
            backend,
            mapper: PathMapper::new(root),
            write_mode: WriteMode::default(),
        }
    }

    pub fn from_config(backend: Arc<dyn FsBackend>, config: &StoreConfig) -> Self {
        Self::new(backend, config.root_dir.as_str()).with_write_mode(config.write_mode())
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    pub fn mapper(&self) -> &PathMapper {
        &self.mapper
    }

    pub fn backend(&self) -> &Arc<dyn FsBackend> {
        &self.backend
    }

    /// Backend path for an API path.
    pub fn backend_path(&self, api_path: &str) -> NormalizedPath {
        self.mapper.to_backend(api_path)
    }

    /// API path for a backend path.
    pub fn api_path(&self, path: &NormalizedPath) -> String {
        self.mapper.to_api(path)
    }

    // -- queries ----------------------------------------------------------

    pub fn path_exists(&self, path: &NormalizedPath) -> Result<bool> {
        self.backend.exists(path).map_err(|e| Error::io(path, e))
    }

    pub fn entry_info(&self, path: &NormalizedPath) -> Result<EntryInfo> {
        self.backend.info(path).map_err(|e| Error::io(path, e))
    }

    pub fn is_dir(&self, path: &NormalizedPath) -> Result<bool> {
        Ok(self.path_exists(path)? && self.entry_info(path)?.is_dir())
    }

    pub fn is_file(&self, path: &NormalizedPath) -> Result<bool> {
        Ok(self.path_exists(path)? && self.entry_info(path)?.is_file())
    }

    pub fn list_dir(&self, path: &NormalizedPath) -> Result<Vec<String>> {
        self.backend.list(path).map_err(|e| Error::io(path, e))
    }

    // -- mutations --------------------------------------------------------

    /// Create `path` as a directory unless it already is one. Missing
    /// parents are created first.
    ///
    /// Losing a creation race to another writer counts as success.
    pub fn ensure_dir(&self, path: &NormalizedPath) -> Result<()> {
        if self.path_exists(path)? {
            return if self.is_dir(path)? {
                Ok(())
            } else {
                Err(self.not_a_directory(path))
            };
        }
        if let Some(parent) = path.parent() {
            self.ensure_dir(&parent)?;
        }
        tracing::debug!(path = %path, "Creating directory");
        match self.backend.mkdir(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if self.is_dir(path)? {
                    tracing::debug!(path = %path, "Directory created concurrently");
                    Ok(())
                } else {
                    Err(self.not_a_directory(path))
                }
            }
            Err(e) => Err(Error::io(path, e)),
        }
    }

    pub fn remove(&self, path: &NormalizedPath, recursive: bool) -> Result<()> {
        tracing::debug!(path = %path, recursive, "Removing");
        self.backend
            .delete(path, recursive)
            .map_err(|e| Error::io(path, e))
    }

    /// Copy a file in fixed-size chunks. Not atomic on its own.
    pub fn copy_file(&self, src: &NormalizedPath, dst: &NormalizedPath) -> Result<()> {
        tracing::debug!(src = %src, dst = %dst, "Copying file");
        let mut reader = self.backend.open_read(src).map_err(|e| Error::io(src, e))?;
        let mut writer = self.backend.open_write(dst).map_err(|e| Error::io(dst, e))?;
        let mut chunk = vec![0u8; COPY_CHUNK_SIZE];
        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::io(src, e)),
            };
            writer
                .write_all(&chunk[..n])
                .map_err(|e| Error::io(dst, e))?;
        }
        writer.flush().map_err(|e| Error::io(dst, e))
    }

    /// Move `src` onto `dst`, replacing an existing file.
    ///
    /// The permission bits of `src` are re-applied to `dst` afterwards since
    /// some backends reset them on move.
    pub fn move_file(&self, src: &NormalizedPath, dst: &NormalizedPath) -> Result<()> {
        tracing::debug!(src = %src, dst = %dst, "Moving file");
        let permissions = self.entry_info(src)?.permissions;
        if self.is_file(dst)? {
            self.remove(dst, false)?;
        }
        self.backend.rename(src, dst).map_err(|e| Error::io(src, e))?;
        self.backend
            .set_permissions(dst, permissions)
            .map_err(|e| Error::io(dst, e))
    }

    /// Run `op`, reporting permission failures as
    /// [`Error::PermissionDenied`] with an API path.
    ///
    /// `context` names the path to report; when absent the path of the
    /// failing backend call is used.
    pub fn guard_permissions<T>(
        &self,
        context: Option<&NormalizedPath>,
        op: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        op().map_err(|err| match err {
            Error::Io { path, source } if source.kind() == io::ErrorKind::PermissionDenied => {
                let target = context.unwrap_or(&path);
                Error::PermissionDenied {
                    path: self.mapper.to_api(target),
                }
            }
            other => other,
        })
    }

    /// Write `path` through a scoped writer.
    ///
    /// In [`WriteMode::Atomic`] the previous content is first copied to the
    /// intermediate sidecar. If `write` or the final flush fails, the backup
    /// is moved back over `path` (or the partial file removed when there was
    /// nothing to back up) and the original error is returned. On success the
    /// intermediate is deleted.
    pub fn atomic_write<F>(&self, path: &NormalizedPath, write: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        self.guard_permissions(Some(path), || match self.write_mode {
            WriteMode::Atomic => self.write_with_backup(path, write),
            WriteMode::Direct => self.write_stream(path, write),
        })
    }

    fn write_with_backup<F>(&self, path: &NormalizedPath, write: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        let intermediate = Sidecar::Intermediate.path_for(path);
        let backed_up = self.is_file(path)?;
        if backed_up {
            let permissions = self.entry_info(path)?.permissions;
            self.copy_file(path, &intermediate)?;
            self.backend
                .set_permissions(&intermediate, permissions)
                .map_err(|e| Error::io(&intermediate, e))?;
        }

        match self.write_stream(path, write) {
            Ok(()) => {
                if self.is_file(&intermediate)? {
                    self.remove(&intermediate, false)?;
                }
                Ok(())
            }
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "Write failed, rolling back");
                let rollback = if backed_up {
                    self.move_file(&intermediate, path)
                } else {
                    self.remove_partial(path)
                };
                if let Err(rollback_err) = rollback {
                    tracing::error!(path = %path, error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    fn remove_partial(&self, path: &NormalizedPath) -> Result<()> {
        if self.is_file(path)? {
            self.remove(path, false)?;
        }
        Ok(())
    }

    fn write_stream<F>(&self, path: &NormalizedPath, write: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        // The handle is dropped, closing it, before the caller rolls back.
        let mut handle = self.backend.open_write(path).map_err(|e| Error::io(path, e))?;
        write(&mut *handle)
            .and_then(|()| handle.flush())
            .map_err(|e| Error::io(path, e))
    }

    // -- documents --------------------------------------------------------

    /// Read and parse a notebook.
    ///
    /// When parsing fails and an intermediate from an interrupted atomic
    /// write is present, the corrupt file is moved to the invalid sidecar,
    /// the intermediate is promoted, and the read is retried once.
    pub fn read_notebook(&self, path: &NormalizedPath) -> Result<Notebook> {
        self.read_notebook_inner(path, true)
    }

    fn read_notebook_inner(&self, path: &NormalizedPath, recover: bool) -> Result<Notebook> {
        let bytes = self.read_bytes(path)?;
        let parse_err = match Notebook::from_slice(&bytes) {
            Ok(nb) => return Ok(nb),
            Err(e) => e,
        };

        let intermediate = Sidecar::Intermediate.path_for(path);
        if !recover || !self.write_mode.is_atomic() || !self.is_file(&intermediate)? {
            return Err(Error::UnreadableDocument {
                path: self.mapper.to_api(path),
                message: parse_err.to_string(),
            });
        }

        let invalid = Sidecar::Invalid.path_for(path);
        tracing::info!(
            path = %path,
            invalid = %invalid,
            error = %parse_err,
            "Restoring notebook from atomic-write intermediate"
        );
        self.guard_permissions(Some(path), || {
            let permissions = self.entry_info(path)?.permissions;
            self.move_file(path, &invalid)?;
            self.move_file(&intermediate, path)?;
            self.backend
                .set_permissions(path, permissions)
                .map_err(|e| Error::io(path, e))
        })?;
        self.read_notebook_inner(path, false)
    }

    /// Persist a notebook in its canonical form.
    pub fn save_notebook(&self, path: &NormalizedPath, notebook: &Notebook) -> Result<()> {
        self.atomic_write(path, |w| notebook.write_canonical(w))
    }

    /// Read a generic file.
    ///
    /// With no format, or `text`, the content is decoded as UTF-8. Content
    /// that is not UTF-8 falls back to base64 unless `text` was requested
    /// explicitly, which fails with [`Error::BadFormat`].
    pub fn read_file(
        &self,
        path: &NormalizedPath,
        format: Option<FileFormat>,
    ) -> Result<(String, FileFormat)> {
        if !self.is_file(path)? {
            return Err(Error::NotAFile {
                path: self.mapper.to_api(path),
            });
        }
        let bytes = self.read_bytes(path)?;

        if format != Some(FileFormat::Base64) {
            match String::from_utf8(bytes) {
                Ok(text) => return Ok((text, FileFormat::Text)),
                Err(_) if format == Some(FileFormat::Text) => {
                    return Err(Error::BadFormat {
                        path: self.mapper.to_api(path),
                    });
                }
                Err(e) => return Ok((STANDARD.encode(e.into_bytes()), FileFormat::Base64)),
            }
        }
        Ok((STANDARD.encode(bytes), FileFormat::Base64))
    }

    /// Write a generic file. `format` must be `text` or `base64`.
    pub fn write_file(
        &self,
        path: &NormalizedPath,
        content: &str,
        format: Option<&str>,
    ) -> Result<()> {
        let format: FileFormat = format.unwrap_or_default().parse()?;
        let bytes = match format {
            FileFormat::Text => content.as_bytes().to_vec(),
            FileFormat::Base64 => {
                let compact: String = content.split_ascii_whitespace().collect();
                STANDARD
                    .decode(compact)
                    .map_err(|e| Error::EncodingError {
                        path: self.mapper.to_api(path),
                        message: e.to_string(),
                    })?
            }
        };
        self.atomic_write(path, |w| w.write_all(&bytes))
    }

    fn read_bytes(&self, path: &NormalizedPath) -> Result<Vec<u8>> {
        let mut reader = self.backend.open_read(path).map_err(|e| Error::io(path, e))?;
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| Error::io(path, e))?;
        Ok(bytes)
    }

    fn not_a_directory(&self, path: &NormalizedPath) -> Error {
        Error::NotADirectory {
            path: self.mapper.to_api(path),
        }
    }
}
