//! The document store: get, save, delete and rename by API path.

use std::sync::Arc;

use nbstore_fs::constants::{NOTEBOOK_EXTENSION, OWNER_WRITE_BIT};
use nbstore_fs::{
    DurableIo, FileFormat, FsBackend, NormalizedPath, Notebook, StoreConfig, normalize_api_path,
};
use regex::Regex;
use serde_json::Value;

use crate::checkpoints::CheckpointStore;
use crate::hooks::{DocumentHooks, NoopHooks};
use crate::model::{CheckpointMetadata, Content, ContentKind, Format, Model, SaveModel};
use crate::{Error, Result};

/// Persists documents through a [`DurableIo`] and keeps their checkpoints.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use nbstore_core::{DocumentStore, SaveModel};
/// use nbstore_fs::{FileFormat, LocalFs, StoreConfig};
///
/// # fn main() -> nbstore_core::Result<()> {
/// let backend = Arc::new(LocalFs::new("/srv/notebooks"));
/// let store = DocumentStore::from_config(backend, &StoreConfig::default())?;
/// store.save(SaveModel::file("hello", FileFormat::Text), "notes/hello.txt")?;
/// let model = store.get("notes/hello.txt", true, None, None)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DocumentStore {
    io: Arc<DurableIo>,
    checkpoints: CheckpointStore,
    hooks: Arc<dyn DocumentHooks>,
    hide_globs: Vec<Regex>,
}

impl DocumentStore {
    /// Store with [`NoopHooks`] and the default hidden-name globs.
    pub fn new(io: Arc<DurableIo>, checkpoints: CheckpointStore) -> Result<Self> {
        Self {
            io,
            checkpoints,
            hooks: Arc::new(NoopHooks),
            hide_globs: Vec::new(),
        }
        .with_hide_globs(StoreConfig::default().hide_globs)
    }

    /// Wire a store, its I/O layer and its checkpoints from configuration.
    pub fn from_config(backend: Arc<dyn FsBackend>, config: &StoreConfig) -> Result<Self> {
        let io = Arc::new(DurableIo::from_config(backend, config));
        let checkpoints = CheckpointStore::new(io.clone(), config.checkpoint_dir.as_str());
        Self::new(io, checkpoints)?.with_hide_globs(&config.hide_globs)
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn DocumentHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the shell-style patterns of names left out of listings.
    pub fn with_hide_globs<I, S>(mut self, globs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.hide_globs = globs
            .into_iter()
            .map(|glob| glob_to_regex(glob.as_ref()))
            .collect::<Result<_>>()?;
        Ok(self)
    }

    pub fn io(&self) -> &Arc<DurableIo> {
        &self.io
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    pub fn info_string(&self) -> String {
        format!(
            "Serving notebooks from remote directory: {}",
            self.io.mapper().root()
        )
    }

    // -- queries ----------------------------------------------------------

    pub fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.io.path_exists(&self.io.backend_path(path))?)
    }

    pub fn dir_exists(&self, path: &str) -> Result<bool> {
        Ok(self.io.is_dir(&self.io.backend_path(path))?)
    }

    pub fn file_exists(&self, path: &str) -> Result<bool> {
        Ok(self.io.is_file(&self.io.backend_path(path))?)
    }

    pub fn is_hidden(&self, path: &str) -> bool {
        nbstore_fs::is_hidden(&normalize_api_path(path))
    }

    /// Whether `name` is kept in directory listings.
    pub fn should_list(&self, name: &str) -> bool {
        !self.hide_globs.iter().any(|glob| glob.is_match(name))
    }

    /// Model of the entry at `path`.
    ///
    /// `kind` is the type the caller expects; `format` applies to file
    /// content only.
    pub fn get(
        &self,
        path: &str,
        content: bool,
        kind: Option<ContentKind>,
        format: Option<FileFormat>,
    ) -> Result<Model> {
        let path = normalize_api_path(path);
        let backend = self.io.backend_path(&path);

        if !self.io.path_exists(&backend)? {
            return Err(Error::NotFound { path });
        }

        if self.io.is_dir(&backend)? {
            if let Some(kind) = kind.filter(|k| *k != ContentKind::Directory) {
                return Err(Error::BadType {
                    message: format!("{} is a directory, not a {}", path, kind),
                    path,
                });
            }
            self.dir_model(&path, &backend, content)
        } else if kind == Some(ContentKind::Notebook)
            || (kind.is_none() && path.ends_with(NOTEBOOK_EXTENSION))
        {
            self.notebook_model(&path, &backend, content)
        } else if kind == Some(ContentKind::Directory) {
            Err(Error::BadType {
                message: format!("{} is not a directory", path),
                path,
            })
        } else {
            self.file_model(&path, &backend, content, format)
        }
    }

    fn base_model(&self, path: &str, backend: &NormalizedPath, kind: ContentKind) -> Result<Model> {
        let info = self.io.entry_info(backend)?;
        Ok(Model {
            name: path.rsplit('/').next().unwrap_or_default().to_string(),
            path: path.to_string(),
            kind,
            last_modified: info.last_modified,
            created: info.last_accessed,
            content: None,
            format: None,
            mimetype: None,
            writable: info.permissions & OWNER_WRITE_BIT != 0,
            message: None,
        })
    }

    fn dir_model(&self, path: &str, backend: &NormalizedPath, content: bool) -> Result<Model> {
        if self.is_hidden(path) {
            tracing::info!(path = %backend, "Refusing to serve hidden directory");
            return Err(Error::NotFound {
                path: path.to_string(),
            });
        }

        let mut model = self.base_model(path, backend, ContentKind::Directory)?;
        if content {
            let mut children = Vec::new();
            for name in self.io.list_dir(backend)? {
                if !self.should_list(&name) || self.is_hidden(&name) {
                    continue;
                }
                let child = if path.is_empty() {
                    name
                } else {
                    format!("{}/{}", path, name)
                };
                children.push(self.get(&child, false, None, None)?);
            }
            model.content = Some(Content::Directory(children));
            model.format = Some(Format::Json);
        }
        Ok(model)
    }

    fn file_model(
        &self,
        path: &str,
        backend: &NormalizedPath,
        content: bool,
        format: Option<FileFormat>,
    ) -> Result<Model> {
        let mut model = self.base_model(path, backend, ContentKind::File)?;
        model.mimetype = mime_guess::from_path(path).first().map(|m| m.to_string());

        if content {
            let (text, format) = self.io.read_file(backend, format)?;
            if model.mimetype.is_none() {
                model.mimetype = Some(format.default_mimetype().to_string());
            }
            model.content = Some(Content::Text(text));
            model.format = Some(format.into());
        }
        Ok(model)
    }

    fn notebook_model(&self, path: &str, backend: &NormalizedPath, content: bool) -> Result<Model> {
        let mut model = self.base_model(path, backend, ContentKind::Notebook)?;
        if content {
            let mut notebook = self.io.read_notebook(backend)?;
            self.hooks.mark_trusted(&mut notebook, path);
            model.message = self.hooks.validate(&notebook);
            model.content = Some(Content::Notebook(notebook));
            model.format = Some(Format::Json);
        }
        Ok(model)
    }

    // -- mutations --------------------------------------------------------

    /// Save a model at `path` and return the content-free model of the
    /// result, carrying any notebook validation message.
    pub fn save(&self, mut model: SaveModel, path: &str) -> Result<Model> {
        let path = normalize_api_path(path);

        let Some(kind) = model.kind.clone() else {
            return Err(Error::MissingField { field: "type" });
        };
        if model.content.is_none() && kind != ContentKind::Directory.as_str() {
            return Err(Error::MissingField { field: "content" });
        }

        let backend = self.io.backend_path(&path);
        tracing::debug!(path = %backend, kind = %kind, "Saving");
        self.hooks.pre_save(&mut model, &path)?;

        let message = self
            .save_content(&model, &path, &backend)
            .map_err(|err| self.wrap_unexpected(&path, err))?;

        let mut saved = self.get(&path, false, None, None)?;
        saved.message = message;
        Ok(saved)
    }

    fn save_content(
        &self,
        model: &SaveModel,
        path: &str,
        backend: &NormalizedPath,
    ) -> Result<Option<String>> {
        let kind: ContentKind = model.kind.as_deref().unwrap_or_default().parse()?;
        let content = model.content.clone().unwrap_or(Value::Null);

        match kind {
            ContentKind::Notebook => {
                let notebook = Notebook::from_value(content).map_err(|e| Error::InvalidArgument {
                    message: format!("Invalid notebook content for {}: {}", path, e),
                })?;
                self.hooks.sign_if_trusted(&notebook, path);
                self.io.save_notebook(backend, &notebook)?;
                // Every notebook keeps one checkpoint.
                if self.checkpoints.list(path)?.is_empty() {
                    self.checkpoints.create(path)?;
                }
                Ok(self.hooks.validate(&notebook))
            }
            ContentKind::File => {
                let Value::String(text) = content else {
                    return Err(Error::InvalidArgument {
                        message: format!("File content for {} must be a string", path),
                    });
                };
                self.io.write_file(backend, &text, model.format.as_deref())?;
                Ok(None)
            }
            ContentKind::Directory => {
                if self.is_hidden(path) {
                    return Err(Error::InvalidArgument {
                        message: format!("Cannot create hidden directory {}", path),
                    });
                }
                self.io
                    .guard_permissions(Some(backend), || self.io.ensure_dir(backend))?;
                Ok(None)
            }
        }
    }

    fn wrap_unexpected(&self, path: &str, err: Error) -> Error {
        match err {
            Error::Fs(source) if !source.is_structured() => {
                tracing::error!(path = %path, error = %source, "Error while saving file");
                Error::SaveFailed {
                    path: path.to_string(),
                    source,
                }
            }
            other => other,
        }
    }

    /// Delete a file, or a directory holding nothing but checkpoints.
    ///
    /// Checkpoints of a deleted file are left in place; see [`Self::delete`].
    pub fn delete_file(&self, path: &str) -> Result<()> {
        let path = normalize_api_path(path);
        let backend = self.io.backend_path(&path);

        let recursive = if self.io.is_dir(&backend)? {
            let names = self.io.list_dir(&backend)?;
            if names.iter().any(|name| name != self.checkpoints.checkpoint_dir()) {
                return Err(Error::DirectoryNotEmpty { path });
            }
            tracing::debug!(path = %backend, "Removing directory");
            true
        } else if self.io.is_file(&backend)? {
            tracing::debug!(path = %backend, "Removing file");
            false
        } else {
            return Err(Error::NotFound { path });
        };

        self.io
            .guard_permissions(Some(&backend), || self.io.remove(&backend, recursive))?;
        Ok(())
    }

    /// Rename an entry. Checkpoints stay behind; see [`Self::rename`].
    pub fn rename_file(&self, old_path: &str, new_path: &str) -> Result<()> {
        let old_path = normalize_api_path(old_path);
        let new_path = normalize_api_path(new_path);
        if old_path == new_path {
            return Ok(());
        }

        let old_backend = self.io.backend_path(&old_path);
        let new_backend = self.io.backend_path(&new_path);

        if self.io.path_exists(&new_backend)? {
            return Err(Error::AlreadyExists { path: new_path });
        }
        if !self.io.path_exists(&old_backend)? {
            return Err(Error::NotFound { path: old_path });
        }

        self.io
            .guard_permissions(Some(&old_backend), || {
                self.io.move_file(&old_backend, &new_backend)
            })
            .map_err(|source| {
                if source.is_structured() {
                    Error::Fs(source)
                } else {
                    tracing::error!(old = %old_path, new = %new_path, error = %source, "Error renaming file");
                    Error::RenameFailed {
                        old: old_path.clone(),
                        new: new_path.clone(),
                        source,
                    }
                }
            })
    }

    /// Delete an entry and its checkpoint.
    pub fn delete(&self, path: &str) -> Result<()> {
        self.delete_file(path)?;
        for checkpoint in self.checkpoints.list(path)? {
            self.checkpoints.delete(&checkpoint.id, path)?;
        }
        Ok(())
    }

    /// Rename an entry and move its checkpoint along.
    pub fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        if normalize_api_path(old_path) == normalize_api_path(new_path) {
            return Ok(());
        }
        self.rename_file(old_path, new_path)?;
        for checkpoint in self.checkpoints.list(old_path)? {
            self.checkpoints.rename(&checkpoint.id, old_path, new_path)?;
        }
        Ok(())
    }

    // -- checkpoints ------------------------------------------------------

    pub fn create_checkpoint(&self, path: &str) -> Result<CheckpointMetadata> {
        self.checkpoints.create(path)
    }

    pub fn list_checkpoints(&self, path: &str) -> Result<Vec<CheckpointMetadata>> {
        self.checkpoints.list(path)
    }

    pub fn restore_checkpoint(&self, checkpoint_id: &str, path: &str) -> Result<()> {
        self.checkpoints.restore(checkpoint_id, path)
    }

    pub fn delete_checkpoint(&self, checkpoint_id: &str, path: &str) -> Result<()> {
        self.checkpoints.delete(checkpoint_id, path)
    }
}

/// Compile a shell-style glob (`*`, `?`) matching whole names.
fn glob_to_regex(glob: &str) -> Result<Regex> {
    let pattern = regex::escape(glob)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    Regex::new(&format!("^{}$", pattern)).map_err(|e| Error::InvalidArgument {
        message: format!("Invalid hide glob '{}': {}", glob, e),
    })
}
