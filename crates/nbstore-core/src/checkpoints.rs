//! Checkpoint storage next to each document.
//!
//! Each document has at most one checkpoint, id [`CHECKPOINT_ID`], stored as
//! a full copy at `<parent>/<checkpoint_dir>/<stem>-<id><ext>`. Creating a
//! checkpoint overwrites the previous one.

use std::sync::Arc;

use nbstore_fs::{DurableIo, NormalizedPath, normalize_api_path};

use crate::{CheckpointMetadata, Error, Result};

/// The only checkpoint id in use.
pub const CHECKPOINT_ID: &str = "checkpoint";

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    io: Arc<DurableIo>,
    checkpoint_dir: String,
}

impl CheckpointStore {
    pub fn new(io: Arc<DurableIo>, checkpoint_dir: impl Into<String>) -> Self {
        Self {
            io,
            checkpoint_dir: checkpoint_dir.into(),
        }
    }

    /// Name of the per-directory checkpoint subdirectory.
    pub fn checkpoint_dir(&self) -> &str {
        &self.checkpoint_dir
    }

    /// Backend path of a checkpoint, creating its directory.
    pub fn checkpoint_path(&self, checkpoint_id: &str, path: &str) -> Result<NormalizedPath> {
        let cp_path = self.locate(checkpoint_id, path);
        if let Some(cp_dir) = cp_path.parent() {
            self.io
                .guard_permissions(Some(&cp_dir), || self.io.ensure_dir(&cp_dir))?;
        }
        Ok(cp_path)
    }

    /// Backend path of a checkpoint, without touching the backend.
    fn locate(&self, checkpoint_id: &str, path: &str) -> NormalizedPath {
        let doc = NormalizedPath::new(normalize_api_path(path));
        let (stem, ext) = doc.split_extension();
        let filename = format!("{}-{}{}", stem, checkpoint_id, ext);
        let parent = doc.parent().unwrap_or_else(|| NormalizedPath::new(""));
        self.io
            .backend_path(parent.as_str())
            .join(&self.checkpoint_dir)
            .join(&filename)
    }

    /// Copy the document at `path` into its checkpoint.
    pub fn create(&self, path: &str) -> Result<CheckpointMetadata> {
        let src = self.io.backend_path(path);
        if !self.io.is_file(&src)? {
            return Err(Error::NotFound {
                path: normalize_api_path(path),
            });
        }
        let dst = self.checkpoint_path(CHECKPOINT_ID, path)?;
        tracing::debug!(src = %src, checkpoint = %dst, "Creating checkpoint");
        self.io
            .guard_permissions(Some(&dst), || self.io.copy_file(&src, &dst))?;
        self.metadata(CHECKPOINT_ID, &dst)
    }

    /// Copy a checkpoint back over its document.
    pub fn restore(&self, checkpoint_id: &str, path: &str) -> Result<()> {
        let src = self.existing(checkpoint_id, path)?;
        let dst = self.io.backend_path(path);
        tracing::debug!(checkpoint = %src, dst = %dst, "Restoring checkpoint");
        self.io
            .guard_permissions(Some(&dst), || self.io.copy_file(&src, &dst))?;
        Ok(())
    }

    /// Checkpoints of `path`: none or one.
    pub fn list(&self, path: &str) -> Result<Vec<CheckpointMetadata>> {
        let cp_path = self.locate(CHECKPOINT_ID, path);
        if self.io.is_file(&cp_path)? {
            Ok(vec![self.metadata(CHECKPOINT_ID, &cp_path)?])
        } else {
            Ok(Vec::new())
        }
    }

    /// Move a checkpoint along with its document. No-op if absent.
    pub fn rename(&self, checkpoint_id: &str, old_path: &str, new_path: &str) -> Result<()> {
        let old_cp = self.locate(checkpoint_id, old_path);
        if !self.io.is_file(&old_cp)? {
            return Ok(());
        }
        let new_cp = self.checkpoint_path(checkpoint_id, new_path)?;
        tracing::debug!(src = %old_cp, dst = %new_cp, "Renaming checkpoint");
        self.io
            .guard_permissions(None, || self.io.move_file(&old_cp, &new_cp))?;
        Ok(())
    }

    pub fn delete(&self, checkpoint_id: &str, path: &str) -> Result<()> {
        let cp_path = self.existing(checkpoint_id, path)?;
        tracing::debug!(checkpoint = %cp_path, "Deleting checkpoint");
        self.io
            .guard_permissions(Some(&cp_path), || self.io.remove(&cp_path, false))?;
        Ok(())
    }

    fn existing(&self, checkpoint_id: &str, path: &str) -> Result<NormalizedPath> {
        let cp_path = self.locate(checkpoint_id, path);
        if checkpoint_id == CHECKPOINT_ID && self.io.is_file(&cp_path)? {
            Ok(cp_path)
        } else {
            Err(Error::CheckpointNotFound {
                path: normalize_api_path(path),
                checkpoint_id: checkpoint_id.to_string(),
            })
        }
    }

    fn metadata(&self, checkpoint_id: &str, cp_path: &NormalizedPath) -> Result<CheckpointMetadata> {
        let info = self.io.entry_info(cp_path)?;
        Ok(CheckpointMetadata {
            id: checkpoint_id.to_string(),
            last_modified: info.last_modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbstore_test_utils::TestRoot;

    #[test]
    fn checkpoint_names_keep_extension() {
        let root = TestRoot::with_root("/user/alice");
        let store = CheckpointStore::new(Arc::new(root.io()), ".ipynb_checkpoints");

        assert_eq!(
            store.locate(CHECKPOINT_ID, "a/b.ipynb").as_str(),
            "/user/alice/a/.ipynb_checkpoints/b-checkpoint.ipynb"
        );
        assert_eq!(
            store.locate(CHECKPOINT_ID, "/top.tar.gz").as_str(),
            "/user/alice/.ipynb_checkpoints/top.tar-checkpoint.gz"
        );
        assert_eq!(
            store.locate(CHECKPOINT_ID, ".bashrc").as_str(),
            "/user/alice/.ipynb_checkpoints/.bashrc-checkpoint"
        );
    }

    #[test]
    fn locate_does_not_create_directories() {
        let root = TestRoot::new();
        let store = CheckpointStore::new(Arc::new(root.io()), ".ipynb_checkpoints");

        store.list("a.txt").unwrap();

        root.assert_file_not_exists(".ipynb_checkpoints");
    }
}
