//! Hooks into the document service's notebook machinery.
//!
//! Trust signing, schema validation and pre-save transforms belong to the
//! document service. The store calls them through [`DocumentHooks`] at fixed
//! points of `get` and `save`.

use nbstore_fs::Notebook;
use serde_json::Value;

use crate::{Result, SaveModel};

/// Latest notebook format major version.
pub const CURRENT_NBFORMAT: u64 = 4;

/// Callbacks run by [`DocumentStore`](crate::DocumentStore).
pub trait DocumentHooks: Send + Sync + std::fmt::Debug {
    /// Runs before anything is written. May rewrite the model.
    fn pre_save(&self, _model: &mut SaveModel, _path: &str) -> Result<()> {
        Ok(())
    }

    /// Marks cells of a freshly read notebook as trusted or not.
    fn mark_trusted(&self, _notebook: &mut Notebook, _path: &str) {}

    /// Signs a notebook about to be saved if it is trusted.
    fn sign_if_trusted(&self, _notebook: &Notebook, _path: &str) {}

    /// Returns a validation message, or `None` when the notebook is valid.
    /// Validation problems never fail the operation.
    fn validate(&self, notebook: &Notebook) -> Option<String> {
        minimal_validation(notebook)
    }
}

/// Hooks that change nothing and only check the minimal notebook structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl DocumentHooks for NoopHooks {}

fn minimal_validation(notebook: &Notebook) -> Option<String> {
    let (major, minor) = notebook.version();
    if major != CURRENT_NBFORMAT {
        return Some(format!(
            "Notebook format {}.{} is not the current format {}",
            major, minor, CURRENT_NBFORMAT
        ));
    }
    notebook
        .cells()
        .iter()
        .position(|cell| !cell.get("cell_type").is_some_and(Value::is_string))
        .map(|idx| format!("Cell {} has no cell_type", idx))
}
