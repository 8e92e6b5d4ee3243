//! Notebook documents as stored on the backend.
//!
//! The notebook schema itself belongs to the document service; this module
//! only checks the minimal structure needed to tell a notebook from garbage
//! and produces the canonical on-disk form.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Write;

/// Errors raised while parsing a notebook.
#[derive(Debug, thiserror::Error)]
pub enum NotebookError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not a notebook: {0}")]
    Structure(String),
}

/// A parsed notebook document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Notebook(Value);

impl Notebook {
    /// Wrap a JSON value, checking that it looks like a notebook.
    ///
    /// A notebook is an object with an integer `nbformat` and a `cells`
    /// array. A missing `metadata` object is filled in.
    pub fn from_value(value: Value) -> Result<Self, NotebookError> {
        let Value::Object(mut map) = value else {
            return Err(NotebookError::Structure("top level is not an object".into()));
        };
        if !map.get("nbformat").is_some_and(Value::is_u64) {
            return Err(NotebookError::Structure("missing integer nbformat".into()));
        }
        if !map.get("cells").is_some_and(Value::is_array) {
            return Err(NotebookError::Structure("missing cells array".into()));
        }
        map.entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        Ok(Self(Value::Object(map)))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, NotebookError> {
        Self::from_value(serde_json::from_slice(bytes)?)
    }

    /// Write the canonical form: sorted keys, one-space indent, trailing
    /// newline.
    pub fn write_canonical<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut ser = serde_json::Serializer::with_formatter(&mut *writer, formatter);
        self.0.serialize(&mut ser)?;
        writer.write_all(b"\n")
    }

    pub fn to_canonical_string(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_canonical(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// `(nbformat, nbformat_minor)`.
    pub fn version(&self) -> (u64, u64) {
        let major = self.0.get("nbformat").and_then(Value::as_u64).unwrap_or(0);
        let minor = self
            .0
            .get("nbformat_minor")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        (major, minor)
    }

    pub fn cells(&self) -> &[Value] {
        self.0
            .get("cells")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn cells_mut(&mut self) -> Option<&mut Vec<Value>> {
        self.0.get_mut("cells").and_then(Value::as_array_mut)
    }

    pub fn metadata_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.0.get_mut("metadata").and_then(Value::as_object_mut)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}
