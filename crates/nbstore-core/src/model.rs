//! Document models exchanged with the document service
//!
//! A [`Model`] describes one entry (file, notebook or directory) with its
//! metadata and, when requested, its content. [`SaveModel`] is the loosely
//! typed input to a save: every field is optional so that incomplete
//! requests can be rejected with a precise error.

use chrono::{DateTime, Utc};
use nbstore_fs::{FileFormat, Notebook};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// The `type` of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    File,
    Notebook,
    Directory,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Notebook => "notebook",
            Self::Directory => "directory",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(Self::File),
            "notebook" => Ok(Self::Notebook),
            "directory" => Ok(Self::Directory),
            other => Err(Error::InvalidArgument {
                message: format!("Unhandled contents type: {}", other),
            }),
        }
    }
}

/// Encoding of `content` in a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Text,
    Base64,
    Json,
}

impl From<FileFormat> for Format {
    fn from(format: FileFormat) -> Self {
        match format {
            FileFormat::Text => Self::Text,
            FileFormat::Base64 => Self::Base64,
        }
    }
}

/// Content carried by a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// File content, either text or base64 depending on `format`.
    Text(String),
    /// Directory listing of content-free child models.
    Directory(Vec<Model>),
    Notebook(Notebook),
}

/// Metadata and optional content of one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub last_modified: DateTime<Utc>,
    /// The backend exposes no creation time; this holds the last access time.
    pub created: DateTime<Utc>,
    pub content: Option<Content>,
    pub format: Option<Format>,
    pub mimetype: Option<String>,
    pub writable: bool,
    /// Validation message for notebooks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Model {
    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    /// Text or base64 payload of a file model.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Some(Content::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn notebook(&self) -> Option<&Notebook> {
        match &self.content {
            Some(Content::Notebook(nb)) => Some(nb),
            _ => None,
        }
    }

    /// Child models of a directory model.
    pub fn children(&self) -> Option<&[Model]> {
        match &self.content {
            Some(Content::Directory(children)) => Some(children),
            _ => None,
        }
    }
}

/// Input to a save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveModel {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub format: Option<String>,
}

impl SaveModel {
    pub fn notebook(notebook: &Notebook) -> Self {
        Self {
            kind: Some(ContentKind::Notebook.to_string()),
            content: Some(notebook.as_value().clone()),
            format: Some("json".into()),
        }
    }

    pub fn file(content: impl Into<String>, format: FileFormat) -> Self {
        Self {
            kind: Some(ContentKind::File.to_string()),
            content: Some(Value::String(content.into())),
            format: Some(format.to_string()),
        }
    }

    pub fn directory() -> Self {
        Self {
            kind: Some(ContentKind::Directory.to_string()),
            ..Self::default()
        }
    }
}

/// A stored checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub id: String,
    pub last_modified: DateTime<Utc>,
}
