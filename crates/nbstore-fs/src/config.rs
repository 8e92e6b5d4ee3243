//! Store configuration and format-agnostic config loading

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::constants::DEFAULT_CHECKPOINT_DIR;
use crate::{Error, Result, WriteMode};

/// Connection parameters handed through to the backend client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9000,
            user: None,
        }
    }
}

/// Settings for a document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend directory that API paths are resolved against.
    pub root_dir: String,
    /// Back up and restore on failed writes. Disable only for backends
    /// without ordered rename.
    pub use_atomic_writing: bool,
    /// Per-directory subdirectory holding checkpoints.
    pub checkpoint_dir: String,
    /// Names matching these shell-style globs are left out of listings.
    pub hide_globs: Vec<String>,
    pub backend: BackendConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_dir: "/".to_string(),
            use_atomic_writing: true,
            checkpoint_dir: DEFAULT_CHECKPOINT_DIR.to_string(),
            hide_globs: [
                "__pycache__",
                "*.pyc",
                "*.pyo",
                ".DS_Store",
                "*.so",
                "*.dylib",
                "*~",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            backend: BackendConfig::default(),
        }
    }
}

impl StoreConfig {
    pub fn write_mode(&self) -> WriteMode {
        if self.use_atomic_writing {
            WriteMode::Atomic
        } else {
            WriteMode::Direct
        }
    }
}

/// Format-agnostic configuration files on the host.
///
/// The format is chosen by file extension: `.toml`, `.json`, `.yaml`/`.yml`.
#[derive(Debug, Default)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a file.
    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let parse_err = |format: &str, message: String| Error::ConfigParse {
            path: path.to_path_buf(),
            format: format.into(),
            message,
        };

        match extension(path).as_str() {
            "toml" => toml::from_str(&content).map_err(|e| parse_err("TOML", e.to_string())),
            "json" => serde_json::from_str(&content).map_err(|e| parse_err("JSON", e.to_string())),
            "yaml" | "yml" => {
                serde_yaml::from_str(&content).map_err(|e| parse_err("YAML", e.to_string()))
            }
            other => Err(Error::UnsupportedFormat {
                extension: other.to_string(),
            }),
        }
    }

    /// Save configuration to a file.
    ///
    /// Writes a temporary sibling and renames it over the target.
    pub fn save<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let serialize_err = |format: &str, message: String| Error::ConfigSerialize {
            path: path.to_path_buf(),
            format: format.into(),
            message,
        };

        let content = match extension(path).as_str() {
            "toml" => {
                toml::to_string_pretty(value).map_err(|e| serialize_err("TOML", e.to_string()))?
            }
            "json" => serde_json::to_string_pretty(value)
                .map_err(|e| serialize_err("JSON", e.to_string()))?,
            "yaml" | "yml" => {
                serde_yaml::to_string(value).map_err(|e| serialize_err("YAML", e.to_string()))?
            }
            other => {
                return Err(Error::UnsupportedFormat {
                    extension: other.to_string(),
                });
            }
        };

        let temp_name = format!(
            ".{}.{}.tmp",
            path.file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default(),
            std::process::id()
        );
        let temp_path = path.with_file_name(&temp_name);

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| Error::io(temp_path.as_path(), e))?;
        temp_file
            .write_all(content.as_bytes())
            .and_then(|()| temp_file.sync_all())
            .map_err(|e| Error::io(temp_path.as_path(), e))?;
        fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
