//! [`TestRoot`] fixture for store test scenarios.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nbstore_fs::{DurableIo, LocalFs, NormalizedPath, StoreConfig};
use tempfile::TempDir;

use crate::FaultyFs;

/// A temporary host directory served as a backend, with helpers for setup
/// and assertions addressed by API path.
///
/// # Example
///
/// ```rust,no_run
/// use nbstore_test_utils::TestRoot;
///
/// let root = TestRoot::with_root("/user/alice");
/// root.write("notes.txt", "hello");
/// let io = root.io();
/// root.assert_file_contains("notes.txt", "hello");
/// ```
pub struct TestRoot {
    temp_dir: TempDir,
    root_dir: String,
}

impl Default for TestRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRoot {
    /// Serve the whole temporary directory, backend root `/`.
    pub fn new() -> Self {
        Self::with_root("/")
    }

    /// Serve API paths from `root_dir` inside the temporary directory.
    pub fn with_root(root_dir: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = Self {
            temp_dir,
            root_dir: NormalizedPath::new(root_dir).as_str().to_string(),
        };
        fs::create_dir_all(root.host_root()).unwrap();
        root
    }

    /// Backend root API paths resolve against.
    pub fn root_dir(&self) -> &str {
        &self.root_dir
    }

    /// Host directory holding the backend path `/`.
    pub fn mount(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Host directory holding the store root.
    pub fn host_root(&self) -> PathBuf {
        self.host_path("")
    }

    /// Host path of an API path.
    pub fn host_path(&self, api_path: &str) -> PathBuf {
        let backend = NormalizedPath::new(&self.root_dir).join(api_path.trim_matches('/'));
        let relative = backend.as_str().trim_start_matches('/');
        if relative.is_empty() {
            self.mount().to_path_buf()
        } else {
            self.mount().join(relative)
        }
    }

    pub fn backend(&self) -> LocalFs {
        LocalFs::new(self.mount())
    }

    pub fn config(&self) -> StoreConfig {
        StoreConfig {
            root_dir: self.root_dir.clone(),
            ..StoreConfig::default()
        }
    }

    /// Durable I/O over the plain host backend.
    pub fn io(&self) -> DurableIo {
        DurableIo::from_config(Arc::new(self.backend()), &self.config())
    }

    /// Durable I/O over a [`FaultyFs`], returned alongside for arming faults.
    pub fn faulty_io(&self) -> (Arc<FaultyFs>, DurableIo) {
        let faulty = Arc::new(FaultyFs::new(self.backend()));
        let io = DurableIo::from_config(faulty.clone(), &self.config());
        (faulty, io)
    }

    /// Write a file at an API path, creating parents.
    pub fn write(&self, api_path: &str, content: impl AsRef<[u8]>) {
        let path = self.host_path(api_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn mkdir(&self, api_path: &str) {
        fs::create_dir_all(self.host_path(api_path)).unwrap();
    }

    pub fn read(&self, api_path: &str) -> Vec<u8> {
        let path = self.host_path(api_path);
        fs::read(&path).unwrap_or_else(|_| panic!("Could not read file: {}", path.display()))
    }

    pub fn read_to_string(&self, api_path: &str) -> String {
        String::from_utf8(self.read(api_path)).unwrap()
    }

    pub fn exists(&self, api_path: &str) -> bool {
        self.host_path(api_path).exists()
    }

    /// Names in a directory, sorted.
    pub fn list(&self, api_path: &str) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.host_path(api_path))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Assert that `api_path` exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, api_path: &str) {
        let full_path = self.host_path(api_path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `api_path` does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, api_path: &str) {
        let full_path = self.host_path(api_path);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }

    /// Assert that the file at `api_path` contains `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or does not contain `content`.
    pub fn assert_file_contains(&self, api_path: &str, content: &str) {
        let file_content = self.read_to_string(api_path);
        assert!(
            file_content.contains(content),
            "File {} does not contain expected content.\nExpected: {}\nActual: {}",
            api_path,
            content,
            file_content
        );
    }
}
