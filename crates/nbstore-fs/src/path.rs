//! Path handling: normalized backend paths and API path translation

use std::path::{Path, PathBuf};

/// A backend path normalized to forward slashes.
///
/// Repeated slashes and `.` segments are collapsed, `..` segments are
/// resolved lexically and never climb above the first segment. A leading
/// `/` is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().to_string_lossy();
        Self {
            inner: clean(&path_str.replace('\\', "/")),
        }
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    pub fn is_absolute(&self) -> bool {
        self.inner.starts_with('/')
    }

    /// Join this path with a segment.
    ///
    /// Joining an empty segment returns the path unchanged.
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.replace('\\', "/");
        let segment = segment.trim_start_matches('/');
        if segment.is_empty() {
            return self.clone();
        }
        let joined = if self.inner.is_empty() {
            segment.to_string()
        } else {
            format!("{}/{}", self.inner, segment)
        };
        let joined = Self {
            inner: clean(&joined),
        };
        // `..` in the segment must not escape this path.
        if joined.starts_with(self) {
            joined
        } else {
            self.clone()
        }
    }

    /// Get the parent directory.
    pub fn parent(&self) -> Option<Self> {
        match self.inner.rfind('/') {
            Some(0) if self.inner.len() > 1 => Some(Self {
                inner: "/".to_string(),
            }),
            Some(0) => None,
            Some(idx) => Some(Self {
                inner: self.inner[..idx].to_string(),
            }),
            None if self.inner.is_empty() => None,
            None => Some(Self {
                inner: String::new(),
            }),
        }
    }

    /// Get the file name component.
    pub fn file_name(&self) -> Option<&str> {
        self.inner.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Replace the file name component.
    pub fn with_file_name(&self, name: &str) -> Self {
        match self.parent() {
            Some(parent) => parent.join(name),
            None => Self::new(name),
        }
    }

    /// Split the file name into stem and extension.
    ///
    /// The extension keeps its leading dot. Leading dots of the name are
    /// not extension separators, so `.bashrc` has no extension.
    pub fn split_extension(&self) -> (&str, &str) {
        let name = self.file_name().unwrap_or("");
        let leading = name.len() - name.trim_start_matches('.').len();
        match name[leading..].rfind('.') {
            Some(idx) => name.split_at(leading + idx),
            None => (name, ""),
        }
    }

    /// Get the extension if present, without the leading dot.
    pub fn extension(&self) -> Option<&str> {
        let (_, ext) = self.split_extension();
        ext.strip_prefix('.')
    }

    /// Whether `self` is `other` or lies beneath it.
    pub fn starts_with(&self, other: &NormalizedPath) -> bool {
        match other.inner.as_str() {
            "/" => return self.is_absolute(),
            "" => return !self.is_absolute(),
            _ => {}
        }
        self.inner == other.inner
            || self
                .inner
                .strip_prefix(other.inner.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

fn clean(raw: &str) -> String {
    let absolute = raw.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in raw.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    let body = parts.join("/");
    if absolute {
        format!("/{}", body)
    } else {
        body
    }
}

/// Normalize an API path: strip surrounding slashes and clean segments.
pub fn normalize_api_path(path: &str) -> String {
    clean(path.trim_matches('/'))
}

/// Pure, invertible translation between API paths and backend paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapper {
    root: NormalizedPath,
}

impl PathMapper {
    /// Create a mapper rooted at `root`. Relative roots are anchored at `/`.
    pub fn new(root: impl Into<NormalizedPath>) -> Self {
        let root = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            NormalizedPath::new(format!("/{}", root.as_str()))
        };
        Self { root }
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    /// Map an API path onto the backend.
    pub fn to_backend(&self, api_path: &str) -> NormalizedPath {
        self.root.join(&normalize_api_path(api_path))
    }

    /// Map a backend path back to its API path.
    ///
    /// Paths outside the root are reported by file name only, so the
    /// server layout never leaks to callers.
    pub fn to_api(&self, backend_path: &NormalizedPath) -> String {
        if backend_path.starts_with(&self.root) {
            let rest = &backend_path.as_str()[self.root.as_str().len()..];
            rest.trim_matches('/').to_string()
        } else {
            backend_path.file_name().unwrap_or_default().to_string()
        }
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

impl From<&NormalizedPath> for NormalizedPath {
    fn from(p: &NormalizedPath) -> Self {
        p.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_mapper_round_trips() {
        let mapper = PathMapper::new("/");
        let backend = mapper.to_backend("/a/b.ipynb/");
        assert_eq!(backend.as_str(), "/a/b.ipynb");
        assert_eq!(mapper.to_api(&backend), "a/b.ipynb");
    }

    #[test]
    fn empty_api_path_is_root() {
        let mapper = PathMapper::new("/user/alice");
        assert_eq!(mapper.to_backend("").as_str(), "/user/alice");
        assert_eq!(mapper.to_api(mapper.root()), "");
    }

    #[test]
    fn split_extension_ignores_leading_dots() {
        assert_eq!(NormalizedPath::new("/a/.bashrc").split_extension(), (".bashrc", ""));
        assert_eq!(NormalizedPath::new("/a/b.tar.gz").split_extension(), ("b.tar", ".gz"));
        assert_eq!(NormalizedPath::new("/a/Makefile").split_extension(), ("Makefile", ""));
    }
}
