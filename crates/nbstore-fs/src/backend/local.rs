//! Backend binding onto a directory of the host filesystem.

use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use super::{EntryInfo, EntryKind, FsBackend};
use crate::NormalizedPath;

/// Serves backend paths from a host directory.
///
/// Backend path `/a/b` maps to `<host_root>/a/b`. Used for single-host
/// deployments and throughout the test suites.
#[derive(Debug, Clone)]
pub struct LocalFs {
    host_root: PathBuf,
}

impl LocalFs {
    pub fn new(host_root: impl Into<PathBuf>) -> Self {
        Self {
            host_root: host_root.into(),
        }
    }

    /// Like [`LocalFs::new`] but canonicalizes the host root first.
    pub fn open(host_root: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(dunce::canonicalize(host_root)?))
    }

    pub fn host_root(&self) -> &Path {
        &self.host_root
    }

    /// Host path backing a backend path.
    pub fn native(&self, path: &NormalizedPath) -> PathBuf {
        let relative = path.as_str().trim_start_matches('/');
        if relative.is_empty() {
            self.host_root.clone()
        } else {
            self.host_root.join(relative)
        }
    }
}

impl FsBackend for LocalFs {
    fn exists(&self, path: &NormalizedPath) -> io::Result<bool> {
        self.native(path).try_exists()
    }

    fn info(&self, path: &NormalizedPath) -> io::Result<EntryInfo> {
        let meta = fs::metadata(self.native(path))?;
        let kind = if meta.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let last_modified: DateTime<Utc> = meta.modified()?.into();
        let last_accessed = meta
            .accessed()
            .map(DateTime::<Utc>::from)
            .unwrap_or(last_modified);
        Ok(EntryInfo {
            kind,
            last_modified,
            last_accessed,
            permissions: permission_bits(&meta),
        })
    }

    fn open_read(&self, path: &NormalizedPath) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(self.native(path))?))
    }

    fn open_write(&self, path: &NormalizedPath) -> io::Result<Box<dyn Write + Send>> {
        let native = self.native(path);
        if let Some(parent) = native.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Box::new(File::create(native)?))
    }

    fn list(&self, path: &NormalizedPath) -> io::Result<Vec<String>> {
        fs::read_dir(self.native(path))?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect()
    }

    fn mkdir(&self, path: &NormalizedPath) -> io::Result<()> {
        fs::create_dir(self.native(path))
    }

    fn delete(&self, path: &NormalizedPath, recursive: bool) -> io::Result<()> {
        let native = self.native(path);
        if fs::symlink_metadata(&native)?.is_dir() {
            if recursive {
                fs::remove_dir_all(native)
            } else {
                fs::remove_dir(native)
            }
        } else {
            fs::remove_file(native)
        }
    }

    fn rename(&self, src: &NormalizedPath, dst: &NormalizedPath) -> io::Result<()> {
        fs::rename(self.native(src), self.native(dst))
    }

    fn set_permissions(&self, path: &NormalizedPath, mode: u32) -> io::Result<()> {
        let native = self.native(path);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(native, fs::Permissions::from_mode(mode))
        }
        #[cfg(not(unix))]
        {
            let mut perms = fs::metadata(&native)?.permissions();
            perms.set_readonly(mode & crate::constants::OWNER_WRITE_BIT == 0);
            fs::set_permissions(native, perms)
        }
    }
}

#[cfg(unix)]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}
