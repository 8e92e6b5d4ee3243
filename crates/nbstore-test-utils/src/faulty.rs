//! [`FaultyFs`]: a backend wrapper that fails on demand.
//!
//! Write faults and lost mkdir races are one-shot. Denials and rename/delete
//! failures hold until [`FaultyFs::clear`].

use std::io::{self, Read, Write};
use std::sync::{Mutex, MutexGuard};

use nbstore_fs::{EntryInfo, FsBackend, LocalFs, NormalizedPath};

#[derive(Debug, Default)]
struct Faults {
    /// One-shot: the next write to this path fails after N bytes.
    write_after: Option<(NormalizedPath, usize)>,
    /// One-shot: another creator takes this path just before our mkdir.
    mkdir_race: Option<(NormalizedPath, Occupant)>,
    /// Paths (and everything under them) that reject mutations.
    denied: Vec<NormalizedPath>,
    fail_renames: bool,
    fail_deletes: bool,
    renames: usize,
}

/// What a concurrent creator leaves at a contested path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    Directory,
    File,
}

/// Wraps [`LocalFs`] and injects failures into its mutations.
#[derive(Debug)]
pub struct FaultyFs {
    inner: LocalFs,
    faults: Mutex<Faults>,
}

impl FaultyFs {
    pub fn new(inner: LocalFs) -> Self {
        Self {
            inner,
            faults: Mutex::new(Faults::default()),
        }
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The next write to `path` accepts `bytes` bytes, then errors.
    pub fn fail_write_after(&self, path: impl Into<NormalizedPath>, bytes: usize) {
        self.faults().write_after = Some((path.into(), bytes));
    }

    /// The next mkdir of `path` loses a race: `occupant` appears there
    /// first, so the backend reports `AlreadyExists`.
    pub fn lose_mkdir_race(&self, path: impl Into<NormalizedPath>, occupant: Occupant) {
        self.faults().mkdir_race = Some((path.into(), occupant));
    }

    /// Reject every mutation of `path` or anything beneath it.
    pub fn deny(&self, path: impl Into<NormalizedPath>) {
        self.faults().denied.push(path.into());
    }

    pub fn fail_renames(&self, fail: bool) {
        self.faults().fail_renames = fail;
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.faults().fail_deletes = fail;
    }

    /// Number of renames that reached the inner backend.
    pub fn rename_count(&self) -> usize {
        self.faults().renames
    }

    pub fn clear(&self) {
        *self.faults() = Faults::default();
    }

    fn check_denied(&self, path: &NormalizedPath) -> io::Result<()> {
        if self.faults().denied.iter().any(|d| path.starts_with(d)) {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("injected permission denial for {}", path),
            ))
        } else {
            Ok(())
        }
    }
}

impl FsBackend for FaultyFs {
    fn exists(&self, path: &NormalizedPath) -> io::Result<bool> {
        self.inner.exists(path)
    }

    fn info(&self, path: &NormalizedPath) -> io::Result<EntryInfo> {
        self.inner.info(path)
    }

    fn open_read(&self, path: &NormalizedPath) -> io::Result<Box<dyn Read + Send>> {
        self.inner.open_read(path)
    }

    fn open_write(&self, path: &NormalizedPath) -> io::Result<Box<dyn Write + Send>> {
        self.check_denied(path)?;
        let limit = {
            let mut faults = self.faults();
            match faults.write_after.take() {
                Some((target, bytes)) if &target == path => Some(bytes),
                other => {
                    faults.write_after = other;
                    None
                }
            }
        };
        let writer = self.inner.open_write(path)?;
        Ok(match limit {
            Some(remaining) => Box::new(FailingWriter {
                inner: writer,
                remaining,
            }),
            None => writer,
        })
    }

    fn list(&self, path: &NormalizedPath) -> io::Result<Vec<String>> {
        self.inner.list(path)
    }

    fn mkdir(&self, path: &NormalizedPath) -> io::Result<()> {
        self.check_denied(path)?;
        let winner = {
            let mut faults = self.faults();
            match faults.mkdir_race.take() {
                Some((target, occupant)) if &target == path => Some(occupant),
                other => {
                    faults.mkdir_race = other;
                    None
                }
            }
        };
        match winner {
            Some(Occupant::Directory) => self.inner.mkdir(path)?,
            Some(Occupant::File) => self.inner.open_write(path)?.write_all(b"taken")?,
            None => {}
        }
        self.inner.mkdir(path)
    }

    fn delete(&self, path: &NormalizedPath, recursive: bool) -> io::Result<()> {
        self.check_denied(path)?;
        if self.faults().fail_deletes {
            return Err(io::Error::other("injected delete failure"));
        }
        self.inner.delete(path, recursive)
    }

    fn rename(&self, src: &NormalizedPath, dst: &NormalizedPath) -> io::Result<()> {
        self.check_denied(src)?;
        self.check_denied(dst)?;
        if self.faults().fail_renames {
            return Err(io::Error::other("injected rename failure"));
        }
        self.inner.rename(src, dst)?;
        self.faults().renames += 1;
        Ok(())
    }

    fn set_permissions(&self, path: &NormalizedPath, mode: u32) -> io::Result<()> {
        self.check_denied(path)?;
        self.inner.set_permissions(path, mode)
    }
}

/// Passes through `remaining` bytes, then fails every write.
struct FailingWriter {
    inner: Box<dyn Write + Send>,
    remaining: usize,
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::other("injected write fault"));
        }
        let n = buf.len().min(self.remaining);
        let written = self.inner.write(&buf[..n])?;
        self.remaining -= written;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
