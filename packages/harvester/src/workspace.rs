//! Request-scoped files and directories.
//!
//! Guards are created before the stage that fills them, so a failing stage
//! still releases what it left on disk when the guard goes out of scope.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A directory removed on drop.
#[derive(Debug)]
pub struct ScopedDir {
    path: PathBuf,
}

impl ScopedDir {
    /// Create an empty directory at `path`.
    ///
    /// Anything already at `path` (typically left by an interrupted run for the
    /// same year) is removed first.
    pub fn create_fresh(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        remove_path(&path)?;
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedDir {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed working directory"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove working directory"
            ),
        }
    }
}

/// A file removed on drop unless it is marked as kept.
#[derive(Debug)]
pub struct ScopedFile {
    path: PathBuf,
    keep: bool,
}

impl ScopedFile {
    /// Guard `path`. The file does not need to exist yet.
    pub fn new(path: impl Into<PathBuf>, keep: bool) -> Self {
        Self {
            path: path.into(),
            keep,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file survives the guard.
    pub fn is_kept(&self) -> bool {
        self.keep
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed temporary file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove temporary file"
            ),
        }
    }
}

/// Remove a file or directory tree, ignoring a missing path.
fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    tracing::debug!(path = %path.display(), "Removing stale path");
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
