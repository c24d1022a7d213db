//! Archive extraction into a year-scoped working directory.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::{HarvesterError, Result};
use crate::types::ExtractedFileSet;
use crate::workspace::ScopedDir;

/// Unpack `archive` into `dir` and list the regular files it produced.
///
/// Anything already at `dir` is removed first. The returned guard removes the
/// directory when dropped; it is created before the first entry is written, so
/// a failed extraction leaves nothing behind.
///
/// File contents are not interpreted.
pub fn extract_archive(archive: &Path, dir: &Path) -> Result<(ScopedDir, ExtractedFileSet)> {
    let guard = ScopedDir::create_fresh(dir).map_err(|e| HarvesterError::Extraction {
        path: dir.to_path_buf(),
        message: format!("cannot prepare working directory: {e}"),
    })?;

    let extraction_error = |message: String| HarvesterError::Extraction {
        path: archive.to_path_buf(),
        message,
    };

    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file).map_err(|e| extraction_error(e.to_string()))?;

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| extraction_error(format!("entry {i}: {e}")))?;

        let Some(relative) = entry.enclosed_name() else {
            return Err(extraction_error(format!(
                "entry '{}' escapes the extraction directory",
                entry.name()
            )));
        };
        let out_path = guard.path().join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)
            .map_err(|e| extraction_error(format!("entry '{}': {e}", entry.name())))?;
    }

    let files = discover_files(guard.path())?;
    tracing::info!(
        dir = %guard.path().display(),
        files = files.len(),
        "Extracted archive"
    );

    let file_set = ExtractedFileSet {
        root: guard.path().to_path_buf(),
        files,
    };
    Ok((guard, file_set))
}

/// Regular files below `root`, sorted by path.
pub fn discover_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| HarvesterError::Extraction {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
