//! Archive downloading.
//!
//! The body is streamed into a `.part` file next to the target and renamed
//! onto it only after it opens as a ZIP archive, so the target path never holds
//! a truncated download.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;

use crate::error::{HarvesterError, Result};
use crate::http::download_to;
use crate::types::{ArchiveDescriptor, DatasetKind};
use crate::workspace::ScopedFile;

/// How the archive ended up on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Downloaded in this call.
    Downloaded { bytes: u64 },

    /// A valid archive from an earlier cached request was reused.
    Cached,
}

/// Downloads one archive per call.
#[derive(Debug)]
pub struct ArchiveFetcher<'a> {
    client: &'a Client,
    max_bytes: u64,
}

impl<'a> ArchiveFetcher<'a> {
    pub fn new(client: &'a Client, max_bytes: u64) -> Self {
        Self { client, max_bytes }
    }

    /// Fetch the archive described by `descriptor` into `target`.
    ///
    /// With `keep_cache`, an existing valid archive at `target` is reused
    /// without a request. A corrupt cached file is downloaded again.
    pub fn fetch(
        &self,
        kind: DatasetKind,
        descriptor: &ArchiveDescriptor,
        target: &Path,
        keep_cache: bool,
    ) -> Result<FetchOutcome> {
        if keep_cache && target.is_file() {
            match verify_archive(target) {
                Ok(()) => {
                    tracing::info!(path = %target.display(), "Using cached archive");
                    return Ok(FetchOutcome::Cached);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Cached archive is unusable, downloading again");
                }
            }
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let url = descriptor.url();
        let part = ScopedFile::new(part_path(target), false);
        tracing::info!(url = %url, "Downloading archive");

        let bytes = {
            let file = File::create(part.path())?;
            let mut writer = BufWriter::new(file);
            let bytes = download_to(self.client, &url, &mut writer, self.max_bytes).map_err(
                |e| HarvesterError::Fetch {
                    kind,
                    year: descriptor.year,
                    url: url.clone(),
                    message: e.to_string(),
                },
            )?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
            bytes
        };

        verify_archive(part.path()).map_err(|e| match e {
            HarvesterError::InvalidArchive { message, .. } => HarvesterError::Fetch {
                kind,
                year: descriptor.year,
                url: url.clone(),
                message: format!("not a ZIP archive: {message}"),
            },
            other => other,
        })?;

        // On Windows, rename fails if the destination already exists
        #[cfg(target_os = "windows")]
        if target.exists() {
            fs::remove_file(target)?;
        }
        fs::rename(part.path(), target)?;

        Ok(FetchOutcome::Downloaded { bytes })
    }
}

/// Check that a file is a non-empty ZIP archive with at least one entry.
///
/// Reports `InvalidArchive`; a fresh download that fails the check is
/// reported by [`ArchiveFetcher::fetch`] as `Fetch`.
pub fn verify_archive(path: &Path) -> Result<()> {
    let invalid = |message: String| HarvesterError::InvalidArchive {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(invalid("archive is empty".to_string()));
    }

    let archive = zip::ZipArchive::new(file).map_err(|e| invalid(e.to_string()))?;
    if archive.is_empty() {
        return Err(invalid("archive has no entries".to_string()));
    }
    Ok(())
}

/// Sibling path the body is streamed into.
fn part_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}
