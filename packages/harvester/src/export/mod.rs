//! Export of harmonized tables.
//!
//! Each export writes two files named after the dataset and year:
//! - `{kind}_{year}.csv`: comma-separated, header row, UTF-8
//! - `{kind}_{year}.xpt`: SAS Transport v5 with character variables
//!
//! Files are written to a temporary sibling and renamed into place.

pub mod delimited;
pub mod xpt;

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{HarvesterError, Result};
use crate::types::UnifiedTable;
use crate::workspace::ScopedFile;

/// Paths of the files written by [`export_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFiles {
    pub csv: PathBuf,
    pub xpt: PathBuf,
}

/// Write CSV and XPT copies of `table` into `dir`, creating it if needed.
pub fn export_table(table: &UnifiedTable, dir: &Path) -> Result<ExportedFiles> {
    fs::create_dir_all(dir).map_err(|source| HarvesterError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    let stem = format!("{}_{}", table.kind, table.year);
    let csv = dir.join(format!("{stem}.csv"));
    let xpt = dir.join(format!("{stem}.xpt"));

    delimited::write_csv(table, &csv)?;
    xpt::write_xpt(table, &xpt)?;

    tracing::info!(
        csv = %csv.display(),
        xpt = %xpt.display(),
        rows = table.len(),
        "Exported table"
    );
    Ok(ExportedFiles { csv, xpt })
}

/// Write a file through a temporary sibling that is renamed onto `path`.
///
/// Any failure is reported as `Write` for `path`; the temporary file is
/// removed.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let temp = ScopedFile::new(temp_path(path), false);
    write_and_rename(temp.path(), path, write).map_err(|source| HarvesterError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn write_and_rename<F>(temp: &Path, path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let mut writer = BufWriter::new(File::create(temp)?);
    write(&mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;

    // On Windows, rename fails if the destination already exists
    #[cfg(target_os = "windows")]
    if path.exists() {
        fs::remove_file(path)?;
    }
    fs::rename(temp, path)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
