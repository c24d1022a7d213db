//! Per-region file merging.
//!
//! TSE archives hold one `;`-delimited file per federation unit, named
//! `<prefix>_<YEAR>_<CODE>.txt`, plus an optional nationwide file (`_BR` or
//! `_BRASIL`). The merger picks files by the code in their name, decodes them
//! strictly and concatenates their rows in discovery order.

use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use encoding_rs::Encoding;
use regex::Regex;

use crate::config::MIN_REGION_FILE_BYTES;
use crate::error::{HarvesterError, Result};
use crate::schema::is_header_record;
use crate::types::{DatasetKind, ExtractedFileSet, RegionCode, RegionFilter, UnifiedTable};

/// Data files carry `.txt` or `.csv` extensions.
const DATA_EXTENSIONS: &[&str] = &["txt", "csv"];

/// Region code at the end of a file stem.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static REGION_SUFFIX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)_([a-z]{2}|brasil)$").expect("valid regex"));

/// Merges the selected region files of one archive into a table.
#[derive(Debug, Clone)]
pub struct RegionFileMerger {
    encoding: &'static Encoding,
    min_file_bytes: u64,
}

impl RegionFileMerger {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            encoding,
            min_file_bytes: MIN_REGION_FILE_BYTES,
        }
    }

    /// Skip files whose size is at or below `min_file_bytes`.
    #[must_use]
    pub fn with_min_file_bytes(mut self, min_file_bytes: u64) -> Self {
        self.min_file_bytes = min_file_bytes;
        self
    }

    /// Merge the files of `set` selected by `filter`.
    ///
    /// With `full_country`, only the nationwide file is read and the filter is
    /// ignored. Otherwise the nationwide file is never read.
    ///
    /// # Errors
    /// `EmptyResult` when no file was selected. `Decode` and `Csv` for the
    /// first file that cannot be read.
    pub fn merge(
        &self,
        kind: DatasetKind,
        year: u16,
        set: &ExtractedFileSet,
        filter: &RegionFilter,
        full_country: bool,
    ) -> Result<UnifiedTable> {
        let mut table = UnifiedTable::new(kind, year);

        for path in &set.files {
            if !is_data_file(path) {
                tracing::debug!(file = %path.display(), "Skipping non-data file");
                continue;
            }
            let Some(code) = region_code_of(path) else {
                tracing::debug!(file = %path.display(), "Skipping file without region code");
                continue;
            };

            let selected = if full_country {
                code.is_nationwide()
            } else {
                !code.is_nationwide() && filter.matches(&code)
            };
            if !selected {
                continue;
            }

            let size = fs::metadata(path)?.len();
            if size <= self.min_file_bytes {
                tracing::debug!(file = %path.display(), size, "Skipping placeholder file");
                continue;
            }

            let rows = self.read_rows(path)?;
            tracing::debug!(file = %path.display(), region = %code, rows = rows.len(), "Merged file");
            table.append_file(file_name(path), rows);
        }

        if table.sources.is_empty() {
            let filter = if full_country {
                "nationwide".to_string()
            } else {
                filter.to_string()
            };
            return Err(HarvesterError::EmptyResult { kind, year, filter });
        }

        tracing::info!(
            kind = %kind,
            year,
            files = table.sources.len(),
            rows = table.len(),
            "Merged region files"
        );
        Ok(table)
    }

    /// Decode and parse one file.
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>> {
        let bytes = fs::read(path)?;
        let text = self.decode(path, &bytes)?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| HarvesterError::Csv {
                file: path.to_path_buf(),
                source,
            })?;
            rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        if rows.first().is_some_and(|row| is_header_record(row)) {
            rows.remove(0);
        }
        Ok(rows)
    }

    /// Strict decode. A byte order mark for the same encoding is stripped.
    fn decode<'b>(&self, path: &Path, bytes: &'b [u8]) -> Result<Cow<'b, str>> {
        let body = match Encoding::for_bom(bytes) {
            Some((encoding, bom_len)) if encoding == self.encoding => &bytes[bom_len..],
            _ => bytes,
        };

        self.encoding
            .decode_without_bom_handling_and_without_replacement(body)
            .ok_or_else(|| HarvesterError::Decode {
                file: path.to_path_buf(),
                encoding: self.encoding.name().to_string(),
            })
    }
}

/// Region code encoded in a file name, if any.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use urna_harvester::merge::region_code_of;
///
/// let code = region_code_of(Path::new("consulta_vagas_2020_sp.txt")).unwrap();
/// assert_eq!(code.as_str(), "SP");
/// assert!(region_code_of(Path::new("LEIAME.txt")).is_none());
/// ```
pub fn region_code_of(path: &Path) -> Option<RegionCode> {
    let stem = path.file_stem()?.to_str()?;
    let captures = REGION_SUFFIX_PATTERN.captures(stem)?;
    captures.get(1).map(|m| RegionCode::new(m.as_str()))
}

fn is_data_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            DATA_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
