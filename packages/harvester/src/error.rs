//! Error types for the harvester.
//!
//! Every pipeline stage reports through `HarvesterError`. Variants carry the
//! dataset kind, year and offending file where one exists, so a failure can be
//! diagnosed without re-running the request.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::DatasetKind;

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    /// Year is not a supported election year for the dataset kind.
    #[error("Invalid year {year} for {kind} data. Supported years: {supported}")]
    InvalidYear {
        kind: DatasetKind,
        year: u16,
        supported: String,
    },

    /// Region code is not a two-letter federation unit or reserved token.
    #[error("Invalid region code: '{0}'. Expected a two-letter code (e.g., SP) or 'all'")]
    InvalidRegion(String),

    /// Encoding label is not known.
    #[error("Unknown encoding: '{0}'. Expected a label such as 'latin1' or 'utf-8'")]
    InvalidEncoding(String),

    /// `BR` names the nationwide file, which per-region requests never read.
    #[error("Region code BR selects the nationwide file; request full-country mode instead")]
    NationwideNeedsFullCountry,

    /// Whole-country archives only exist for some dataset kinds.
    #[error("Full-country mode is not available for {0} data")]
    FullCountryUnsupported(DatasetKind),

    /// HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Archive download failed.
    #[error("Failed to download {kind} archive for {year} from {url}: {message}")]
    Fetch {
        kind: DatasetKind,
        year: u16,
        url: String,
        message: String,
    },

    /// Cached archive is empty or not a ZIP file.
    #[error("Invalid archive {}: {message}", .path.display())]
    InvalidArchive { path: PathBuf, message: String },

    /// Archive could not be unpacked into the working directory.
    #[error("Failed to extract {}: {message}", .path.display())]
    Extraction { path: PathBuf, message: String },

    /// File bytes are malformed in the requested encoding.
    #[error("Cannot decode {} as {encoding}", .file.display())]
    Decode { file: PathBuf, encoding: String },

    /// Delimited text could not be parsed.
    #[error("Failed to parse {}: {source}", .file.display())]
    Csv {
        file: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Region filter matched no files in the archive.
    #[error("No {kind} files for {year} match region filter {filter}")]
    EmptyResult {
        kind: DatasetKind,
        year: u16,
        filter: String,
    },

    /// Row shape differs from the expected schema; the remote format changed.
    #[error(
        "Schema mismatch in {kind} data for {year}: row {row}{} has {found} fields, expected {expected}",
        .file.as_ref().map(|f| format!(" of {f}")).unwrap_or_default()
    )]
    SchemaMismatch {
        kind: DatasetKind,
        year: u16,
        expected: usize,
        found: usize,
        row: usize,
        file: Option<String>,
    },

    /// Export file could not be written.
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;
