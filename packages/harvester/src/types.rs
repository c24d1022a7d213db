//! Core data types for the harvester.
//!
//! These types describe a request for one year of TSE data and the table
//! reconstructed from its archive.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_ENCODING;
use crate::export::ExportedFiles;

/// Administrative dataset published by the TSE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatasetKind {
    /// Party and coalition legends (`consulta_legendas` / `consulta_coligacao`).
    Legend,

    /// Seats in dispute per office and electoral unit (`consulta_vagas`).
    Seats,
}

/// Years with a `consulta_legendas` or `consulta_coligacao` archive.
const LEGEND_YEARS: &[u16] = &[
    1994, 1996, 1998, 2000, 2002, 2004, 2006, 2008, 2010, 2012, 2014, 2016, 2018, 2020, 2022,
];

/// Years with a `consulta_vagas` archive. Currently the same elections as
/// [`LEGEND_YEARS`]; the tables are kept apart so one kind can gain or drop a
/// year without touching the other.
const SEATS_YEARS: &[u16] = &[
    1994, 1996, 1998, 2000, 2002, 2004, 2006, 2008, 2010, 2012, 2014, 2016, 2018, 2020, 2022,
];

impl DatasetKind {
    /// Get the lowercase name used in file names and messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legend => "legend",
            Self::Seats => "seats",
        }
    }

    /// Election years for which the TSE publishes this dataset.
    #[must_use]
    pub fn supported_years(&self) -> &'static [u16] {
        match self {
            Self::Legend => LEGEND_YEARS,
            Self::Seats => SEATS_YEARS,
        }
    }

    /// First year whose archives are known to be complete.
    ///
    /// Older archives exist but may be missing states or offices.
    #[must_use]
    pub fn complete_since(&self) -> u16 {
        match self {
            Self::Legend => 2002,
            Self::Seats => 1998,
        }
    }

    /// Whether the archive ships a single nationwide file.
    #[must_use]
    pub fn supports_full_country(&self) -> bool {
        matches!(self, Self::Legend)
    }

    /// Check whether a year is published for this dataset.
    #[must_use]
    pub fn is_supported_year(&self, year: u16) -> bool {
        self.supported_years().contains(&year)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Region tokens that do not name a federation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedRegion {
    /// `BR`: the whole country.
    Country,

    /// `ZZ`: voting abroad.
    Overseas,

    /// `VT`: absentee / justified-vote records.
    Absentee,
}

impl ReservedRegion {
    /// The token as it appears in the source files.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Country => "BR",
            Self::Overseas => "ZZ",
            Self::Absentee => "VT",
        }
    }
}

/// A region code as found in file names and data rows.
///
/// Codes are kept as opaque upper-case tokens; reserved values are never
/// mapped to a federation unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionCode(String);

impl RegionCode {
    /// Create a region code, normalizing case and surrounding whitespace.
    #[must_use]
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_uppercase())
    }

    /// The normalized code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The reserved meaning of this code, if any.
    #[must_use]
    pub fn reserved(&self) -> Option<ReservedRegion> {
        match self.0.as_str() {
            "BR" => Some(ReservedRegion::Country),
            "ZZ" => Some(ReservedRegion::Overseas),
            "VT" => Some(ReservedRegion::Absentee),
            _ => None,
        }
    }

    /// Whether a file carrying this code holds the whole country.
    ///
    /// Archives use `BR` up to 2016 and `BRASIL` afterwards.
    #[must_use]
    pub fn is_nationwide(&self) -> bool {
        matches!(self.0.as_str(), "BR" | "BRASIL")
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which per-region files to merge.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RegionFilter {
    /// Every per-region file in the archive.
    #[default]
    All,

    /// Only the listed codes.
    Only(BTreeSet<RegionCode>),
}

impl RegionFilter {
    /// Build a filter from user-supplied codes.
    ///
    /// The literal `all` (any case) anywhere in the input selects every region.
    /// An empty input also selects every region.
    ///
    /// # Examples
    /// ```
    /// use urna_harvester::types::RegionFilter;
    ///
    /// assert_eq!(RegionFilter::from_codes(["all"]), RegionFilter::All);
    /// assert_eq!(RegionFilter::from_codes(["sp", "RJ"]).to_string(), "[RJ, SP]");
    /// ```
    #[must_use]
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for code in codes {
            let code = code.as_ref().trim();
            if code.eq_ignore_ascii_case("all") {
                return Self::All;
            }
            if !code.is_empty() {
                set.insert(RegionCode::new(code));
            }
        }
        if set.is_empty() {
            Self::All
        } else {
            Self::Only(set)
        }
    }

    /// Check whether a file's region code passes the filter.
    #[must_use]
    pub fn matches(&self, code: &RegionCode) -> bool {
        match self {
            Self::All => true,
            Self::Only(codes) => codes.contains(code),
        }
    }
}

impl fmt::Display for RegionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(codes) => {
                let joined: Vec<&str> = codes.iter().map(RegionCode::as_str).collect();
                write!(f, "[{}]", joined.join(", "))
            }
        }
    }
}

/// One call's worth of parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRequest {
    /// Dataset to fetch.
    pub kind: DatasetKind,

    /// Election year.
    pub year: u16,

    /// Per-region files to merge.
    pub regions: RegionFilter,

    /// Read the single nationwide file instead of per-region files.
    pub full_country: bool,

    /// Encoding label of the source files.
    pub encoding: String,

    /// Keep the downloaded archive for later requests.
    pub keep_cache: bool,

    /// Fold text fields to plain ASCII.
    pub transliterate: bool,

    /// Write CSV and XPT copies of the result.
    pub export: bool,
}

impl DatasetRequest {
    /// Create a request with default options (all regions, Latin-1, no cache).
    #[must_use]
    pub fn new(kind: DatasetKind, year: u16) -> Self {
        Self {
            kind,
            year,
            regions: RegionFilter::All,
            full_country: false,
            encoding: DEFAULT_ENCODING.to_string(),
            keep_cache: false,
            transliterate: false,
            export: false,
        }
    }

    /// Request legend data for a year.
    #[must_use]
    pub fn legend(year: u16) -> Self {
        Self::new(DatasetKind::Legend, year)
    }

    /// Request seat-count data for a year.
    #[must_use]
    pub fn seats(year: u16) -> Self {
        Self::new(DatasetKind::Seats, year)
    }

    #[must_use]
    pub fn with_regions(mut self, regions: RegionFilter) -> Self {
        self.regions = regions;
        self
    }

    #[must_use]
    pub fn with_full_country(mut self, full_country: bool) -> Self {
        self.full_country = full_country;
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    #[must_use]
    pub fn with_keep_cache(mut self, keep_cache: bool) -> Self {
        self.keep_cache = keep_cache;
        self
    }

    #[must_use]
    pub fn with_transliterate(mut self, transliterate: bool) -> Self {
        self.transliterate = transliterate;
        self
    }

    #[must_use]
    pub fn with_export(mut self, export: bool) -> Self {
        self.export = export;
        self
    }
}

/// Where to download an archive from and what to call it locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDescriptor {
    /// URL with a `{year}` placeholder.
    pub url_template: String,

    /// File name of the archive on disk.
    pub local_filename: String,

    /// Election year substituted into the template.
    pub year: u16,
}

impl ArchiveDescriptor {
    /// The concrete download URL.
    #[must_use]
    pub fn url(&self) -> String {
        self.url_template.replace("{year}", &self.year.to_string())
    }
}

/// Files unpacked from one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFileSet {
    /// Year-scoped directory holding the files.
    pub root: PathBuf,

    /// Regular files, sorted by path.
    pub files: Vec<PathBuf>,
}

impl ExtractedFileSet {
    /// Directory the archive was unpacked into.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// A merged source file and how many rows it contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// File name inside the archive.
    pub name: String,

    /// Rows appended from this file.
    pub rows: usize,
}

/// Rows merged from every selected file, in file order.
///
/// `columns` stays empty until the schema normalizer names the fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedTable {
    pub kind: DatasetKind,
    pub year: u16,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub sources: Vec<SourceFile>,
}

impl UnifiedTable {
    /// Create an empty table for a dataset and year.
    #[must_use]
    pub fn new(kind: DatasetKind, year: u16) -> Self {
        Self {
            kind,
            year,
            columns: Vec::new(),
            rows: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Append the rows read from one file.
    pub fn append_file(&mut self, name: impl Into<String>, rows: Vec<Vec<String>>) {
        self.sources.push(SourceFile {
            name: name.into(),
            rows: rows.len(),
        });
        self.rows.extend(rows);
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the schema normalizer has named the columns.
    #[must_use]
    pub fn is_normalized(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Position of a named column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of a named column, top to bottom.
    pub fn column<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a str> + 'a> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(move |row| row.get(idx).map(String::as_str).unwrap_or_default()),
        )
    }

    /// The source file a row came from.
    #[must_use]
    pub fn source_of_row(&self, row: usize) -> Option<&SourceFile> {
        let mut end = 0;
        for source in &self.sources {
            end += source.rows;
            if row < end {
                return Some(source);
            }
        }
        None
    }
}

/// Result of a completed request.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// The harmonized table.
    pub table: UnifiedTable,

    /// Non-fatal issues (incomplete historical year, failed export).
    pub warnings: Vec<String>,

    /// Files written when export was requested and succeeded.
    pub exported: Option<ExportedFiles>,
}

impl Dataset {
    /// Number of warnings collected while building the dataset.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}
