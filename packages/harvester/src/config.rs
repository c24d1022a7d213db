//! Configuration constants, runtime settings and argument validation.

use std::path::PathBuf;
use std::sync::LazyLock;

use encoding_rs::Encoding;
use regex::Regex;

use crate::error::{HarvesterError, Result};
use crate::types::{DatasetKind, DatasetRequest, RegionCode, RegionFilter};

/// Base URL of the TSE open data repository.
pub const TSE_REPOSITORY_URL: &str = "https://cdn.tse.jus.br/estatistica/sead/odsele";

/// HTTP timeout in seconds.
///
/// Whole-country archives for recent years are tens of megabytes and the CDN
/// is slow from outside Brazil.
pub const HTTP_TIMEOUT_SECS: u64 = 300;

/// Default maximum archive size in bytes (512 MB).
pub const DEFAULT_MAX_DOWNLOAD_SIZE: u64 = 512 * 1024 * 1024;

/// Encoding of the TSE text files.
pub const DEFAULT_ENCODING: &str = "latin1";

/// Per-region files at or below this size carry no data rows.
///
/// The TSE ships header-only placeholders for units without candidates.
pub const MIN_REGION_FILE_BYTES: u64 = 200;

/// Directory name used under the system temp dir for archives and extraction.
pub const CACHE_DIR_NAME: &str = "urna-harvester";

/// Federation units plus the Federal District.
const FEDERATION_UNITS: &[&str] = &[
    "AC", "AL", "AM", "AP", "BA", "CE", "DF", "ES", "GO", "MA", "MG", "MS", "MT", "PA", "PB",
    "PE", "PI", "PR", "RJ", "RN", "RO", "RR", "RS", "SC", "SE", "SP", "TO",
];

/// Region code pattern: two ASCII letters.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static REGION_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2}$").expect("valid regex"));

/// Validate that a year is published for a dataset kind.
///
/// # Examples
/// ```
/// use urna_harvester::config::validate_year;
/// use urna_harvester::types::DatasetKind;
///
/// assert!(validate_year(DatasetKind::Legend, 2018).is_ok());
/// assert!(validate_year(DatasetKind::Legend, 2019).is_err());
/// ```
pub fn validate_year(kind: DatasetKind, year: u16) -> Result<()> {
    if kind.is_supported_year(year) {
        Ok(())
    } else {
        let supported: Vec<String> = kind
            .supported_years()
            .iter()
            .map(ToString::to_string)
            .collect();
        Err(HarvesterError::InvalidYear {
            kind,
            year,
            supported: supported.join(", "),
        })
    }
}

/// Validate a single region code.
///
/// Accepts the federation units and the reserved tokens `BR`, `ZZ` and `VT`,
/// in any case.
///
/// # Examples
/// ```
/// use urna_harvester::config::validate_region_code;
///
/// assert_eq!(validate_region_code("sp").unwrap().as_str(), "SP");
/// assert!(validate_region_code("ZZ").is_ok());
/// assert!(validate_region_code("ZZZ").is_err());
/// ```
pub fn validate_region_code(code: &str) -> Result<RegionCode> {
    let trimmed = code.trim();
    if !REGION_CODE_PATTERN.is_match(trimmed) {
        return Err(HarvesterError::InvalidRegion(code.to_string()));
    }

    let region = RegionCode::new(trimmed);
    if region.reserved().is_some() || FEDERATION_UNITS.contains(&region.as_str()) {
        Ok(region)
    } else {
        Err(HarvesterError::InvalidRegion(code.to_string()))
    }
}

/// Validate user-supplied region codes and build a filter.
///
/// `all` (any case) selects every region and may not be combined with codes.
pub fn validate_region_filter<S: AsRef<str>>(codes: &[S]) -> Result<RegionFilter> {
    let has_all = codes.iter().any(|c| c.as_ref().trim().eq_ignore_ascii_case("all"));
    if has_all {
        if codes.len() > 1 {
            return Err(HarvesterError::InvalidRegion(
                "'all' cannot be combined with region codes".to_string(),
            ));
        }
        return Ok(RegionFilter::All);
    }

    for code in codes {
        validate_region_code(code.as_ref())?;
    }
    Ok(RegionFilter::from_codes(codes))
}

/// Resolve an encoding label (WHATWG names, e.g. `latin1`, `utf-8`).
///
/// `latin1` resolves to windows-1252, the superset the TSE files are written in.
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| HarvesterError::InvalidEncoding(label.to_string()))
}

/// Check a request before any network or filesystem activity.
///
/// Region codes are not checked against the list of federation units here:
/// a code absent from the archive is reported by the merger as an empty
/// result. `BR` is rejected outside full-country mode.
///
/// # Returns
/// The resolved source encoding.
pub fn validate_request(request: &DatasetRequest) -> Result<&'static Encoding> {
    validate_year(request.kind, request.year)?;
    if request.full_country && !request.kind.supports_full_country() {
        return Err(HarvesterError::FullCountryUnsupported(request.kind));
    }
    if !request.full_country {
        if let RegionFilter::Only(codes) = &request.regions {
            if codes.iter().any(RegionCode::is_nationwide) {
                return Err(HarvesterError::NationwideNeedsFullCountry);
            }
        }
    }
    resolve_encoding(&request.encoding)
}

/// Convert a size in megabytes to bytes, capping at `u64::MAX`.
fn megabytes(mb: u64) -> u64 {
    mb.saturating_mul(1024 * 1024)
}

/// Runtime settings for the harvester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvesterConfig {
    /// Base URL the archive paths are appended to.
    pub base_url: String,

    /// Directory holding downloaded archives and extraction directories.
    pub cache_dir: PathBuf,

    /// Directory export files are written to.
    pub output_dir: PathBuf,

    pub timeout_secs: u64,

    /// Largest archive accepted, in bytes.
    pub max_download_bytes: u64,

    /// Per-region files at or below this size are skipped.
    pub min_region_file_bytes: u64,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            base_url: TSE_REPOSITORY_URL.to_string(),
            cache_dir: std::env::temp_dir().join(CACHE_DIR_NAME),
            output_dir: PathBuf::from("."),
            timeout_secs: HTTP_TIMEOUT_SECS,
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_SIZE,
            min_region_file_bytes: MIN_REGION_FILE_BYTES,
        }
    }
}

impl HarvesterConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparseable variables fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("URNA_BASE_URL").unwrap_or(defaults.base_url);

        let cache_dir = std::env::var("URNA_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);

        let output_dir = std::env::var("URNA_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);

        let timeout_secs = std::env::var("URNA_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        let max_download_bytes = std::env::var("URNA_MAX_DOWNLOAD_MB")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(megabytes)
            .unwrap_or(defaults.max_download_bytes);

        Self {
            base_url,
            cache_dir,
            output_dir,
            timeout_secs,
            max_download_bytes,
            min_region_file_bytes: defaults.min_region_file_bytes,
        }
    }

    /// Start from the defaults and override individual settings.
    pub fn builder() -> HarvesterConfigBuilder {
        HarvesterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for `HarvesterConfig`.
#[derive(Debug, Clone)]
pub struct HarvesterConfigBuilder {
    config: HarvesterConfig,
}

impl HarvesterConfigBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = cache_dir.into();
        self
    }

    pub fn output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = output_dir.into();
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.config.timeout_secs = timeout_secs;
        self
    }

    pub fn max_download_bytes(mut self, max_download_bytes: u64) -> Self {
        self.config.max_download_bytes = max_download_bytes;
        self
    }

    pub fn min_region_file_bytes(mut self, min_region_file_bytes: u64) -> Self {
        self.config.min_region_file_bytes = min_region_file_bytes;
        self
    }

    pub fn build(self) -> HarvesterConfig {
        self.config
    }
}
