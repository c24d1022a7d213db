//! Urna Harvester - Download Brazilian electoral data from the TSE repository.
//!
//! This crate downloads the per-year archives the Tribunal Superior Eleitoral
//! publishes, merges their per-state files and names the columns according to
//! the layout in effect for the requested year.
//!
//! # Example
//!
//! ```
//! use urna_harvester::config;
//! use urna_harvester::types::{DatasetKind, DatasetRequest, RegionFilter};
//!
//! // Validate a request before fetching it
//! let request = DatasetRequest::legend(2018).with_regions(RegionFilter::from_codes(["SP"]));
//! assert!(config::validate_request(&request).is_ok());
//! assert!(config::validate_year(DatasetKind::Seats, 2019).is_err());
//! ```
//!
//! # Architecture
//!
//! The harvester is organized into several modules:
//!
//! - [`config`]: Configuration constants, settings and validation
//! - [`types`]: Core data types (DatasetRequest, UnifiedTable, etc.)
//! - [`error`]: Error types and Result alias
//! - [`endpoint`]: Archive URL lookup per dataset and year
//! - [`http`]: HTTP client for downloading from the TSE
//! - [`fetch`]: Archive download and cache reuse
//! - [`extract`]: Archive extraction
//! - [`merge`]: Per-region file merging
//! - [`schema`]: Column layouts per year
//! - [`transliterate`]: ASCII folding
//! - [`export`]: CSV and SAS transport output
//! - [`workspace`]: Scoped temporary files and directories
//! - [`cli`]: Command-line interface
//! - [`harvester`]: Main harvester service

pub mod cli;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod harvester;
pub mod http;
pub mod merge;
pub mod schema;
pub mod transliterate;
pub mod types;
pub mod workspace;

// Re-export main functions
pub use harvester::{fetch_dataset, Harvester};

// Re-export commonly used items
pub use config::{validate_region_filter, validate_year, HarvesterConfig};
pub use error::{HarvesterError, Result};
pub use types::{Dataset, DatasetKind, DatasetRequest, RegionCode, RegionFilter, UnifiedTable};
