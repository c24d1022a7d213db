//! Main harvester service that ties all components together.

use std::fmt;

use reqwest::blocking::Client;

use crate::config::{validate_request, HarvesterConfig};
use crate::endpoint::EndpointResolver;
use crate::error::Result;
use crate::export::export_table;
use crate::extract::extract_archive;
use crate::fetch::{ArchiveFetcher, FetchOutcome};
use crate::http::create_client;
use crate::merge::RegionFileMerger;
use crate::schema::normalize;
use crate::transliterate::transliterate;
use crate::types::{Dataset, DatasetRequest};
use crate::workspace::ScopedFile;

/// Pipeline step about to start, reported to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Downloading,
    Extracting,
    Merging,
    Normalizing,
    Transliterating,
    Exporting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::Downloading => "Downloading archive...",
            Self::Extracting => "Extracting files...",
            Self::Merging => "Merging region files...",
            Self::Normalizing => "Applying column schema...",
            Self::Transliterating => "Transliterating text...",
            Self::Exporting => "Writing export files...",
        };
        f.write_str(message)
    }
}

/// Runs requests against one configuration and HTTP client.
#[derive(Debug)]
pub struct Harvester {
    config: HarvesterConfig,
    client: Client,
    resolver: EndpointResolver,
}

impl Harvester {
    pub fn new(config: HarvesterConfig) -> Result<Self> {
        let client = create_client(config.timeout_secs)?;
        let resolver = EndpointResolver::new(config.base_url.as_str());
        Ok(Self {
            config,
            client,
            resolver,
        })
    }

    /// Create a harvester configured from `URNA_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(HarvesterConfig::from_env())
    }

    pub fn config(&self) -> &HarvesterConfig {
        &self.config
    }

    /// Fetch, merge and normalize one year of data.
    pub fn fetch(&self, request: &DatasetRequest) -> Result<Dataset> {
        self.fetch_with_progress(request, |_| {})
    }

    /// Like [`Harvester::fetch`], calling `progress` before each stage.
    ///
    /// The request is validated before anything touches the network or disk.
    /// The extraction directory is always removed before returning; the
    /// archive is kept only when the request asks for caching.
    pub fn fetch_with_progress<F>(
        &self,
        request: &DatasetRequest,
        mut progress: F,
    ) -> Result<Dataset>
    where
        F: FnMut(Stage),
    {
        let encoding = validate_request(request)?;
        let kind = request.kind;
        let year = request.year;
        let mut warnings = Vec::new();

        if year < kind.complete_since() {
            let warning = format!(
                "{kind} data before {} may be incomplete; {year} archives can miss states or offices",
                kind.complete_since()
            );
            tracing::warn!("{warning}");
            warnings.push(warning);
        }

        let descriptor = self.resolver.resolve(kind, year)?;
        tracing::info!(kind = %kind, year, regions = %request.regions, "Fetching dataset");

        progress(Stage::Downloading);
        let archive = ScopedFile::new(
            self.config.cache_dir.join(&descriptor.local_filename),
            request.keep_cache,
        );
        let fetcher = ArchiveFetcher::new(&self.client, self.config.max_download_bytes);
        match fetcher.fetch(kind, &descriptor, archive.path(), request.keep_cache)? {
            FetchOutcome::Downloaded { bytes } => {
                tracing::info!(bytes, path = %archive.path().display(), "Archive downloaded");
            }
            FetchOutcome::Cached => {}
        }

        progress(Stage::Extracting);
        let work_dir = self.config.cache_dir.join(format!("{kind}{year}"));
        let (_work_dir, files) = extract_archive(archive.path(), &work_dir)?;

        progress(Stage::Merging);
        let merged = RegionFileMerger::new(encoding)
            .with_min_file_bytes(self.config.min_region_file_bytes)
            .merge(kind, year, &files, &request.regions, request.full_country)?;

        progress(Stage::Normalizing);
        let mut table = normalize(merged)?;

        if request.transliterate {
            progress(Stage::Transliterating);
            table = transliterate(table);
        }

        let exported = if request.export {
            progress(Stage::Exporting);
            match export_table(&table, &self.config.output_dir) {
                Ok(files) => Some(files),
                Err(e) => {
                    tracing::warn!(error = %e, "Export failed");
                    warnings.push(format!("Export failed: {e}"));
                    None
                }
            }
        } else {
            None
        };

        tracing::info!(
            kind = %kind,
            year,
            rows = table.len(),
            warnings = warnings.len(),
            "Dataset ready"
        );
        Ok(Dataset {
            table,
            warnings,
            exported,
        })
    }
}

/// Fetch a dataset with configuration taken from the environment.
///
/// # Arguments
/// * `request` - Dataset kind, year and options
///
/// # Returns
/// The normalized table plus any non-fatal warnings
pub fn fetch_dataset(request: &DatasetRequest) -> Result<Dataset> {
    Harvester::from_env()?.fetch(request)
}
