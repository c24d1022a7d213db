//! Archive location lookup.
//!
//! The TSE renamed its legend archives from `consulta_legendas` to
//! `consulta_coligacao` in 2018. Every naming change is a row in
//! [`ENDPOINTS`]; the resolver picks the newest row not after the requested
//! year.

use crate::config::{validate_year, TSE_REPOSITORY_URL};
use crate::error::Result;
use crate::types::{ArchiveDescriptor, DatasetKind};

/// One archive naming scheme, valid from `since` onwards.
#[derive(Debug, Clone, Copy)]
struct Endpoint {
    kind: DatasetKind,
    since: u16,
    /// Path below the base URL, with a `{year}` placeholder.
    path: &'static str,
}

const ENDPOINTS: &[Endpoint] = &[
    Endpoint {
        kind: DatasetKind::Legend,
        since: 0,
        path: "consulta_legendas/consulta_legendas_{year}.zip",
    },
    Endpoint {
        kind: DatasetKind::Legend,
        since: 2018,
        path: "consulta_coligacao/consulta_coligacao_{year}.zip",
    },
    Endpoint {
        kind: DatasetKind::Seats,
        since: 0,
        path: "consulta_vagas/consulta_vagas_{year}.zip",
    },
];

/// Builds archive descriptors against a base URL.
#[derive(Debug, Clone)]
pub struct EndpointResolver {
    base_url: String,
}

impl Default for EndpointResolver {
    fn default() -> Self {
        Self::new(TSE_REPOSITORY_URL)
    }
}

impl EndpointResolver {
    /// Create a resolver for a base URL (trailing slashes are ignored).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve the archive for a dataset and year.
    ///
    /// # Examples
    /// ```
    /// use urna_harvester::endpoint::EndpointResolver;
    /// use urna_harvester::types::DatasetKind;
    ///
    /// let resolver = EndpointResolver::default();
    /// let descriptor = resolver.resolve(DatasetKind::Legend, 2018).unwrap();
    /// assert_eq!(descriptor.local_filename, "consulta_coligacao_2018.zip");
    /// ```
    pub fn resolve(&self, kind: DatasetKind, year: u16) -> Result<ArchiveDescriptor> {
        validate_year(kind, year)?;

        let endpoint = select_endpoint(kind, year);
        let url_template = format!("{}/{}", self.base_url, endpoint.path);
        let template_name = endpoint
            .path
            .rsplit('/')
            .next()
            .unwrap_or(endpoint.path);

        Ok(ArchiveDescriptor {
            url_template,
            local_filename: template_name.replace("{year}", &year.to_string()),
            year,
        })
    }
}

/// Newest endpoint for `kind` whose `since` is not after `year`.
fn select_endpoint(kind: DatasetKind, year: u16) -> Endpoint {
    // Every kind has a `since: 0` row, so the table always yields a match.
    ENDPOINTS
        .iter()
        .filter(|e| e.kind == kind && e.since <= year)
        .max_by_key(|e| e.since)
        .copied()
        .unwrap_or(ENDPOINTS[0])
}
