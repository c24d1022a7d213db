//! HTTP client wrapper for downloading from the TSE repository.

use std::io::{Read, Write};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use thiserror::Error;

use crate::error::Result;

/// User agent string identifying this harvester.
const USER_AGENT: &str = concat!("urna-harvester/", env!("CARGO_PKG_VERSION"));

/// Why a single download attempt failed.
///
/// Callers wrap this into a `HarvesterError` carrying dataset context.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server responded with {0}")]
    Status(StatusCode),

    #[error("response exceeds maximum size of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("failed to write response body: {0}")]
    Io(#[from] std::io::Error),
}

/// Create a configured HTTP client.
///
/// # Arguments
/// * `timeout_secs` - Whole-request timeout, including the body transfer
pub fn create_client(timeout_secs: u64) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Stream a URL's body into `writer`.
///
/// Performs exactly one request; there is no retry. Non-success statuses and
/// bodies larger than `max_bytes` are errors.
///
/// # Returns
/// Number of bytes written
pub fn download_to<W: Write>(
    client: &Client,
    url: &str,
    writer: &mut W,
    max_bytes: u64,
) -> std::result::Result<u64, DownloadError> {
    let response = client.get(url).send()?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(status = %status, url, "Download rejected by server");
        return Err(DownloadError::Status(status));
    }

    if let Some(length) = response.content_length() {
        if length > max_bytes {
            return Err(DownloadError::TooLarge { limit: max_bytes });
        }
    }

    // Read one byte past the limit to detect oversized bodies without a
    // Content-Length header.
    let mut limited = response.take(max_bytes.saturating_add(1));
    let written = std::io::copy(&mut limited, writer)?;
    if written > max_bytes {
        return Err(DownloadError::TooLarge { limit: max_bytes });
    }

    tracing::debug!(bytes = written, url, "Download complete");
    Ok(written)
}
