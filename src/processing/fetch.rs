//! Remote document retrieval and local staging.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors raised while downloading or staging a remote document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP layer failed before a complete response was received.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Server answered with a non-success status.
    #[error("unexpected response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the server.
        status: StatusCode,
        /// Response body, if any.
        body: String,
    },
    /// Downloaded bytes could not be written to a temporary file.
    #[error("failed to stage download: {0}")]
    Staging(#[from] std::io::Error),
}

/// Retrieves the bytes behind a document URL.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Perform a single GET request and return the response body.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// `reqwest`-backed fetcher.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent("rusty-docs/0.1")
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::info!(url, "Downloading document");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::UnexpectedStatus { status, body });
        }
        let bytes = response.bytes().await?;
        tracing::debug!(url, bytes = bytes.len(), "Download complete");
        Ok(bytes.to_vec())
    }
}

/// Write `bytes` to a temporary file ending in `suffix`.
///
/// The file is deleted when the returned handle is dropped.
pub(crate) fn stage(bytes: &[u8], suffix: &str) -> Result<NamedTempFile, FetchError> {
    let mut file = tempfile::Builder::new()
        .prefix("rustydocs-")
        .suffix(suffix)
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}
