//! HTTP fetcher shared by all feed plugins.

use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{FeedError, Result};
use crate::retry::{with_retries, RetryConfig};

/// Default request timeout for list endpoints
pub const LIST_TIMEOUT: Duration = Duration::from_secs(30);

/// Request timeout for large archive downloads
pub const ARCHIVE_TIMEOUT: Duration = Duration::from_secs(300);

/// HTTP client wrapper with timeout and retry behavior shared by plugins.
#[derive(Clone, Debug)]
pub struct Fetcher {
    http: HttpClient,
    retry: RetryConfig,
}

impl Fetcher {
    /// Create a fetcher with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_retry(timeout, RetryConfig::default())
    }

    /// Create a fetcher with a custom retry policy.
    pub fn with_retry(timeout: Duration, retry: RetryConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .user_agent(concat!("cordon/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .map_err(|e| FeedError::Fetch {
                feed: "http client".into(),
                reason: e.to_string(),
            })?;
        Ok(Self { http, retry })
    }

    /// GET a URL as text, retrying on failure.
    pub async fn get_text(&self, source: &str, url: &str) -> Result<String> {
        with_retries(&self.retry, source, || async {
            debug!(feed = %source, url = %url, "GET request");
            let response = self.send(source, url).await?;
            response.text().await.map_err(|e| FeedError::Fetch {
                feed: source.to_string(),
                reason: e.to_string(),
            })
        })
        .await
    }

    /// GET a URL and decode its JSON body, retrying on failure.
    pub async fn get_json<T: DeserializeOwned>(&self, source: &str, url: &str) -> Result<T> {
        let body = self.get_text(source, url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// GET a URL as raw bytes (archives), retrying on failure.
    pub async fn get_bytes(&self, source: &str, url: &str) -> Result<Vec<u8>> {
        with_retries(&self.retry, source, || async {
            debug!(feed = %source, url = %url, "GET request (binary)");
            let response = self.send(source, url).await?;
            let bytes = response.bytes().await.map_err(|e| FeedError::Fetch {
                feed: source.to_string(),
                reason: e.to_string(),
            })?;
            Ok(bytes.to_vec())
        })
        .await
    }

    async fn send(&self, source: &str, url: &str) -> Result<reqwest::Response> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::Fetch {
                feed: source.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}
