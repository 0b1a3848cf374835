//! HTTP client for the upstream station feed.

use axum::body::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;

use super::error::FeedError;

/// Default feed location (Citi Bike NYC station status).
pub const DEFAULT_FEED_URL: &str = "https://www.citibikenyc.com/stations/json";

/// Anything that can produce the raw station payload.
///
/// The payload is opaque bytes at this level; decoding happens in
/// [`StationFeed`](super::StationFeed).
pub trait FeedSource: Send + Sync {
    fn fetch(&self) -> BoxFuture<'_, Result<Bytes, FeedError>>;
}

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    /// Full URL of the station JSON document
    pub url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl FeedClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: 30,
        }
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for FeedClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_URL)
    }
}

/// Fetches the station feed over HTTP.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    url: String,
}

impl FeedClient {
    pub fn new(config: FeedClientConfig) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: config.url,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Download the raw feed document.
    ///
    /// Non-success statuses are errors; the body is not inspected.
    pub async fn fetch_bytes(&self) -> Result<Bytes, FeedError> {
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response.bytes().await?)
    }
}

impl FeedSource for FeedClient {
    fn fetch(&self) -> BoxFuture<'_, Result<Bytes, FeedError>> {
        self.fetch_bytes().boxed()
    }
}
