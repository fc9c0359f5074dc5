//! HTTP retrieval of JSON datasets
//!
//! Absolute `http`/`https` URLs are fetched as-is. Relative URLs are
//! resolved against the fetcher's base URL, the way a browser resolves a
//! dataset path against the page that loads it.

use airport_globe_core::{FetchError, JsonFetcher};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default request timeout for dataset downloads
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed [`JsonFetcher`]
pub struct HttpFetcher {
    /// HTTP client
    client: reqwest::Client,
    /// Base for relative URLs
    base_url: Option<Url>,
}

impl HttpFetcher {
    /// Create a fetcher whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: None,
        })
    }

    /// Resolve relative dataset URLs against `base`
    pub fn with_base_url(mut self, base: Url) -> Self {
        self.base_url = Some(base);
        self
    }

    /// Turn `url` into an absolute http(s) URL
    pub fn resolve(&self, url: &str) -> Result<Url, FetchError> {
        let invalid = |reason: String| FetchError::InvalidUrl {
            url: url.to_string(),
            reason,
        };

        let resolved = match (Url::parse(url), &self.base_url) {
            (Ok(absolute), _) => absolute,
            (Err(_), Some(base)) => base.join(url).map_err(|e| invalid(e.to_string()))?,
            (Err(e), None) => {
                return Err(invalid(format!("{} (no base URL configured)", e)));
            }
        };

        match resolved.scheme() {
            "http" | "https" => Ok(resolved),
            other => Err(invalid(format!("unsupported scheme '{}'", other))),
        }
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        let resolved = self.resolve(url)?;
        let url = resolved.to_string();

        info!(url = %url, "Fetching dataset");

        let response = self
            .client
            .get(resolved)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.clone(),
                source: Box::new(e),
            })?;

        if !response.status().is_success() {
            warn!(url = %url, status = %response.status(), "Dataset fetch returned non-success status");
            return Err(FetchError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| FetchError::Transport {
            url: url.clone(),
            source: Box::new(e),
        })?;

        debug!(url = %url, bytes = body.len(), "Dataset downloaded");

        serde_json::from_slice(&body).map_err(|source| FetchError::Parse { url, source })
    }
}

/// Last path segment of a URL, without query or fragment
///
/// Returns `None` when the path ends in `/` or is empty.
pub fn filename_from_url(url: &str) -> Option<String> {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    }
}
