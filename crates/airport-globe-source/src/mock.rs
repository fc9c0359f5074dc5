//! In-memory [`JsonFetcher`] for tests

use airport_globe_core::{FetchError, JsonFetcher};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum MockResponse {
    Json(Value),
    Status(u16),
}

/// Serves canned JSON documents by URL
///
/// Unknown URLs fail with a connection-refused transport error. Every
/// request is logged as `start <url>` / `end <url>` so tests can check
/// ordering.
#[derive(Debug, Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, MockResponse>>,
    delays: Mutex<HashMap<String, Duration>>,
    log: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(self, url: &str, document: Value) -> Self {
        self.set_json(url, document);
        self
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), MockResponse::Status(status));
        self
    }

    /// Hold the response to `url` for `delay` before answering
    pub fn with_delay(self, url: &str, delay: Duration) -> Self {
        self.delays
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), delay);
        self
    }

    /// Replace the document served for `url`
    pub fn set_json(&self, url: &str, document: Value) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), MockResponse::Json(document));
    }

    /// URLs requested so far, in request order
    pub fn requests(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter_map(|entry| entry.strip_prefix("start ").map(str::to_string))
            .collect()
    }

    /// Request start/end log
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn push_log(&self, entry: String) {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).push(entry);
    }
}

#[async_trait]
impl JsonFetcher for MockFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        self.push_log(format!("start {}", url));

        let delay = self
            .delays
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let response = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .cloned();

        self.push_log(format!("end {}", url));

        match response {
            Some(MockResponse::Json(document)) => Ok(document),
            Some(MockResponse::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
            None => Err(FetchError::Transport {
                url: url.to_string(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                )),
            }),
        }
    }
}
