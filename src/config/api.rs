//! Backend API configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::http::{SnapshotFetcherConfig, DEFAULT_SNAPSHOT_PATH};
use crate::adapters::transport::{SseConfig, DEFAULT_STREAM_PATH, SESSION_ID_PLACEHOLDER};

/// Endpoints and timeouts of the bidding API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://api.example.com`
    pub base_url: String,

    /// Push stream path template
    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    /// Snapshot path template
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    /// Connect timeout in milliseconds (stream and snapshot requests)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Total timeout in milliseconds for snapshot requests
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

impl ApiConfig {
    /// SSE transport settings
    pub fn sse(&self) -> SseConfig {
        SseConfig::new(&self.base_url)
            .with_stream_path(&self.stream_path)
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
    }

    /// Snapshot fetcher settings
    pub fn snapshot_fetcher(&self) -> SnapshotFetcherConfig {
        SnapshotFetcherConfig::new(&self.base_url)
            .with_snapshot_path(&self.snapshot_path)
            .with_timeout(Duration::from_millis(self.request_timeout_ms))
    }

    /// Validate API configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.trim().is_empty() {
            return Err(ValidationError::MissingRequired("api.base_url"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidBaseUrl);
        }
        if !self.stream_path.contains(SESSION_ID_PLACEHOLDER) {
            return Err(ValidationError::InvalidPathTemplate("api.stream_path"));
        }
        if !self.snapshot_path.contains(SESSION_ID_PLACEHOLDER) {
            return Err(ValidationError::InvalidPathTemplate("api.snapshot_path"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout("api.connect_timeout_ms"));
        }
        if self.request_timeout_ms == 0 || self.request_timeout_ms > 300_000 {
            return Err(ValidationError::InvalidTimeout("api.request_timeout_ms"));
        }
        Ok(())
    }
}

fn default_stream_path() -> String {
    DEFAULT_STREAM_PATH.to_string()
}

fn default_snapshot_path() -> String {
    DEFAULT_SNAPSHOT_PATH.to_string()
}

fn default_connect_timeout() -> u64 {
    10_000
}

fn default_request_timeout() -> u64 {
    15_000
}
