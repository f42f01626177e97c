//! HTTP snapshot fetcher.
//!
//! `GET {base_url}{snapshot_path}` with the current bearer token, decoded
//! into a [`SessionSnapshot`].
//!
//! | Status | Result |
//! |--------|--------|
//! | 2xx | `Ok(snapshot)` |
//! | 401, 403 | `SnapshotError::Unauthorized` |
//! | 404 | `SnapshotError::NotFound` |
//! | other | `SnapshotError::Http { status }` |

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::transport::SESSION_ID_PLACEHOLDER;
use crate::domain::foundation::Topic;
use crate::domain::realtime::SessionSnapshot;
use crate::ports::{AuthTokenProvider, SnapshotError, SnapshotFetcher};

/// Default snapshot path template.
pub const DEFAULT_SNAPSHOT_PATH: &str = "/sessions/{session_id}";

/// Configuration for the HTTP snapshot fetcher.
#[derive(Debug, Clone)]
pub struct SnapshotFetcherConfig {
    /// Base URL of the API.
    pub base_url: String,
    /// Path template containing `{session_id}`.
    pub snapshot_path: String,
    /// Total request timeout.
    pub timeout: Duration,
}

impl SnapshotFetcherConfig {
    /// Creates a configuration for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            snapshot_path: DEFAULT_SNAPSHOT_PATH.to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    /// Sets the snapshot path template.
    pub fn with_snapshot_path(mut self, path: impl Into<String>) -> Self {
        self.snapshot_path = path.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full snapshot URL for the topic.
    pub fn snapshot_url(&self, topic: &Topic) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.snapshot_path
                .replace(SESSION_ID_PLACEHOLDER, topic.as_str())
        )
    }
}

/// Reads session snapshots over HTTP.
pub struct HttpSnapshotFetcher {
    config: SnapshotFetcherConfig,
    client: Client,
    tokens: Arc<dyn AuthTokenProvider>,
}

impl HttpSnapshotFetcher {
    /// Creates a fetcher with its own HTTP client.
    pub fn new(
        config: SnapshotFetcherConfig,
        tokens: Arc<dyn AuthTokenProvider>,
    ) -> Result<Self, SnapshotError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SnapshotError::Network(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            config,
            client,
            tokens,
        })
    }

    /// Creates a fetcher sharing an existing client.
    pub fn with_client(
        config: SnapshotFetcherConfig,
        client: Client,
        tokens: Arc<dyn AuthTokenProvider>,
    ) -> Self {
        Self {
            config,
            client,
            tokens,
        }
    }
}

#[async_trait]
impl SnapshotFetcher for HttpSnapshotFetcher {
    async fn fetch_snapshot(&self, topic: &Topic) -> Result<SessionSnapshot, SnapshotError> {
        let token = self
            .tokens
            .current_token()
            .ok_or(SnapshotError::MissingCredentials)?;

        let response = self
            .client
            .get(self.config.snapshot_url(topic))
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| SnapshotError::Network(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(SnapshotError::Unauthorized)
            }
            StatusCode::NOT_FOUND => return Err(SnapshotError::NotFound(topic.to_string())),
            status => {
                return Err(SnapshotError::Http {
                    status: status.as_u16(),
                })
            }
        }

        let snapshot = response
            .json::<SessionSnapshot>()
            .await
            .map_err(|e| SnapshotError::Decode(e.to_string()))?;

        tracing::debug!(
            topic = %topic,
            status = ?snapshot.status,
            bid_count = snapshot.bid_count,
            "Snapshot fetched"
        );
        Ok(snapshot)
    }
}
