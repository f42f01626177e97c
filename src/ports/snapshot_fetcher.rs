//! SnapshotFetcher port - Authoritative session state reads.
//!
//! The refresh coordinator and the fallback poller both end up here. The
//! call must be idempotent and safe to run while a push stream for the same
//! topic is still open.

use async_trait::async_trait;

use crate::domain::foundation::Topic;
use crate::domain::realtime::SessionSnapshot;

/// Errors that can occur while fetching a session snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    /// Network-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The session does not exist.
    #[error("Session {0} not found")]
    NotFound(String),

    /// The token was refused.
    #[error("Unauthorized")]
    Unauthorized,

    /// Any other non-success status.
    #[error("Snapshot request failed with status {status}")]
    Http { status: u16 },

    /// The body could not be decoded.
    #[error("Invalid snapshot payload: {0}")]
    Decode(String),

    /// No credentials were available for the request.
    #[error("Missing credentials")]
    MissingCredentials,
}

/// Port for reading the current state of a session.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    /// Fetch the authoritative snapshot for the topic.
    async fn fetch_snapshot(&self, topic: &Topic) -> Result<SessionSnapshot, SnapshotError>;
}
