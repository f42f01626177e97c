//! Connection lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle of a single transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Open requested, not yet confirmed.
    Connecting,
    /// Stream is delivering events.
    Open,
    /// Stream ended or failed.
    Closed,
}

/// Connection status of a topic as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No registry state exists for the topic.
    #[default]
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// The push stream is open.
    Connected,
    /// The topic is tracked but its stream is down (retrying or polling).
    Closed,
}

impl ConnectionStatus {
    /// Whether the push stream is currently delivering events.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

impl From<LinkState> for ConnectionStatus {
    fn from(state: LinkState) -> Self {
        match state {
            LinkState::Connecting => ConnectionStatus::Connecting,
            LinkState::Open => ConnectionStatus::Connected,
            LinkState::Closed => ConnectionStatus::Closed,
        }
    }
}
