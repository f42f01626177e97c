//! Authoritative session state returned by the snapshot endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::foundation::Timestamp;

/// Lifecycle of a bidding session as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiddingSessionStatus {
    Scheduled,
    Live,
    Closed,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Point-in-time view of one bidding session.
///
/// Only the fields the dashboard relies on are typed; everything else the
/// server sends is preserved in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,

    #[serde(default)]
    pub status: BiddingSessionStatus,

    #[serde(default)]
    pub highest_bid: Option<f64>,

    #[serde(default)]
    pub bid_count: u64,

    #[serde(default)]
    pub ends_at: Option<Timestamp>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionSnapshot {
    /// Whether bidding has finished for this session.
    pub fn is_closed(&self) -> bool {
        self.status == BiddingSessionStatus::Closed
    }
}
