//! Real-time session update vocabulary.
//!
//! - [`event`] - Normalized events and transport message classification
//! - [`status`] - Connection lifecycle states
//! - [`reconnect_policy`] - Bounded, capped reconnection decisions
//! - [`snapshot`] - Authoritative session state

pub mod event;
pub mod reconnect_policy;
pub mod snapshot;
pub mod status;

pub use event::{EventType, RealtimeEvent, Rejection};
pub use reconnect_policy::{CloseReason, GiveUpReason, ReconnectDecision, ReconnectPolicy};
pub use snapshot::{BiddingSessionStatus, SessionSnapshot};
pub use status::{ConnectionStatus, LinkState};
