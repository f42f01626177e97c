//! Normalized real-time events.
//!
//! Every transport-specific message is translated into a [`RealtimeEvent`]
//! before fan-out. Subscribers only ever see this shape.
//!
//! # Message vocabulary
//!
//! ```text
//! bid_received, bid_placed, bid_updated,     ─┐
//! bid_retracted, session_updated,             ├─▶ state-changed
//! session_extended, vehicle_updated,          │
//! state_changed                              ─┘
//! session_closed, session_ended,             ─┬─▶ entity-closed
//! vehicle_sold, entity_closed                ─┘
//! heartbeat, ping, keepalive, connected      ───▶ heartbeat
//! error                                      ───▶ error
//! anything else                              ───▶ dropped
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::domain::foundation::{ConnectionId, ErrorCode, Timestamp, Topic};

use super::CloseReason;

/// Transport message types that signal a change in session state.
pub const STATE_CHANGE_MESSAGE_TYPES: &[&str] = &[
    "bid_received",
    "bid_placed",
    "bid_updated",
    "bid_retracted",
    "session_updated",
    "session_extended",
    "vehicle_updated",
    "state_changed",
];

/// Transport message types that signal the session (or its vehicle) closed.
pub const ENTITY_CLOSED_MESSAGE_TYPES: &[&str] = &[
    "session_closed",
    "session_ended",
    "vehicle_sold",
    "entity_closed",
];

/// Transport message types that only prove the stream is alive.
pub const HEARTBEAT_MESSAGE_TYPES: &[&str] = &["heartbeat", "ping", "keepalive", "connected"];

/// SSE default event name; its real type lives in the JSON `type` field.
const GENERIC_MESSAGE_TYPE: &str = "message";

/// The fixed vocabulary of normalized event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    /// The push connection opened.
    Connected,
    /// The push connection closed; a retry may be pending.
    Disconnected,
    /// Session state changed on the server.
    StateChanged,
    /// The session or an entity inside it closed.
    EntityClosed,
    /// Liveness signal with no state change.
    Heartbeat,
    /// Transport or server reported an error.
    Error,
    /// Push delivery was abandoned; polling has taken over.
    FallbackRequired,
}

impl EventType {
    /// Returns the wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Connected => "connected",
            EventType::Disconnected => "disconnected",
            EventType::StateChanged => "state-changed",
            EventType::EntityClosed => "entity-closed",
            EventType::Heartbeat => "heartbeat",
            EventType::Error => "error",
            EventType::FallbackRequired => "fallback-required",
        }
    }

    /// Whether an event of this type should prompt an authoritative refetch.
    pub fn triggers_refresh(&self) -> bool {
        matches!(self, EventType::StateChanged | EventType::EntityClosed)
    }

    /// Maps a raw transport message type onto the normalized vocabulary.
    ///
    /// Returns `None` for types the subsystem does not understand.
    pub fn from_message_type(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if STATE_CHANGE_MESSAGE_TYPES.contains(&raw) {
            Some(EventType::StateChanged)
        } else if ENTITY_CLOSED_MESSAGE_TYPES.contains(&raw) {
            Some(EventType::EntityClosed)
        } else if HEARTBEAT_MESSAGE_TYPES.contains(&raw) {
            Some(EventType::Heartbeat)
        } else if raw == "error" {
            Some(EventType::Error)
        } else {
            None
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-agnostic event delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealtimeEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub topic: Topic,
    pub payload: Value,
    #[serde(skip)]
    pub received_at: Timestamp,
}

/// Why a raw transport message did not become an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The message type is outside the known vocabulary.
    UnknownType(String),
    /// The payload names a different session than the connection's topic.
    Misrouted { payload_session: String },
}

impl RealtimeEvent {
    /// Creates an event with an arbitrary payload.
    pub fn new(event_type: EventType, topic: Topic, payload: Value) -> Self {
        Self {
            event_type,
            topic,
            payload,
            received_at: Timestamp::now(),
        }
    }

    /// Connection opened.
    pub fn connected(topic: Topic, connection_id: ConnectionId) -> Self {
        Self::new(
            EventType::Connected,
            topic,
            json!({ "connection_id": connection_id }),
        )
    }

    /// Connection closed; `retry` carries `(attempt, delay)` when a retry is scheduled.
    pub fn disconnected(topic: Topic, reason: &CloseReason, retry: Option<(u32, Duration)>) -> Self {
        let mut payload = json!({ "reason": reason.to_string() });
        if let Some(status) = reason.status() {
            payload["status"] = json!(status);
        }
        if let Some((attempt, delay)) = retry {
            payload["attempt"] = json!(attempt);
            payload["retry_in_ms"] = json!(delay.as_millis() as u64);
        }
        Self::new(EventType::Disconnected, topic, payload)
    }

    /// Push abandoned; polling every `poll_interval`.
    pub fn fallback_required(
        topic: Topic,
        code: ErrorCode,
        attempts: u32,
        poll_interval: Duration,
    ) -> Self {
        Self::new(
            EventType::FallbackRequired,
            topic,
            json!({
                "code": code.as_str(),
                "attempts": attempts,
                "poll_interval_ms": poll_interval.as_millis() as u64,
            }),
        )
    }

    /// Error reported by the transport layer.
    pub fn error(topic: Topic, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(
            EventType::Error,
            topic,
            json!({ "code": code.as_str(), "message": message.into() }),
        )
    }

    /// Translates a raw `message(type, data)` transport signal.
    ///
    /// `data` is parsed as JSON when possible and kept as a string otherwise.
    /// A generic `message` type is resolved through the payload's `type`
    /// field. Payloads that name a different session are rejected.
    pub fn from_message(topic: &Topic, raw_type: &str, data: &str) -> Result<Self, Rejection> {
        let payload = serde_json::from_str::<Value>(data)
            .unwrap_or_else(|_| Value::String(data.to_string()));

        let resolved_type = if raw_type.trim() == GENERIC_MESSAGE_TYPE {
            payload
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or(GENERIC_MESSAGE_TYPE)
        } else {
            raw_type
        };

        let event_type = EventType::from_message_type(resolved_type)
            .ok_or_else(|| Rejection::UnknownType(resolved_type.to_string()))?;

        if let Some(session) = payload_session_id(&payload) {
            if session != topic.as_str() {
                return Err(Rejection::Misrouted {
                    payload_session: session.to_string(),
                });
            }
        }

        Ok(Self::new(event_type, topic.clone(), payload))
    }
}

fn payload_session_id(payload: &Value) -> Option<&str> {
    payload
        .get("session_id")
        .or_else(|| payload.get("sessionId"))
        .and_then(Value::as_str)
}
