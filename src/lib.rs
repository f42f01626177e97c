//! Dealer Live - Real-time bidding session updates
//!
//! This crate keeps dashboard views of live bidding sessions current. One
//! server-push connection per session is shared by every interested
//! component, closed connections are retried with bounded backoff, and when
//! push delivery is abandoned the session falls back to periodic polling.
//! Change events trigger debounced refetches of the authoritative snapshot.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
