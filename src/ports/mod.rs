//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the real-time subsystem and its collaborators. Adapters implement them.
//!
//! ## Consumed Ports
//!
//! - `PushTransport` - Opens one server-push stream per topic
//! - `SnapshotFetcher` - Authoritative session state reads
//! - `AuthTokenProvider` - Current bearer token supply
//!
//! ## Internal Seams
//!
//! - `RefreshTrigger` - "Refresh this topic now" signal (poller → coordinator)
//! - `SnapshotSink` - Where refetched snapshots land (coordinator → app state)
//! - `TopicRelease` - Per-topic cleanup when the registry tears a topic down

mod auth_token;
mod push_transport;
mod refresh;
mod snapshot_fetcher;

pub use auth_token::AuthTokenProvider;
pub use push_transport::{PushTransport, SignalStream, TransportError, TransportSignal};
pub use refresh::{RefreshTrigger, SnapshotSink, TopicRelease};
pub use snapshot_fetcher::{SnapshotError, SnapshotFetcher};
