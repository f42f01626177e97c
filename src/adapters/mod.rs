//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the real-time core to external systems:
//! - `realtime` - Registry, poller, refresh coordinator, bridge, snapshot store
//! - `transport` - Push transports (SSE, in-memory)
//! - `http` - Snapshot fetcher
//! - `auth` - Bearer token providers

pub mod auth;
pub mod http;
pub mod realtime;
pub mod transport;

pub use auth::{SharedTokenProvider, StaticTokenProvider};
pub use http::{HttpSnapshotFetcher, SnapshotFetcherConfig};
pub use realtime::{
    ConnectionRegistry, EventHandlers, FallbackPoller, Listener, RefreshCoordinator,
    RefreshOutcome, RegistryConfig, SnapshotStore, SnapshotUpdate, SubscriptionBridge,
    SubscriptionHandle, TopicDiagnostics,
};
pub use transport::{InMemoryTransport, SseConfig, SseTransport};
