//! Real-time session update adapters.
//!
//! - `ConnectionRegistry` - One push connection per topic, fan-out, reconnection
//! - `FallbackPoller` - Periodic refresh once push delivery is abandoned
//! - `RefreshCoordinator` - Debounced authoritative refetches
//! - `SubscriptionBridge` - Component mount/unmount to subscriptions
//! - `SnapshotStore` - Latest snapshot per topic

mod fallback_poller;
mod refresh_coordinator;
mod registry;
mod snapshot_store;
mod subscription_bridge;

pub use fallback_poller::{FallbackPoller, DEFAULT_POLL_INTERVAL};
pub use refresh_coordinator::{RefreshCoordinator, RefreshOutcome, DEFAULT_DEBOUNCE};
pub use registry::{
    ConnectionRegistry, Listener, RegistryConfig, SubscriptionHandle, TopicDiagnostics,
};
pub use snapshot_store::{SnapshotStore, SnapshotUpdate};
pub use subscription_bridge::{EventHandlers, Handler, SubscriptionBridge};
