//! Composition root for real-time session updates.
//!
//! Builds the snapshot store, refresh coordinator, fallback poller and
//! connection registry once, wires them together and hands out bridges.
//!
//! ```text
//!  PushTransport ──▶ ConnectionRegistry ──▶ SubscriptionBridge ──▶ handlers
//!                          │ give-up                 │ state-changed / entity-closed
//!                          ▼                         ▼
//!                    FallbackPoller ──tick──▶ RefreshCoordinator ──▶ SnapshotFetcher
//!                                                    │
//!                                                    ▼
//!                                              SnapshotStore
//! ```

use std::sync::Arc;

use crate::adapters::http::HttpSnapshotFetcher;
use crate::adapters::realtime::{
    ConnectionRegistry, EventHandlers, FallbackPoller, RefreshCoordinator, SnapshotStore,
    SubscriptionBridge,
};
use crate::adapters::transport::SseTransport;
use crate::config::{AppConfig, RealtimeConfig, ValidationError};
use crate::ports::{AuthTokenProvider, PushTransport, SnapshotError, SnapshotFetcher, TransportError};

/// Errors that can occur while building the runtime from configuration.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("Push transport setup failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Snapshot fetcher setup failed: {0}")]
    Fetcher(#[from] SnapshotError),
}

/// Process-wide real-time services.
pub struct RealtimeRuntime {
    registry: ConnectionRegistry,
    coordinator: RefreshCoordinator,
    poller: Arc<FallbackPoller>,
    snapshots: Arc<SnapshotStore>,
}

impl RealtimeRuntime {
    /// Wire the runtime around the given ports.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        transport: Arc<dyn PushTransport>,
        fetcher: Arc<dyn SnapshotFetcher>,
        tokens: Arc<dyn AuthTokenProvider>,
        config: &RealtimeConfig,
    ) -> Self {
        let snapshots = Arc::new(SnapshotStore::new());
        let coordinator = RefreshCoordinator::with_min_interval(
            fetcher,
            snapshots.clone(),
            config.refresh_debounce(),
        );
        let poller = Arc::new(FallbackPoller::new(Arc::new(coordinator.clone())));
        let registry =
            ConnectionRegistry::with_config(transport, tokens, poller.clone(), config.registry());
        registry.on_release(Arc::new(coordinator.clone()));
        registry.on_release(snapshots.clone());

        tracing::info!(
            max_reconnect_attempts = config.max_reconnect_attempts,
            poll_interval_ms = config.poll_interval_ms,
            refresh_debounce_ms = config.refresh_debounce_ms,
            "Realtime runtime ready"
        );

        Self {
            registry,
            coordinator,
            poller,
            snapshots,
        }
    }

    /// Validate `config` and wire the SSE transport and HTTP fetcher.
    pub fn from_config(
        config: &AppConfig,
        tokens: Arc<dyn AuthTokenProvider>,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;

        let transport = SseTransport::new(config.api.sse())?;
        let fetcher = HttpSnapshotFetcher::new(config.api.snapshot_fetcher(), tokens.clone())?;

        Ok(Self::new(
            Arc::new(transport),
            Arc::new(fetcher),
            tokens,
            &config.realtime,
        ))
    }

    /// A bridge whose refresh-worthy events also notify the coordinator.
    pub fn bridge(&self, handlers: EventHandlers) -> SubscriptionBridge {
        SubscriptionBridge::new(
            self.registry.clone(),
            handlers.with_refresh(self.coordinator.clone()),
        )
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn poller(&self) -> &FallbackPoller {
        &self.poller
    }

    pub fn snapshots(&self) -> &Arc<SnapshotStore> {
        &self.snapshots
    }

    /// Disconnect every topic and stop all timers.
    pub fn shutdown(&self) {
        let topics = self.registry.active_topics();
        self.registry.shutdown();
        tracing::info!(topics = topics.len(), "Realtime runtime shut down");
    }
}
