//! Maps a component's mount lifecycle onto registry subscriptions.
//!
//! A UI component (dashboard panel, bid ticker) owns one bridge. Mounting
//! subscribes to a topic, remounting with another topic switches over and
//! unmounting (or dropping the bridge) unsubscribes. Events are routed to
//! the handler registered for their type.
//!
//! # Example
//!
//! ```ignore
//! let handlers = EventHandlers::new()
//!     .on(EventType::StateChanged, |event| render_bids(event))
//!     .on(EventType::FallbackRequired, |_| show_offline_banner());
//!
//! let mut bridge = SubscriptionBridge::new(registry.clone(), handlers);
//! bridge.mount("session-42");
//! // ...
//! bridge.unmount();
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::foundation::Topic;
use crate::domain::realtime::{ConnectionStatus, EventType, RealtimeEvent};

use super::refresh_coordinator::RefreshCoordinator;
use super::registry::{ConnectionRegistry, Listener, SubscriptionHandle};

/// Callback for one event type.
pub type Handler = Arc<dyn Fn(&RealtimeEvent) + Send + Sync>;

/// Handlers keyed by normalized event type.
#[derive(Clone, Default)]
pub struct EventHandlers {
    handlers: HashMap<EventType, Handler>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `event_type`, replacing any previous one.
    pub fn on<F>(mut self, event_type: EventType, handler: F) -> Self
    where
        F: Fn(&RealtimeEvent) + Send + Sync + 'static,
    {
        self.handlers.insert(event_type, Arc::new(handler));
        self
    }

    /// Also notify `coordinator` on refresh-worthy events, after any
    /// handler already registered for them.
    pub fn with_refresh(mut self, coordinator: RefreshCoordinator) -> Self {
        for event_type in [EventType::StateChanged, EventType::EntityClosed] {
            let previous = self.handlers.remove(&event_type);
            let coordinator = coordinator.clone();
            self.handlers.insert(
                event_type,
                Arc::new(move |event: &RealtimeEvent| {
                    if let Some(previous) = &previous {
                        previous(event);
                    }
                    coordinator.notify(&event.topic);
                }),
            );
        }
        self
    }

    /// Whether a handler exists for the type.
    pub fn handles(&self, event_type: EventType) -> bool {
        self.handlers.contains_key(&event_type)
    }

    fn get(&self, event_type: EventType) -> Option<Handler> {
        self.handlers.get(&event_type).cloned()
    }
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// One component's view onto the registry.
pub struct SubscriptionBridge {
    registry: ConnectionRegistry,
    handlers: Arc<RwLock<EventHandlers>>,
    listener: Listener,
    current: Option<(Topic, SubscriptionHandle)>,
}

impl SubscriptionBridge {
    pub fn new(registry: ConnectionRegistry, handlers: EventHandlers) -> Self {
        let handlers = Arc::new(RwLock::new(handlers));
        let routing = Arc::clone(&handlers);

        // One listener for the bridge's whole life, so every subscription it
        // makes has the same identity in the registry.
        let listener: Listener = Arc::new(move |event: &RealtimeEvent| {
            let handler = routing
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(event.event_type);
            match handler {
                Some(handler) => handler(event),
                None => tracing::debug!(
                    topic = %event.topic,
                    event_type = %event.event_type,
                    "No handler for event, dropped"
                ),
            }
        });

        Self {
            registry,
            handlers,
            listener,
            current: None,
        }
    }

    /// Subscribe to `topic`, switching away from any previous topic.
    ///
    /// Mounting the current topic again does nothing while its subscription
    /// is live; after the registry dropped it (`disconnect`, `shutdown`) the
    /// topic is subscribed afresh. Invalid topics are logged and ignored.
    pub fn mount(&mut self, topic: &str) {
        let topic = match Topic::new(topic) {
            Ok(topic) => topic,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Invalid topic, mount ignored");
                return;
            }
        };

        if self.current_topic() == Some(&topic) {
            return;
        }

        self.unmount();

        let handle = self.registry.subscribe(&topic, Arc::clone(&self.listener));
        if handle.is_active() {
            tracing::debug!(topic = %topic, "Bridge mounted");
            self.current = Some((topic, handle));
        }
    }

    /// Unsubscribe from the current topic. Safe to call any number of times.
    pub fn unmount(&mut self) {
        if let Some((topic, handle)) = self.current.take() {
            handle.unsubscribe();
            tracing::debug!(topic = %topic, "Bridge unmounted");
        }
    }

    /// Replace the handlers; takes effect for the next event.
    pub fn set_handlers(&self, handlers: EventHandlers) {
        *self.handlers.write().unwrap_or_else(PoisonError::into_inner) = handlers;
    }

    /// Topic currently mounted, if any.
    ///
    /// A subscription the registry has since torn down does not count.
    pub fn current_topic(&self) -> Option<&Topic> {
        self.current
            .as_ref()
            .filter(|(_, handle)| handle.is_active())
            .map(|(topic, _)| topic)
    }

    /// Connection status of the mounted topic.
    pub fn status(&self) -> ConnectionStatus {
        self.current_topic()
            .map(|topic| self.registry.status(topic))
            .unwrap_or(ConnectionStatus::Disconnected)
    }

    /// Whether the mounted topic's push stream is open.
    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }
}

impl Drop for SubscriptionBridge {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl fmt::Debug for SubscriptionBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionBridge")
            .field("topic", &self.current_topic())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::StaticTokenProvider;
    use crate::adapters::realtime::FallbackPoller;
    use crate::adapters::transport::InMemoryTransport;
    use crate::ports::RefreshTrigger;
    use std::sync::Mutex;

    struct NoopTrigger;

    impl RefreshTrigger for NoopTrigger {
        fn request_refresh(&self, _topic: &Topic) {}
    }

    fn fixture() -> (Arc<InMemoryTransport>, ConnectionRegistry) {
        let transport = Arc::new(InMemoryTransport::new());
        let registry = ConnectionRegistry::new(
            transport.clone(),
            Arc::new(StaticTokenProvider::new("token")),
            Arc::new(FallbackPoller::new(Arc::new(NoopTrigger))),
        );
        (transport, registry)
    }

    fn topic(s: &str) -> Topic {
        Topic::new(s).unwrap()
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn mounting_twice_subscribes_once() {
        let (transport, registry) = fixture();
        let mut bridge = SubscriptionBridge::new(registry.clone(), EventHandlers::new());

        bridge.mount("A");
        bridge.mount("A");
        settle().await;

        assert_eq!(registry.subscriber_count(&topic("A")), 1);
        assert_eq!(transport.open_count(&topic("A")), 1);
        assert!(bridge.is_connected());
    }

    #[tokio::test]
    async fn remount_after_disconnect_subscribes_again() {
        let (transport, registry) = fixture();
        let mut bridge = SubscriptionBridge::new(registry.clone(), EventHandlers::new());
        let a = topic("A");

        bridge.mount("A");
        settle().await;
        registry.disconnect(&a);

        assert_eq!(bridge.current_topic(), None);
        assert_eq!(bridge.status(), ConnectionStatus::Disconnected);

        bridge.mount("A");
        settle().await;

        assert_eq!(registry.subscriber_count(&a), 1);
        assert_eq!(transport.open_count(&a), 2);
        assert_eq!(bridge.current_topic(), Some(&a));
        assert!(bridge.is_connected());
    }

    #[tokio::test]
    async fn changing_topic_moves_the_subscription() {
        let (_transport, registry) = fixture();
        let mut bridge = SubscriptionBridge::new(registry.clone(), EventHandlers::new());

        bridge.mount("A");
        bridge.mount("B");
        settle().await;

        assert_eq!(registry.status(&topic("A")), ConnectionStatus::Disconnected);
        assert_eq!(registry.subscriber_count(&topic("B")), 1);
        assert_eq!(bridge.current_topic(), Some(&topic("B")));
    }

    #[tokio::test]
    async fn unmount_is_idempotent_and_drop_unsubscribes() {
        let (_transport, registry) = fixture();
        let mut other = SubscriptionBridge::new(registry.clone(), EventHandlers::new());
        other.mount("A");

        {
            let mut bridge = SubscriptionBridge::new(registry.clone(), EventHandlers::new());
            bridge.mount("A");
            bridge.unmount();
            bridge.unmount();
            assert_eq!(registry.subscriber_count(&topic("A")), 1);

            bridge.mount("A");
            assert_eq!(registry.subscriber_count(&topic("A")), 2);
        }

        assert_eq!(registry.subscriber_count(&topic("A")), 1);
        other.unmount();
        assert_eq!(registry.status(&topic("A")), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn events_route_to_matching_handler() {
        let (transport, registry) = fixture();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handlers = EventHandlers::new().on(EventType::EntityClosed, move |event| {
            sink.lock().unwrap().push(event.payload.clone());
        });

        let mut bridge = SubscriptionBridge::new(registry, handlers);
        bridge.mount("A");
        settle().await;

        transport.emit_message(&topic("A"), "bid_received", "{}");
        transport.emit_message(&topic("A"), "vehicle_sold", r#"{"vin":"1HGCM"}"#);
        settle().await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["vin"], "1HGCM");
    }

    #[tokio::test]
    async fn invalid_topic_is_ignored() {
        let (transport, registry) = fixture();
        let mut bridge = SubscriptionBridge::new(registry, EventHandlers::new());

        bridge.mount("   ");
        bridge.mount("a/b");

        assert!(bridge.current_topic().is_none());
        assert_eq!(bridge.status(), ConnectionStatus::Disconnected);
        assert_eq!(transport.open_count(&topic("A")), 0);
    }

    #[test]
    fn with_refresh_covers_refresh_events() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let _guard = runtime.enter();

        struct NeverFetch;

        #[async_trait::async_trait]
        impl crate::ports::SnapshotFetcher for NeverFetch {
            async fn fetch_snapshot(
                &self,
                _topic: &Topic,
            ) -> Result<crate::domain::realtime::SessionSnapshot, crate::ports::SnapshotError>
            {
                Err(crate::ports::SnapshotError::Unauthorized)
            }
        }

        let coordinator = RefreshCoordinator::new(
            Arc::new(NeverFetch),
            Arc::new(crate::adapters::realtime::SnapshotStore::new()),
        );
        let handlers = EventHandlers::new()
            .on(EventType::Heartbeat, |_| {})
            .with_refresh(coordinator);

        assert!(handlers.handles(EventType::StateChanged));
        assert!(handlers.handles(EventType::EntityClosed));
        assert!(handlers.handles(EventType::Heartbeat));
        assert!(!handlers.handles(EventType::Error));
    }
}
