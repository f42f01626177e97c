//! Registry holding one push connection per topic, fanned out to many listeners.
//!
//! The registry owns every transport connection. UI consumers never see a
//! connection; they register listeners for a topic and receive normalized
//! [`RealtimeEvent`]s.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ ConnectionRegistry                                               │
//! │   topics: RwLock<HashMap<Topic, Arc<TopicSlot>>>  (membership)   │
//! │                                                                  │
//! │   TopicSlot "A"  Mutex<TopicState>                               │
//! │   ├── subscribers: [cb1, cb2]        (registration order)        │
//! │   ├── link: Connecting | Open | Closed  (driver task)            │
//! │   ├── attempts / last_retry_delay                                │
//! │   └── recovery: Idle | Retrying{timer} | Polling                 │
//! └──────────────────────────────────────────────────────────────────┘
//!            ▲ subscribe / unsubscribe          │ open_stream
//!            │                                  ▼
//!     SubscriptionBridge                  PushTransport
//! ```
//!
//! # Locking
//!
//! The map lock is only taken to add or remove topics. Event fan-out takes
//! the per-topic lock alone, snapshots the listener list and invokes the
//! listeners with no lock held, so a listener may subscribe or unsubscribe
//! from inside its callback. Lock order is always map, then topic, then the
//! poller's timer table.
//!
//! # Staleness
//!
//! Every connect attempt bumps the topic's generation. Driver and timer
//! tasks carry the generation they were started for and drop any signal
//! whose generation no longer matches, so a superseded or torn-down
//! connection can never mutate live state.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};
use std::time::Duration;

use futures::StreamExt;
use secrecy::SecretString;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::domain::foundation::{ConnectionId, ErrorCode, SubscriberId, Timestamp, Topic};
use crate::domain::realtime::{
    CloseReason, ConnectionStatus, GiveUpReason, LinkState, RealtimeEvent, ReconnectDecision,
    ReconnectPolicy, Rejection,
};
use crate::ports::{AuthTokenProvider, PushTransport, TopicRelease, TransportSignal};

use super::fallback_poller::{FallbackPoller, DEFAULT_POLL_INTERVAL};

/// Callback invoked for every event on a subscribed topic.
///
/// Identity is the `Arc` allocation: registering the same `Arc` twice for a
/// topic keeps a single registration.
pub type Listener = Arc<dyn Fn(&RealtimeEvent) + Send + Sync>;

/// Tunables for the registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Reconnection decisions for closed streams.
    pub policy: ReconnectPolicy,

    /// Interval handed to the fallback poller on give-up.
    pub poll_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            policy: ReconnectPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Read-only view of a topic's state, for dashboards and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDiagnostics {
    pub status: ConnectionStatus,
    pub subscribers: usize,
    pub attempts: u32,
    pub last_retry_delay: Option<Duration>,
    pub reconnect_pending: bool,
    pub polling: bool,
    pub connection_id: Option<ConnectionId>,
    pub connection_created_at: Option<Timestamp>,
}

/// Process-wide connection and subscription manager.
///
/// Cheap to clone; clones share the same topics. Build one in the
/// composition root and hand clones to whoever needs it.
#[derive(Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RegistryInner>,
}

impl ConnectionRegistry {
    /// Create a registry with default policy and poll interval.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime; connection and timer
    /// tasks are spawned onto it.
    pub fn new(
        transport: Arc<dyn PushTransport>,
        tokens: Arc<dyn AuthTokenProvider>,
        poller: Arc<FallbackPoller>,
    ) -> Self {
        Self::with_config(transport, tokens, poller, RegistryConfig::default())
    }

    /// Create a registry with custom configuration.
    pub fn with_config(
        transport: Arc<dyn PushTransport>,
        tokens: Arc<dyn AuthTokenProvider>,
        poller: Arc<FallbackPoller>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                topics: RwLock::new(HashMap::new()),
                transport,
                tokens,
                poller,
                policy: config.policy,
                poll_interval: config.poll_interval,
                release_hooks: RwLock::new(Vec::new()),
                runtime: Handle::current(),
            }),
        }
    }

    /// Tell `hook` whenever a topic is torn down, so it can drop its own
    /// per-topic state.
    pub fn on_release(&self, hook: Arc<dyn TopicRelease>) {
        write(&self.inner.release_hooks).push(hook);
    }

    /// Register `listener` for `topic`, opening a connection if none is live
    /// or in flight.
    ///
    /// Never fails. Without an auth token the call is logged and an inert
    /// handle is returned.
    pub fn subscribe(&self, topic: &Topic, listener: Listener) -> SubscriptionHandle {
        let Some(token) = self.inner.tokens.current_token() else {
            tracing::warn!(topic = %topic, "No auth token available, subscription ignored");
            return SubscriptionHandle::noop(topic.clone());
        };

        let mut topics = write(&self.inner.topics);
        let slot = Arc::clone(topics.entry(topic.clone()).or_insert_with(|| {
            tracing::debug!(topic = %topic, "Creating topic state");
            Arc::new(TopicSlot::new(topic.clone()))
        }));
        let mut state = lock(&slot.state);

        let (id, released) = match state.position_of(&listener) {
            Some(index) => {
                tracing::debug!(topic = %topic, "Listener already registered");
                let existing = &state.subscribers[index];
                (existing.id, Arc::clone(&existing.released))
            }
            None => {
                let id = SubscriberId::new();
                let released = Arc::new(AtomicBool::new(false));
                state.subscribers.push(Subscriber {
                    id,
                    listener,
                    released: Arc::clone(&released),
                });
                (id, released)
            }
        };

        if state.needs_connection() {
            self.inner.start_connection(&slot, &mut state, token);
        }

        tracing::debug!(
            topic = %topic,
            subscriber = %id,
            subscribers = state.subscribers.len(),
            "Subscribed"
        );
        drop(state);
        drop(topics);

        SubscriptionHandle::new(Arc::downgrade(&self.inner), topic.clone(), id, released)
    }

    /// Force-close a topic: drop its connection, subscribers and timers.
    ///
    /// Outstanding handles for the topic become inactive.
    pub fn disconnect(&self, topic: &Topic) {
        let slot = write(&self.inner.topics).remove(topic);
        if let Some(slot) = slot {
            lock(&slot.state).tear_down(&self.inner.poller, topic);
            tracing::info!(topic = %topic, "Topic disconnected");
            self.inner.run_release_hooks(topic);
        }
    }

    /// Disconnect every topic.
    pub fn shutdown(&self) {
        let slots: Vec<_> = write(&self.inner.topics).drain().collect();
        for (topic, slot) in slots {
            lock(&slot.state).tear_down(&self.inner.poller, &topic);
            self.inner.run_release_hooks(&topic);
        }
    }

    /// Whether the topic's push stream is open.
    pub fn is_connected(&self, topic: &Topic) -> bool {
        self.status(topic).is_connected()
    }

    /// Connection status of the topic.
    pub fn status(&self, topic: &Topic) -> ConnectionStatus {
        read(&self.inner.topics)
            .get(topic)
            .map(|slot| lock(&slot.state).status())
            .unwrap_or(ConnectionStatus::Disconnected)
    }

    /// Detailed state of the topic, or `None` if it is not tracked.
    pub fn diagnostics(&self, topic: &Topic) -> Option<TopicDiagnostics> {
        read(&self.inner.topics)
            .get(topic)
            .map(|slot| lock(&slot.state).diagnostics())
    }

    /// Topics that currently have subscribers.
    pub fn active_topics(&self) -> Vec<Topic> {
        read(&self.inner.topics).keys().cloned().collect()
    }

    /// Number of listeners registered for the topic.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        read(&self.inner.topics)
            .get(topic)
            .map(|slot| lock(&slot.state).subscribers.len())
            .unwrap_or(0)
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("topics", &self.active_topics())
            .finish()
    }
}

/// Handle returned by [`ConnectionRegistry::subscribe`].
///
/// Calling [`unsubscribe`](Self::unsubscribe) removes exactly the listener
/// it was issued for; later calls (from this handle or its clones) do
/// nothing. Dropping the handle does not unsubscribe. The handle turns
/// inactive when the registry tears its topic down.
#[derive(Clone)]
pub struct SubscriptionHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    registry: Weak<RegistryInner>,
    topic: Topic,
    subscriber: Option<SubscriberId>,
    /// Shared with the registry's subscriber entry.
    released: Arc<AtomicBool>,
}

impl SubscriptionHandle {
    fn new(
        registry: Weak<RegistryInner>,
        topic: Topic,
        subscriber: SubscriberId,
        released: Arc<AtomicBool>,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                registry,
                topic,
                subscriber: Some(subscriber),
                released,
            }),
        }
    }

    /// A handle that was never registered; unsubscribing it does nothing.
    pub fn noop(topic: Topic) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                registry: Weak::new(),
                topic,
                subscriber: None,
                released: Arc::new(AtomicBool::new(true)),
            }),
        }
    }

    /// Remove the listener. Idempotent.
    ///
    /// No dispatch starts after this returns, but a callback that another
    /// thread was already invoking may still finish.
    pub fn unsubscribe(&self) {
        if self.inner.released.swap(true, Ordering::AcqRel) {
            return;
        }
        if let (Some(registry), Some(id)) = (self.inner.registry.upgrade(), self.inner.subscriber) {
            registry.unsubscribe(&self.inner.topic, id);
        }
    }

    /// Whether the handle still holds a registration.
    pub fn is_active(&self) -> bool {
        !self.inner.released.load(Ordering::Acquire)
    }

    /// Topic the handle was issued for.
    pub fn topic(&self) -> &Topic {
        &self.inner.topic
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("topic", &self.inner.topic)
            .field("active", &self.is_active())
            .finish()
    }
}

// ── Internal state ──────────────────────────────────────────────────────────

struct RegistryInner {
    topics: RwLock<HashMap<Topic, Arc<TopicSlot>>>,
    transport: Arc<dyn PushTransport>,
    tokens: Arc<dyn AuthTokenProvider>,
    poller: Arc<FallbackPoller>,
    policy: ReconnectPolicy,
    poll_interval: Duration,
    release_hooks: RwLock<Vec<Arc<dyn TopicRelease>>>,
    runtime: Handle,
}

struct TopicSlot {
    topic: Topic,
    state: Mutex<TopicState>,
}

impl TopicSlot {
    fn new(topic: Topic) -> Self {
        Self {
            topic,
            state: Mutex::new(TopicState::default()),
        }
    }
}

#[derive(Clone)]
struct Subscriber {
    id: SubscriberId,
    listener: Listener,
    released: Arc<AtomicBool>,
}

impl Subscriber {
    fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

struct Link {
    id: ConnectionId,
    state: LinkState,
    created_at: Timestamp,
    task: JoinHandle<()>,
}

/// Active recovery strategy. Retrying and polling exclude each other.
enum Recovery {
    Idle,
    Retrying { timer: JoinHandle<()> },
    Polling,
}

struct TopicState {
    subscribers: Vec<Subscriber>,
    link: Option<Link>,
    generation: u64,
    attempts: u32,
    last_retry_delay: Option<Duration>,
    recovery: Recovery,
    torn_down: bool,
}

impl Default for TopicState {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            link: None,
            generation: 0,
            attempts: 0,
            last_retry_delay: None,
            recovery: Recovery::Idle,
            torn_down: false,
        }
    }
}

impl TopicState {
    fn is_current(&self, generation: u64) -> bool {
        !self.torn_down && self.generation == generation
    }

    fn position_of(&self, listener: &Listener) -> Option<usize> {
        let target = Arc::as_ptr(listener) as *const ();
        self.subscribers
            .iter()
            .position(|s| Arc::as_ptr(&s.listener) as *const () == target)
    }

    /// No live or in-flight connection and no retry already scheduled.
    fn needs_connection(&self) -> bool {
        let link_down = self
            .link
            .as_ref()
            .map_or(true, |link| link.state == LinkState::Closed);
        link_down && !matches!(self.recovery, Recovery::Retrying { .. })
    }

    fn listeners(&self) -> Vec<Subscriber> {
        self.subscribers.clone()
    }

    /// Replace the recovery strategy, cancelling whatever was active.
    fn set_recovery(&mut self, next: Recovery, poller: &FallbackPoller, topic: &Topic) {
        match std::mem::replace(&mut self.recovery, next) {
            Recovery::Retrying { timer } => timer.abort(),
            Recovery::Polling if !matches!(self.recovery, Recovery::Polling) => {
                poller.disarm(topic)
            }
            _ => {}
        }
    }

    fn tear_down(&mut self, poller: &FallbackPoller, topic: &Topic) {
        self.torn_down = true;
        if let Some(link) = self.link.take() {
            link.task.abort();
        }
        self.set_recovery(Recovery::Idle, poller, topic);
        for subscriber in self.subscribers.drain(..) {
            subscriber.released.store(true, Ordering::Release);
        }
    }

    fn status(&self) -> ConnectionStatus {
        self.link
            .as_ref()
            .map(|link| link.state.into())
            .unwrap_or(ConnectionStatus::Closed)
    }

    fn diagnostics(&self) -> TopicDiagnostics {
        TopicDiagnostics {
            status: self.status(),
            subscribers: self.subscribers.len(),
            attempts: self.attempts,
            last_retry_delay: self.last_retry_delay,
            reconnect_pending: matches!(self.recovery, Recovery::Retrying { .. }),
            polling: matches!(self.recovery, Recovery::Polling),
            connection_id: self.link.as_ref().map(|link| link.id),
            connection_created_at: self.link.as_ref().map(|link| link.created_at),
        }
    }
}

impl RegistryInner {
    /// Begin a connect attempt. The link is marked `Connecting` before the
    /// driver task runs, so concurrent subscribers never double-open.
    fn start_connection(
        self: &Arc<Self>,
        slot: &Arc<TopicSlot>,
        state: &mut TopicState,
        token: SecretString,
    ) {
        state.generation += 1;
        let generation = state.generation;
        let connection_id = ConnectionId::new();

        if let Some(superseded) = state.link.take() {
            superseded.task.abort();
        }

        let task = self.runtime.spawn(drive_connection(
            Arc::downgrade(self),
            Arc::clone(&self.transport),
            Arc::clone(slot),
            generation,
            connection_id,
            token,
        ));

        state.link = Some(Link {
            id: connection_id,
            state: LinkState::Connecting,
            created_at: Timestamp::now(),
            task,
        });

        tracing::debug!(
            topic = %slot.topic,
            connection = %connection_id,
            attempt = state.attempts,
            "Opening push stream"
        );
    }

    fn unsubscribe(&self, topic: &Topic, id: SubscriberId) {
        let mut topics = write(&self.topics);
        let Some(slot) = topics.get(topic).cloned() else {
            return;
        };
        let mut state = lock(&slot.state);

        let before = state.subscribers.len();
        state.subscribers.retain(|s| s.id != id);
        if state.subscribers.len() == before {
            return;
        }

        tracing::debug!(
            topic = %topic,
            subscriber = %id,
            remaining = state.subscribers.len(),
            "Unsubscribed"
        );

        if state.subscribers.is_empty() {
            state.tear_down(&self.poller, topic);
            drop(state);
            topics.remove(topic);
            drop(topics);
            tracing::info!(topic = %topic, "Last subscriber left, topic torn down");
            self.run_release_hooks(topic);
        }
    }

    /// Run the release hooks. Called with no registry lock held.
    fn run_release_hooks(&self, topic: &Topic) {
        let hooks = read(&self.release_hooks).clone();
        for hook in hooks {
            hook.release(topic);
        }
    }

    fn on_open(&self, slot: &TopicSlot, generation: u64) {
        let (listeners, event) = {
            let mut state = lock(&slot.state);
            if !state.is_current(generation) {
                return;
            }
            let Some(link) = state.link.as_mut() else {
                return;
            };
            link.state = LinkState::Open;
            let connection_id = link.id;

            state.attempts = 0;
            state.last_retry_delay = None;
            state.set_recovery(Recovery::Idle, &self.poller, &slot.topic);

            tracing::info!(topic = %slot.topic, connection = %connection_id, "Push stream open");
            (
                state.listeners(),
                RealtimeEvent::connected(slot.topic.clone(), connection_id),
            )
        };
        deliver(&listeners, &event);
    }

    fn on_closed(self: &Arc<Self>, slot: &Arc<TopicSlot>, generation: u64, reason: CloseReason) {
        let (listeners, events) = {
            let mut state = lock(&slot.state);
            if !state.is_current(generation) {
                tracing::debug!(topic = %slot.topic, "Ignoring closure of superseded connection");
                return;
            }
            if let Some(link) = state.link.as_mut() {
                link.state = LinkState::Closed;
            }
            if state.subscribers.is_empty() {
                return;
            }

            let topic = slot.topic.clone();
            let mut events = Vec::with_capacity(2);

            if matches!(state.recovery, Recovery::Polling) {
                tracing::debug!(
                    topic = %topic,
                    reason = %reason,
                    "Reconnect attempt failed while polling, staying on fallback"
                );
                events.push(RealtimeEvent::disconnected(topic, &reason, None));
            } else {
                match self.policy.decide(state.attempts, &reason) {
                    ReconnectDecision::RetryAfter(delay) => {
                        state.attempts += 1;
                        state.last_retry_delay = Some(delay);
                        let timer = self.schedule_retry(slot, generation, delay);
                        state.set_recovery(Recovery::Retrying { timer }, &self.poller, &topic);

                        tracing::warn!(
                            topic = %topic,
                            reason = %reason,
                            attempt = state.attempts,
                            delay_ms = delay.as_millis() as u64,
                            "Push stream closed, reconnect scheduled"
                        );
                        events.push(RealtimeEvent::disconnected(
                            topic,
                            &reason,
                            Some((state.attempts, delay)),
                        ));
                    }
                    ReconnectDecision::GiveUp(why) => {
                        state.set_recovery(Recovery::Polling, &self.poller, &topic);
                        self.poller.arm(&topic, self.poll_interval);

                        let code = match (why, &reason) {
                            (GiveUpReason::Exhausted { .. }, _) => ErrorCode::ReconnectExhausted,
                            (GiveUpReason::Terminal { .. }, CloseReason::MissingCredentials) => {
                                ErrorCode::MissingCredentials
                            }
                            (GiveUpReason::Terminal { .. }, _) => ErrorCode::ConnectionRejected,
                        };
                        tracing::warn!(
                            topic = %topic,
                            reason = %reason,
                            attempts = state.attempts,
                            code = %code,
                            "Giving up on push stream, falling back to polling"
                        );
                        events.push(RealtimeEvent::disconnected(topic.clone(), &reason, None));
                        events.push(RealtimeEvent::fallback_required(
                            topic,
                            code,
                            state.attempts,
                            self.poll_interval,
                        ));
                    }
                }
            }

            (state.listeners(), events)
        };

        for event in &events {
            deliver(&listeners, event);
        }
    }

    fn schedule_retry(
        self: &Arc<Self>,
        slot: &Arc<TopicSlot>,
        generation: u64,
        delay: Duration,
    ) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        let slot = Arc::clone(slot);
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(registry) = registry.upgrade() {
                registry.retry(&slot, generation);
            }
        })
    }

    fn retry(self: &Arc<Self>, slot: &Arc<TopicSlot>, generation: u64) {
        let mut state = lock(&slot.state);
        if !state.is_current(generation) || !matches!(state.recovery, Recovery::Retrying { .. }) {
            return;
        }
        // The timer running this is the one being cleared, so no abort.
        state.recovery = Recovery::Idle;

        match self.tokens.current_token() {
            Some(token) => self.start_connection(slot, &mut state, token),
            None => {
                drop(state);
                tracing::warn!(topic = %slot.topic, "No auth token available for reconnect");
                self.on_closed(slot, generation, CloseReason::MissingCredentials);
            }
        }
    }

    fn fan_out(&self, slot: &TopicSlot, generation: u64, event: RealtimeEvent) {
        let listeners = {
            let state = lock(&slot.state);
            if !state.is_current(generation) {
                return;
            }
            state.listeners()
        };
        deliver(&listeners, &event);
    }
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        let topics = self.topics.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (topic, slot) in topics.drain() {
            lock(&slot.state).tear_down(&self.poller, &topic);
        }
    }
}

/// Runs one connection attempt from open to close.
async fn drive_connection(
    registry: Weak<RegistryInner>,
    transport: Arc<dyn PushTransport>,
    slot: Arc<TopicSlot>,
    generation: u64,
    connection_id: ConnectionId,
    token: SecretString,
) {
    let reason = match transport.open_stream(&slot.topic, &token).await {
        Ok(mut stream) => loop {
            let Some(signal) = stream.next().await else {
                break CloseReason::Ended;
            };
            let Some(registry) = registry.upgrade() else {
                return;
            };
            match signal {
                TransportSignal::Open => registry.on_open(&slot, generation),
                TransportSignal::Message { event_type, data } => {
                    match RealtimeEvent::from_message(&slot.topic, &event_type, &data) {
                        Ok(event) => registry.fan_out(&slot, generation, event),
                        Err(Rejection::UnknownType(raw)) => {
                            tracing::debug!(
                                topic = %slot.topic,
                                event_type = %raw,
                                "Dropping unrecognized message type"
                            );
                        }
                        Err(Rejection::Misrouted { payload_session }) => {
                            tracing::warn!(
                                topic = %slot.topic,
                                payload_session = %payload_session,
                                "Dropping message addressed to another session"
                            );
                        }
                    }
                }
                TransportSignal::Error(detail) => {
                    tracing::warn!(
                        topic = %slot.topic,
                        connection = %connection_id,
                        error = %detail,
                        "Push stream error"
                    );
                    registry.fan_out(
                        &slot,
                        generation,
                        RealtimeEvent::error(slot.topic.clone(), ErrorCode::TransportError, detail),
                    );
                }
                TransportSignal::Close(reason) => break reason,
            }
        },
        Err(err) => {
            tracing::debug!(topic = %slot.topic, error = %err, "Push stream failed to open");
            err.into()
        }
    };

    if let Some(registry) = registry.upgrade() {
        registry.on_closed(&slot, generation, reason);
    }
}

/// Invoke every listener; a panicking listener does not stop the others.
///
/// Listeners unsubscribed since the list was copied are skipped.
fn deliver(subscribers: &[Subscriber], event: &RealtimeEvent) {
    for subscriber in subscribers {
        if subscriber.is_released() {
            continue;
        }
        let listener = &subscriber.listener;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(event)));
        if let Err(cause) = outcome {
            let message = cause
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| cause.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic".to_string());
            tracing::error!(
                topic = %event.topic,
                event_type = %event.event_type,
                panic = %message,
                "Subscriber callback panicked, continuing fan-out"
            );
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
