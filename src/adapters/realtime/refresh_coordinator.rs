//! Debounced, non-overlapping snapshot refetches.
//!
//! Push events are treated as hints: on `state-changed` or `entity-closed`
//! the coordinator refetches the authoritative snapshot instead of patching
//! local state from the event payload. Bursts of events collapse into one
//! refetch per window.
//!
//! ```text
//! notify(A) ──▶ within window? ──yes──▶ Debounced (dropped)
//!                    │ no
//!                    ▼
//!               in flight? ──yes──▶ InFlight (dropped)
//!                    │ no
//!                    ▼
//!          record now, spawn fetch ──▶ sink.apply(A, snapshot)
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::Instant;

use crate::domain::foundation::Topic;
use crate::domain::realtime::RealtimeEvent;
use crate::ports::{RefreshTrigger, SnapshotFetcher, SnapshotSink, TopicRelease};

use super::registry::Listener;

/// Default minimum spacing between refetches of one topic.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// What `notify` did with a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A refetch was started.
    Issued,
    /// A refetch started less than the debounce window ago.
    Debounced,
    /// A refetch for the topic is still running.
    InFlight,
}

#[derive(Debug, Default)]
struct RefreshState {
    last_refetch: Option<Instant>,
    in_flight: bool,
    /// Identifies the refetch that set `in_flight`.
    ticket: u64,
}

/// Turns change notifications into authoritative refetches.
///
/// Cheap to clone; clones share debounce state.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    fetcher: Arc<dyn SnapshotFetcher>,
    sink: Arc<dyn SnapshotSink>,
    min_interval: Duration,
    topics: Mutex<HashMap<Topic, RefreshState>>,
    next_ticket: AtomicU64,
    runtime: Handle,
}

/// Clears the in-flight flag when the refetch task ends, including by
/// panic or abort.
struct InFlightGuard {
    inner: Arc<CoordinatorInner>,
    topic: Topic,
    ticket: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(state) = self.inner.topics().get_mut(&self.topic) {
            if state.ticket == self.ticket {
                state.in_flight = false;
            }
        }
    }
}

impl RefreshCoordinator {
    /// Create a coordinator with the default debounce window.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime; fetches are spawned onto it.
    pub fn new(fetcher: Arc<dyn SnapshotFetcher>, sink: Arc<dyn SnapshotSink>) -> Self {
        Self::with_min_interval(fetcher, sink, DEFAULT_DEBOUNCE)
    }

    /// Create a coordinator with a custom debounce window.
    pub fn with_min_interval(
        fetcher: Arc<dyn SnapshotFetcher>,
        sink: Arc<dyn SnapshotSink>,
        min_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                fetcher,
                sink,
                min_interval,
                topics: Mutex::new(HashMap::new()),
                next_ticket: AtomicU64::new(0),
                runtime: Handle::current(),
            }),
        }
    }

    /// Request a refetch of the topic's snapshot.
    pub fn notify(&self, topic: &Topic) -> RefreshOutcome {
        let now = Instant::now();
        let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
        {
            let mut topics = self.inner.topics();
            let state = topics.entry(topic.clone()).or_default();

            if let Some(last) = state.last_refetch {
                if now.duration_since(last) < self.inner.min_interval {
                    tracing::trace!(topic = %topic, "Refresh debounced");
                    return RefreshOutcome::Debounced;
                }
            }
            if state.in_flight {
                tracing::debug!(topic = %topic, "Refresh already in flight");
                return RefreshOutcome::InFlight;
            }

            state.last_refetch = Some(now);
            state.in_flight = true;
            state.ticket = ticket;
        }

        let guard = InFlightGuard {
            inner: Arc::clone(&self.inner),
            topic: topic.clone(),
            ticket,
        };
        self.inner.runtime.spawn(async move {
            let InFlightGuard { inner, topic, .. } = &guard;
            tracing::debug!(topic = %topic, "Refetching snapshot");
            match inner.fetcher.fetch_snapshot(topic).await {
                // A topic released mid-fetch does not get its state back.
                Ok(snapshot) if inner.owns(topic, ticket) => inner.sink.apply(topic, snapshot),
                Ok(_) => tracing::debug!(topic = %topic, "Topic released during refetch"),
                Err(e) => tracing::warn!(topic = %topic, error = %e, "Snapshot refetch failed"),
            }
        });

        RefreshOutcome::Issued
    }

    /// Forget debounce state for the topic.
    pub fn forget(&self, topic: &Topic) {
        self.inner.topics().remove(topic);
    }

    /// Number of topics with debounce state.
    pub fn tracked_topics(&self) -> usize {
        self.inner.topics().len()
    }

    /// Whether a refetch for the topic is running.
    pub fn is_in_flight(&self, topic: &Topic) -> bool {
        self.inner
            .topics()
            .get(topic)
            .map(|state| state.in_flight)
            .unwrap_or(false)
    }

    /// Registry listener that notifies on refresh-worthy events.
    pub fn listener(&self) -> Listener {
        let coordinator = self.clone();
        Arc::new(move |event: &RealtimeEvent| {
            if event.event_type.triggers_refresh() {
                coordinator.notify(&event.topic);
            }
        })
    }
}

impl RefreshTrigger for RefreshCoordinator {
    fn request_refresh(&self, topic: &Topic) {
        self.notify(topic);
    }
}

impl TopicRelease for RefreshCoordinator {
    fn release(&self, topic: &Topic) {
        self.forget(topic);
    }
}

impl CoordinatorInner {
    fn topics(&self) -> MutexGuard<'_, HashMap<Topic, RefreshState>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the refetch holding `ticket` is still the topic's latest.
    fn owns(&self, topic: &Topic, ticket: u64) -> bool {
        self.topics()
            .get(topic)
            .map_or(false, |state| state.ticket == ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::realtime::{EventType, SessionSnapshot};
    use crate::ports::SnapshotError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fetcher that counts calls and optionally waits before answering.
    struct CountingFetcher {
        calls: AtomicUsize,
        latency: Duration,
        fail: bool,
    }

    impl CountingFetcher {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                latency: Duration::ZERO,
                fail: false,
            }
        }

        fn slow(latency: Duration) -> Self {
            Self {
                latency,
                ..Self::new()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SnapshotFetcher for CountingFetcher {
        async fn fetch_snapshot(&self, topic: &Topic) -> Result<SessionSnapshot, SnapshotError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if self.fail {
                return Err(SnapshotError::Http { status: 500 });
            }
            Ok(serde_json::from_value(json!({ "session_id": topic.as_str() })).unwrap())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        applied: Mutex<Vec<Topic>>,
    }

    impl SnapshotSink for RecordingSink {
        fn apply(&self, topic: &Topic, _snapshot: SessionSnapshot) {
            self.applied.lock().unwrap().push(topic.clone());
        }
    }

    struct PanickingSink;

    impl SnapshotSink for PanickingSink {
        fn apply(&self, _topic: &Topic, _snapshot: SessionSnapshot) {
            panic!("sink exploded");
        }
    }

    fn topic(s: &str) -> Topic {
        Topic::new(s).unwrap()
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_into_one_refetch() {
        let fetcher = Arc::new(CountingFetcher::new());
        let sink = Arc::new(RecordingSink::default());
        let coordinator = RefreshCoordinator::new(fetcher.clone(), sink.clone());
        let a = topic("A");

        let mut outcomes = Vec::new();
        for _ in 0..10 {
            outcomes.push(coordinator.notify(&a));
            tokio::time::advance(Duration::from_millis(10)).await;
        }
        settle().await;

        assert_eq!(outcomes[0], RefreshOutcome::Issued);
        assert!(outcomes[1..].iter().all(|o| *o == RefreshOutcome::Debounced));
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(*sink.applied.lock().unwrap(), vec![a]);
    }

    #[tokio::test(start_paused = true)]
    async fn notify_after_window_refetches_again() {
        let fetcher = Arc::new(CountingFetcher::new());
        let coordinator =
            RefreshCoordinator::new(fetcher.clone(), Arc::new(RecordingSink::default()));
        let a = topic("A");

        assert_eq!(coordinator.notify(&a), RefreshOutcome::Issued);
        settle().await;
        tokio::time::advance(Duration::from_millis(1000)).await;
        assert_eq!(coordinator.notify(&a), RefreshOutcome::Issued);
        settle().await;

        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn refetches_never_overlap() {
        let fetcher = Arc::new(CountingFetcher::slow(Duration::from_secs(5)));
        let coordinator =
            RefreshCoordinator::new(fetcher.clone(), Arc::new(RecordingSink::default()));
        let a = topic("A");

        assert_eq!(coordinator.notify(&a), RefreshOutcome::Issued);
        settle().await;
        assert!(coordinator.is_in_flight(&a));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(coordinator.notify(&a), RefreshOutcome::InFlight);

        tokio::time::advance(Duration::from_secs(3)).await;
        settle().await;
        assert!(!coordinator.is_in_flight(&a));
        assert_eq!(coordinator.notify(&a), RefreshOutcome::Issued);
        settle().await;
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn topics_are_debounced_independently() {
        let fetcher = Arc::new(CountingFetcher::new());
        let coordinator =
            RefreshCoordinator::new(fetcher.clone(), Arc::new(RecordingSink::default()));

        assert_eq!(coordinator.notify(&topic("A")), RefreshOutcome::Issued);
        assert_eq!(coordinator.notify(&topic("B")), RefreshOutcome::Issued);
        settle().await;
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_clears_in_flight_and_skips_sink() {
        let fetcher = Arc::new(CountingFetcher {
            fail: true,
            ..CountingFetcher::new()
        });
        let sink = Arc::new(RecordingSink::default());
        let coordinator = RefreshCoordinator::new(fetcher.clone(), sink.clone());
        let a = topic("A");

        coordinator.notify(&a);
        settle().await;

        assert!(!coordinator.is_in_flight(&a));
        assert!(sink.applied.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn listener_only_reacts_to_refresh_events() {
        let fetcher = Arc::new(CountingFetcher::new());
        let coordinator =
            RefreshCoordinator::new(fetcher.clone(), Arc::new(RecordingSink::default()));
        let listener = coordinator.listener();
        let a = topic("A");

        listener(&RealtimeEvent::new(EventType::Heartbeat, a.clone(), json!({})));
        listener(&RealtimeEvent::new(EventType::Connected, a.clone(), json!({})));
        settle().await;
        assert_eq!(fetcher.calls(), 0);

        listener(&RealtimeEvent::new(EventType::EntityClosed, a, json!({})));
        settle().await;
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_sink_does_not_wedge_the_topic() {
        let fetcher = Arc::new(CountingFetcher::new());
        let coordinator = RefreshCoordinator::new(fetcher.clone(), Arc::new(PanickingSink));
        let a = topic("A");

        assert_eq!(coordinator.notify(&a), RefreshOutcome::Issued);
        settle().await;
        assert!(!coordinator.is_in_flight(&a));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(coordinator.notify(&a), RefreshOutcome::Issued);
        settle().await;
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn release_drops_topic_state() {
        let fetcher = Arc::new(CountingFetcher::new());
        let coordinator =
            RefreshCoordinator::new(fetcher.clone(), Arc::new(RecordingSink::default()));

        for i in 0..100 {
            coordinator.notify(&topic(&format!("T{}", i)));
        }
        settle().await;
        assert_eq!(coordinator.tracked_topics(), 100);

        for i in 0..100 {
            coordinator.release(&topic(&format!("T{}", i)));
        }
        assert_eq!(coordinator.tracked_topics(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn release_during_fetch_discards_the_result() {
        let fetcher = Arc::new(CountingFetcher::slow(Duration::from_secs(5)));
        let sink = Arc::new(RecordingSink::default());
        let coordinator = RefreshCoordinator::new(fetcher.clone(), sink.clone());
        let a = topic("A");

        coordinator.notify(&a);
        settle().await;
        coordinator.release(&a);

        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;

        assert!(sink.applied.lock().unwrap().is_empty());
        assert_eq!(coordinator.tracked_topics(), 0);
    }
}
