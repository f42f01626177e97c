//! Periodic refresh for topics whose push stream gave up.
//!
//! When the reconnection policy gives up on a topic, the registry arms a
//! poller for it. Every tick simply asks the [`RefreshTrigger`] to refresh
//! the topic; the poller knows nothing about event semantics.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 10s | Time between refresh signals (first tick is immediate) |

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::domain::foundation::Topic;
use crate::ports::RefreshTrigger;

/// Default time between fallback refreshes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Per-topic recurring refresh timers.
pub struct FallbackPoller {
    trigger: Arc<dyn RefreshTrigger>,
    timers: Mutex<HashMap<Topic, JoinHandle<()>>>,
    runtime: Handle,
}

impl FallbackPoller {
    /// Create a poller that signals `trigger` on every tick.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime; timers are spawned onto it.
    pub fn new(trigger: Arc<dyn RefreshTrigger>) -> Self {
        Self {
            trigger,
            timers: Mutex::new(HashMap::new()),
            runtime: Handle::current(),
        }
    }

    /// Start polling the topic every `interval`.
    ///
    /// The first refresh is requested immediately. Arming an already armed
    /// topic replaces its timer.
    pub fn arm(&self, topic: &Topic, interval: Duration) {
        let trigger = Arc::clone(&self.trigger);
        let polled = topic.clone();
        let period = interval.max(Duration::from_millis(1));

        let timer = self.runtime.spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tracing::debug!(topic = %polled, "Fallback poll tick");
                trigger.request_refresh(&polled);
            }
        });

        if let Some(previous) = self.timers().insert(topic.clone(), timer) {
            previous.abort();
        }
        tracing::info!(
            topic = %topic,
            interval_ms = period.as_millis() as u64,
            "Fallback polling armed"
        );
    }

    /// Stop polling the topic. No-op if it is not armed.
    pub fn disarm(&self, topic: &Topic) {
        if let Some(timer) = self.timers().remove(topic) {
            timer.abort();
            tracing::info!(topic = %topic, "Fallback polling disarmed");
        }
    }

    /// Whether the topic currently has a poll timer.
    pub fn is_armed(&self, topic: &Topic) -> bool {
        self.timers().contains_key(topic)
    }

    /// Topics currently being polled.
    pub fn armed_topics(&self) -> Vec<Topic> {
        self.timers().keys().cloned().collect()
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<Topic, JoinHandle<()>>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for FallbackPoller {
    fn drop(&mut self) {
        let timers = self.timers.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, timer) in timers.drain() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingTrigger {
        calls: Mutex<Vec<Topic>>,
    }

    impl CountingTrigger {
        fn count_for(&self, topic: &Topic) -> usize {
            self.calls.lock().unwrap().iter().filter(|t| *t == topic).count()
        }
    }

    impl RefreshTrigger for CountingTrigger {
        fn request_refresh(&self, topic: &Topic) {
            self.calls.lock().unwrap().push(topic.clone());
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
    async fn arm_refreshes_immediately_then_every_interval() {
        let trigger = Arc::new(CountingTrigger::default());
        let poller = FallbackPoller::new(trigger.clone());
        let a = topic("A");

        poller.arm(&a, Duration::from_secs(10));
        settle().await;
        assert_eq!(trigger.count_for(&a), 1);

        time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(trigger.count_for(&a), 2);

        time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(trigger.count_for(&a), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_stops_ticks() {
        let trigger = Arc::new(CountingTrigger::default());
        let poller = FallbackPoller::new(trigger.clone());
        let a = topic("A");

        poller.arm(&a, Duration::from_secs(5));
        settle().await;
        poller.disarm(&a);
        assert!(!poller.is_armed(&a));

        time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(trigger.count_for(&a), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_previous_timer() {
        let trigger = Arc::new(CountingTrigger::default());
        let poller = FallbackPoller::new(trigger.clone());
        let a = topic("A");

        poller.arm(&a, Duration::from_secs(5));
        poller.arm(&a, Duration::from_secs(5));
        settle().await;
        assert_eq!(poller.armed_topics(), vec![a.clone()]);

        time::advance(Duration::from_secs(5)).await;
        settle().await;
        // One immediate tick plus one interval tick from a single timer.
        assert_eq!(trigger.count_for(&a), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn topics_poll_independently() {
        let trigger = Arc::new(CountingTrigger::default());
        let poller = FallbackPoller::new(trigger.clone());
        let (a, b) = (topic("A"), topic("B"));

        poller.arm(&a, Duration::from_secs(5));
        poller.arm(&b, Duration::from_secs(5));
        poller.disarm(&a);
        settle().await;

        assert!(!poller.is_armed(&a));
        assert!(poller.is_armed(&b));
        assert_eq!(trigger.count_for(&b), 1);
    }

    #[test]
    fn disarm_unknown_topic_is_noop() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let _guard = runtime.enter();
        let poller = FallbackPoller::new(Arc::new(CountingTrigger::default()));
        poller.disarm(&topic("never-armed"));
        assert!(poller.armed_topics().is_empty());
    }
}
