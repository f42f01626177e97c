//! Latest authoritative snapshot per topic.
//!
//! Application-state sink for the refresh coordinator. Each applied snapshot
//! replaces the previous one for its topic and is broadcast to watchers, the
//! same way dashboard rooms broadcast updates to their members.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tokio::sync::broadcast;

use crate::domain::foundation::{Timestamp, Topic};
use crate::domain::realtime::SessionSnapshot;
use crate::ports::{SnapshotSink, TopicRelease};

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 64;

/// Broadcast when a topic's snapshot is replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotUpdate {
    pub topic: Topic,
    pub snapshot: SessionSnapshot,
    pub applied_at: Timestamp,
}

/// In-memory store of the latest snapshot per topic.
pub struct SnapshotStore {
    latest: RwLock<HashMap<Topic, SessionSnapshot>>,
    updates: broadcast::Sender<SnapshotUpdate>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a store whose update channel buffers `capacity` updates.
    pub fn with_capacity(capacity: usize) -> Self {
        let (updates, _) = broadcast::channel(capacity.max(1));
        Self {
            latest: RwLock::new(HashMap::new()),
            updates,
        }
    }

    /// Latest snapshot for the topic, if one has been fetched.
    pub fn latest(&self, topic: &Topic) -> Option<SessionSnapshot> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .cloned()
    }

    /// Watch for snapshot replacements across all topics.
    pub fn subscribe(&self) -> broadcast::Receiver<SnapshotUpdate> {
        self.updates.subscribe()
    }

    /// Drop the stored snapshot for the topic.
    pub fn evict(&self, topic: &Topic) -> Option<SessionSnapshot> {
        self.latest
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(topic)
    }

    /// Number of topics with a stored snapshot.
    pub fn len(&self) -> usize {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotSink for SnapshotStore {
    fn apply(&self, topic: &Topic, snapshot: SessionSnapshot) {
        self.latest
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(topic.clone(), snapshot.clone());

        // No watchers is fine.
        let _ = self.updates.send(SnapshotUpdate {
            topic: topic.clone(),
            snapshot,
            applied_at: Timestamp::now(),
        });
        tracing::debug!(topic = %topic, "Snapshot applied");
    }
}

impl TopicRelease for SnapshotStore {
    fn release(&self, topic: &Topic) {
        if self.evict(topic).is_some() {
            tracing::debug!(topic = %topic, "Snapshot evicted");
        }
    }
}
