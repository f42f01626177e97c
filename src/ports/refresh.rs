//! Refresh ports - How refetch requests, refetched state and topic teardown move around.

use crate::domain::foundation::Topic;
use crate::domain::realtime::SessionSnapshot;

/// Receiver of "refresh this topic's state now" signals.
///
/// The fallback poller emits these on every tick without knowing anything
/// about event semantics.
pub trait RefreshTrigger: Send + Sync {
    /// Request an authoritative refresh of the topic.
    fn request_refresh(&self, topic: &Topic);
}

/// Destination for refetched snapshots (application state).
pub trait SnapshotSink: Send + Sync {
    /// Store the latest snapshot for the topic.
    fn apply(&self, topic: &Topic, snapshot: SessionSnapshot);
}

/// Holder of per-topic state that must go away with the topic.
///
/// The connection registry calls this once a topic is torn down, after
/// its own locks are released.
pub trait TopicRelease: Send + Sync {
    fn release(&self, topic: &Topic);
}
