//! In-memory push transport for testing.
//!
//! Provides deterministic, scriptable streams: tests decide when a stream
//! opens, what it delivers, when it closes and how many connect attempts
//! fail first.
//!
//! # Security Note
//!
//! This adapter is for **testing only**. It uses `.expect()` on lock
//! operations which will panic if locks are poisoned. Production code should
//! use the SSE transport.

use async_trait::async_trait;
use futures::stream;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::domain::foundation::Topic;
use crate::domain::realtime::CloseReason;
use crate::ports::{PushTransport, SignalStream, TransportError, TransportSignal};

/// Scripted connect failures for a topic.
#[derive(Debug, Clone)]
enum FailurePlan {
    Next { remaining: u32, error: TransportError },
    Always(TransportError),
}

#[derive(Default)]
struct TransportState {
    opens: Vec<(Topic, String)>,
    failures: HashMap<Topic, FailurePlan>,
    streams: HashMap<Topic, mpsc::UnboundedSender<TransportSignal>>,
}

/// Scriptable transport for tests.
///
/// Features:
/// - Records every connect attempt (topic and token)
/// - Fails the next N or all attempts for a topic
/// - Emits `Open` immediately unless built with [`manual_open`](Self::manual_open)
/// - Pushes arbitrary signals into the live stream of a topic
///
/// # Panics
///
/// Methods may panic if internal locks are poisoned. This is acceptable
/// for test code but this adapter should NOT be used in production.
///
/// # Example
///
/// ```ignore
/// let transport = Arc::new(InMemoryTransport::new());
/// transport.fail_next(&topic, 2, TransportError::Connect("refused".into()));
///
/// // ... subscribe through the registry ...
///
/// transport.emit_message(&topic, "bid_received", r#"{"amount":100}"#);
/// assert_eq!(transport.open_count(&topic), 3);
/// ```
pub struct InMemoryTransport {
    state: Mutex<TransportState>,
    auto_open: bool,
}

impl InMemoryTransport {
    /// Creates a transport whose streams open immediately.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TransportState::default()),
            auto_open: true,
        }
    }

    /// Creates a transport whose streams stay `Connecting` until
    /// [`open`](Self::open) is called.
    pub fn manual_open() -> Self {
        Self {
            auto_open: false,
            ..Self::new()
        }
    }

    // === Scripting ===

    /// Fail the next `count` connect attempts for the topic.
    pub fn fail_next(&self, topic: &Topic, count: u32, error: TransportError) {
        self.lock().failures.insert(
            topic.clone(),
            FailurePlan::Next {
                remaining: count,
                error,
            },
        );
    }

    /// Fail every connect attempt for the topic until [`recover`](Self::recover).
    pub fn fail_always(&self, topic: &Topic, error: TransportError) {
        self.lock()
            .failures
            .insert(topic.clone(), FailurePlan::Always(error));
    }

    /// Let connect attempts for the topic succeed again.
    pub fn recover(&self, topic: &Topic) {
        self.lock().failures.remove(topic);
    }

    /// Send `Open` on the topic's live stream.
    pub fn open(&self, topic: &Topic) -> bool {
        self.emit(topic, TransportSignal::Open)
    }

    /// Push a signal into the topic's live stream.
    ///
    /// Returns `false` if no stream is live for the topic.
    pub fn emit(&self, topic: &Topic, signal: TransportSignal) -> bool {
        self.lock()
            .streams
            .get(topic)
            .map(|tx| tx.send(signal).is_ok())
            .unwrap_or(false)
    }

    /// Push a raw server message into the topic's live stream.
    pub fn emit_message(&self, topic: &Topic, event_type: &str, data: &str) -> bool {
        self.emit(topic, TransportSignal::message(event_type, data))
    }

    /// Close the topic's live stream with the given reason.
    pub fn close(&self, topic: &Topic, reason: CloseReason) -> bool {
        let sender = self.lock().streams.remove(topic);
        sender
            .map(|tx| tx.send(TransportSignal::Close(reason)).is_ok())
            .unwrap_or(false)
    }

    // === Test Helpers ===

    /// Number of connect attempts made for the topic, failed ones included.
    pub fn open_count(&self, topic: &Topic) -> usize {
        self.lock().opens.iter().filter(|(t, _)| t == topic).count()
    }

    /// Tokens presented by each connect attempt for the topic.
    pub fn tokens_used(&self, topic: &Topic) -> Vec<String> {
        self.lock()
            .opens
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, token)| token.clone())
            .collect()
    }

    /// Whether a consumer still holds the topic's most recent stream.
    pub fn is_stream_live(&self, topic: &Topic) -> bool {
        self.lock()
            .streams
            .get(topic)
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TransportState> {
        self.state
            .lock()
            .expect("InMemoryTransport: state lock poisoned")
    }

    fn scripted_failure(state: &mut TransportState, topic: &Topic) -> Option<TransportError> {
        match state.failures.get_mut(topic)? {
            FailurePlan::Always(error) => Some(error.clone()),
            FailurePlan::Next { remaining, error } => {
                let error = error.clone();
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    state.failures.remove(topic);
                }
                Some(error)
            }
        }
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushTransport for InMemoryTransport {
    async fn open_stream(
        &self,
        topic: &Topic,
        token: &SecretString,
    ) -> Result<SignalStream, TransportError> {
        let mut state = self.lock();
        state
            .opens
            .push((topic.clone(), token.expose_secret().clone()));

        if let Some(error) = Self::scripted_failure(&mut state, topic) {
            return Err(error);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        if self.auto_open {
            // Receiver is alive, send cannot fail.
            let _ = tx.send(TransportSignal::Open);
        }
        state.streams.insert(topic.clone(), tx);

        Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|signal| (signal, rx))
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn topic(s: &str) -> Topic {
        Topic::new(s).unwrap()
    }

    fn token() -> SecretString {
        SecretString::new("t0ken".to_string())
    }

    #[tokio::test]
    async fn streams_open_and_deliver_scripted_signals() {
        let transport = InMemoryTransport::new();
        let a = topic("A");

        let mut stream = transport.open_stream(&a, &token()).await.unwrap();
        assert!(transport.emit_message(&a, "bid_received", "{}"));
        assert!(transport.close(&a, CloseReason::Ended));

        assert_eq!(stream.next().await, Some(TransportSignal::Open));
        assert_eq!(
            stream.next().await,
            Some(TransportSignal::message("bid_received", "{}"))
        );
        assert_eq!(
            stream.next().await,
            Some(TransportSignal::Close(CloseReason::Ended))
        );
        assert_eq!(stream.next().await, None);
        assert_eq!(transport.tokens_used(&a), vec!["t0ken".to_string()]);
    }

    #[tokio::test]
    async fn fail_next_fails_only_the_requested_attempts() {
        let transport = InMemoryTransport::new();
        let a = topic("A");
        transport.fail_next(&a, 2, TransportError::Connect("refused".to_string()));

        assert!(transport.open_stream(&a, &token()).await.is_err());
        assert!(transport.open_stream(&a, &token()).await.is_err());
        assert!(transport.open_stream(&a, &token()).await.is_ok());
        assert_eq!(transport.open_count(&a), 3);
    }

    #[tokio::test]
    async fn dropping_the_stream_marks_it_dead() {
        let transport = InMemoryTransport::manual_open();
        let a = topic("A");

        let stream = transport.open_stream(&a, &token()).await.unwrap();
        assert!(transport.is_stream_live(&a));
        drop(stream);
        assert!(!transport.is_stream_live(&a));
        assert!(!transport.open(&a));
    }
}
