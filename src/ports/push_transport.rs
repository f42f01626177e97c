//! PushTransport port - Interface for opening server-push streams.
//!
//! A transport opens one unidirectional stream per topic. The registry only
//! relies on four signals: `open`, `message(type, data)`, `error` and
//! `close`. Everything else about the wire format stays inside the adapter.

use async_trait::async_trait;
use futures::stream::Stream;
use secrecy::SecretString;
use std::pin::Pin;

use crate::domain::foundation::Topic;
use crate::domain::realtime::CloseReason;

/// Signals emitted by an open push stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// The stream is established and will deliver messages.
    Open,

    /// A server-pushed message in its raw form.
    Message { event_type: String, data: String },

    /// A non-fatal error report; a `Close` follows if the stream is lost.
    Error(String),

    /// The stream ended. No further signals follow.
    Close(CloseReason),
}

impl TransportSignal {
    /// Convenience constructor for a message signal.
    pub fn message(event_type: impl Into<String>, data: impl Into<String>) -> Self {
        TransportSignal::Message {
            event_type: event_type.into(),
            data: data.into(),
        }
    }
}

/// Stream of signals for one connection.
///
/// Ending the stream without a `Close` is treated as `Close(Ended)`.
pub type SignalStream = Pin<Box<dyn Stream<Item = TransportSignal> + Send>>;

/// Errors that prevent a stream from being opened at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Network-level failure before a response arrived.
    #[error("Connect failed: {0}")]
    Connect(String),

    /// The endpoint answered with a non-success status.
    #[error("Stream rejected with status {status}: {detail}")]
    Rejected { status: u16, detail: String },

    /// No credentials were available for the request.
    #[error("Missing credentials")]
    MissingCredentials,
}

impl From<TransportError> for CloseReason {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connect(detail) => CloseReason::Network(detail),
            TransportError::Rejected { status, detail } => CloseReason::Rejected { status, detail },
            TransportError::MissingCredentials => CloseReason::MissingCredentials,
        }
    }
}

/// Port for opening server-push streams.
///
/// # Example
///
/// ```ignore
/// let mut stream = transport.open_stream(&topic, &token).await?;
/// while let Some(signal) = stream.next().await {
///     match signal {
///         TransportSignal::Message { event_type, data } => { /* normalize */ }
///         TransportSignal::Close(reason) => break,
///         _ => {}
///     }
/// }
/// ```
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Open a push stream for the topic, authenticated with the bearer token.
    async fn open_stream(
        &self,
        topic: &Topic,
        token: &SecretString,
    ) -> Result<SignalStream, TransportError>;
}
