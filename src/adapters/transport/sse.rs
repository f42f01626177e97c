//! Server-Sent Events push transport.
//!
//! Opens `GET {base_url}{stream_path}` with the caller's bearer token and
//! turns the `text/event-stream` body into [`TransportSignal`]s:
//!
//! ```text
//! event: bid_received            ─┐
//! data: {"session_id":"A",...}    ├─▶ Message { event_type: "bid_received", data }
//!                                ─┘   (blank line dispatches)
//! : keep-alive comment           ───▶ ignored
//! data: {"type":"heartbeat"}     ───▶ Message { event_type: "message", data }
//! ```
//!
//! The decoder is incremental: events split across network chunks and CRLF
//! line endings are handled. `id:` and `retry:` fields are ignored since
//! reconnection is owned by the registry.

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::collections::VecDeque;
use std::fmt::Display;
use std::time::Duration;

use crate::domain::foundation::Topic;
use crate::domain::realtime::CloseReason;
use crate::ports::{PushTransport, SignalStream, TransportError, TransportSignal};

/// Placeholder replaced with the topic in path templates.
pub const SESSION_ID_PLACEHOLDER: &str = "{session_id}";

/// Default stream path template.
pub const DEFAULT_STREAM_PATH: &str = "/sessions/{session_id}/events";

/// Event name used when an SSE event carries no `event:` field.
const DEFAULT_EVENT_TYPE: &str = "message";

/// Longest rejection body kept in error details.
const MAX_DETAIL_LEN: usize = 256;

/// Most bytes of one unfinished event the decoder will hold.
const MAX_PENDING_EVENT_BYTES: usize = 1024 * 1024;

/// Configuration for the SSE transport.
#[derive(Debug, Clone)]
pub struct SseConfig {
    /// Base URL of the API (e.g. "https://api.example.com").
    pub base_url: String,
    /// Path template containing `{session_id}`.
    pub stream_path: String,
    /// Connect timeout. Streams are long-lived, so no total timeout is set.
    pub connect_timeout: Duration,
}

impl SseConfig {
    /// Creates a configuration for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Sets the stream path template.
    pub fn with_stream_path(mut self, path: impl Into<String>) -> Self {
        self.stream_path = path.into();
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Full stream URL for the topic.
    pub fn stream_url(&self, topic: &Topic) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.stream_path.replace(SESSION_ID_PLACEHOLDER, topic.as_str())
        )
    }
}

/// Push transport over Server-Sent Events.
pub struct SseTransport {
    config: SseConfig,
    client: Client,
}

impl SseTransport {
    /// Creates a transport with its own HTTP client.
    pub fn new(config: SseConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TransportError::Connect(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Creates a transport sharing an existing client.
    pub fn with_client(config: SseConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl PushTransport for SseTransport {
    async fn open_stream(
        &self,
        topic: &Topic,
        token: &SecretString,
    ) -> Result<SignalStream, TransportError> {
        let url = self.config.stream_url(topic);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token.expose_secret())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut detail = response.text().await.unwrap_or_default();
            if detail.len() > MAX_DETAIL_LEN {
                let cut = (0..=MAX_DETAIL_LEN)
                    .rev()
                    .find(|i| detail.is_char_boundary(*i))
                    .unwrap_or(0);
                detail.truncate(cut);
            }
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        tracing::debug!(topic = %topic, url = %url, "SSE stream established");

        let reader = SseReader::new(Box::pin(response.bytes_stream()));
        let signals = stream::unfold(reader, |mut reader| async move {
            reader.next_signal().await.map(|signal| (signal, reader))
        });

        Ok(Box::pin(
            stream::once(async { TransportSignal::Open }).chain(signals),
        ))
    }
}

/// Pulls body chunks through the decoder, one signal at a time.
struct SseReader<S> {
    body: S,
    decoder: SseDecoder,
    pending: VecDeque<TransportSignal>,
    finished: bool,
}

impl<S, B, E> SseReader<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    fn new(body: S) -> Self {
        Self {
            body,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    async fn next_signal(&mut self) -> Option<TransportSignal> {
        loop {
            if let Some(signal) = self.pending.pop_front() {
                return Some(signal);
            }
            if self.finished {
                return None;
            }
            match self.body.next().await {
                Some(Ok(chunk)) => {
                    self.pending.extend(self.decoder.feed(chunk.as_ref()));
                    self.finished = self.decoder.overflowed;
                }
                Some(Err(e)) => {
                    let detail = e.to_string();
                    self.finished = true;
                    self.pending.push_back(TransportSignal::Error(detail.clone()));
                    self.pending
                        .push_back(TransportSignal::Close(CloseReason::Network(detail)));
                }
                None => {
                    // A trailing event without its blank line is incomplete; drop it.
                    self.finished = true;
                    self.pending
                        .push_back(TransportSignal::Close(CloseReason::Ended));
                }
            }
        }
    }
}

/// Incremental `text/event-stream` decoder.
#[derive(Debug)]
struct SseDecoder {
    buffer: Vec<u8>,
    event_type: Option<String>,
    data: Vec<String>,
    data_len: usize,
    limit: usize,
    overflowed: bool,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_limit(MAX_PENDING_EVENT_BYTES)
    }
}

impl SseDecoder {
    fn with_limit(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            event_type: None,
            data: Vec::new(),
            data_len: 0,
            limit,
            overflowed: false,
        }
    }

    /// Feeds a chunk, returning every event it completed.
    ///
    /// Once an unfinished event grows past the limit the stream is closed
    /// with a network error and further input is ignored.
    fn feed(&mut self, chunk: &[u8]) -> Vec<TransportSignal> {
        if self.overflowed {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut completed = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline).collect();
            let text = String::from_utf8_lossy(&raw[..newline]);
            let line = text.strip_suffix('\r').unwrap_or(&text);
            if let Some(signal) = self.process_line(line) {
                completed.push(signal);
            }
        }

        if self.buffer.len() + self.data_len > self.limit {
            let detail = format!("SSE event exceeds {} bytes", self.limit);
            tracing::warn!(limit = self.limit, "Oversized SSE event, closing stream");
            self.overflowed = true;
            self.buffer = Vec::new();
            self.data.clear();
            completed.push(TransportSignal::Error(detail.clone()));
            completed.push(TransportSignal::Close(CloseReason::Network(detail)));
        }
        completed
    }

    fn process_line(&mut self, line: &str) -> Option<TransportSignal> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event_type = Some(value.to_string()),
            "data" => {
                self.data_len += value.len();
                self.data.push(value.to_string());
            }
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<TransportSignal> {
        let event_type = self.event_type.take();
        self.data_len = 0;
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        let event_type = event_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string());
        Some(TransportSignal::message(event_type, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_event() {
        let mut decoder = SseDecoder::default();
        let signals =
            decoder.feed(b"event: bid_received\ndata: {\"session_id\":\"A\"}\n\n");

        assert_eq!(
            signals,
            vec![TransportSignal::message(
                "bid_received",
                "{\"session_id\":\"A\"}"
            )]
        );
    }

    #[test]
    fn unnamed_event_defaults_to_message() {
        let mut decoder = SseDecoder::default();
        let signals = decoder.feed(b"data: {\"type\":\"ping\"}\n\n");
        assert_eq!(
            signals,
            vec![TransportSignal::message("message", "{\"type\":\"ping\"}")]
        );
    }

    #[test]
    fn joins_multiline_data() {
        let mut decoder = SseDecoder::default();
        let signals = decoder.feed(b"event: note\ndata: line one\ndata: line two\n\n");
        assert_eq!(
            signals,
            vec![TransportSignal::message("note", "line one\nline two")]
        );
    }

    #[test]
    fn handles_events_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"event: session_clo").is_empty());
        assert!(decoder.feed(b"sed\r\ndata: {}").is_empty());

        let signals = decoder.feed(b"\r\n\r\n");
        assert_eq!(signals, vec![TransportSignal::message("session_closed", "{}")]);
    }

    #[test]
    fn oversized_event_closes_the_stream() {
        let mut decoder = SseDecoder::with_limit(16);
        assert_eq!(decoder.feed(b"data: short\n\n").len(), 1);

        let signals = decoder.feed(b"data: this line never ends and keeps going");
        assert_eq!(signals.len(), 2);
        assert!(matches!(signals[0], TransportSignal::Error(_)));
        assert!(matches!(
            signals[1],
            TransportSignal::Close(CloseReason::Network(_))
        ));

        assert!(decoder.feed(b"\n\ndata: ok\n\n").is_empty());
    }

    #[test]
    fn oversized_multiline_data_closes_the_stream() {
        let mut decoder = SseDecoder::with_limit(16);
        let signals = decoder.feed(b"data: 0123456789\ndata: 0123456789\n");
        assert!(matches!(
            signals.last(),
            Some(TransportSignal::Close(CloseReason::Network(_)))
        ));
    }

    #[tokio::test]
    async fn reader_stops_after_overflow() {
        let body = stream::iter(vec![
            Ok::<_, String>(b"data: 1\n\n".to_vec()),
            Ok(b"data: 0123456789abcdef0123456789".to_vec()),
            Ok(b"\n\n".to_vec()),
        ]);
        let mut reader = SseReader::new(body);
        reader.decoder = SseDecoder::with_limit(16);

        let mut signals = Vec::new();
        while let Some(signal) = reader.next_signal().await {
            signals.push(signal);
        }

        assert_eq!(signals.len(), 3);
        assert_eq!(signals[0], TransportSignal::message("message", "1"));
        assert!(matches!(
            signals[2],
            TransportSignal::Close(CloseReason::Network(_))
        ));
    }

    #[test]
    fn ignores_comments_and_unknown_fields() {
        let mut decoder = SseDecoder::default();
        let signals = decoder.feed(b": keep-alive\nid: 42\nretry: 5000\n\n");
        assert!(signals.is_empty());
    }

    #[test]
    fn event_name_does_not_leak_into_next_event() {
        let mut decoder = SseDecoder::default();
        let signals = decoder.feed(b"event: bid_placed\ndata: 1\n\ndata: 2\n\n");
        assert_eq!(
            signals,
            vec![
                TransportSignal::message("bid_placed", "1"),
                TransportSignal::message("message", "2"),
            ]
        );
    }

    #[tokio::test]
    async fn reader_reports_read_failure_then_closes() {
        let body = stream::iter(vec![
            Ok::<_, String>(b"event: ping\ndata: x\n\n".to_vec()),
            Err("connection reset".to_string()),
        ]);
        let mut reader = SseReader::new(body);

        assert_eq!(
            reader.next_signal().await,
            Some(TransportSignal::message("ping", "x"))
        );
        assert_eq!(
            reader.next_signal().await,
            Some(TransportSignal::Error("connection reset".to_string()))
        );
        assert_eq!(
            reader.next_signal().await,
            Some(TransportSignal::Close(CloseReason::Network(
                "connection reset".to_string()
            )))
        );
        assert_eq!(reader.next_signal().await, None);
    }

    #[tokio::test]
    async fn reader_closes_cleanly_at_end_of_body() {
        let body = stream::iter(vec![Ok::<_, String>(b"data: partial".to_vec())]);
        let mut reader = SseReader::new(body);

        assert_eq!(
            reader.next_signal().await,
            Some(TransportSignal::Close(CloseReason::Ended))
        );
        assert_eq!(reader.next_signal().await, None);
    }

    #[test]
    fn stream_url_substitutes_topic() {
        let config = SseConfig::new("https://api.example.com/");
        let topic = Topic::new("sess-42").unwrap();
        assert_eq!(
            config.stream_url(&topic),
            "https://api.example.com/sessions/sess-42/events"
        );
    }
}
