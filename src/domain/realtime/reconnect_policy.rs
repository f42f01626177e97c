//! Reconnection policy for closed push connections.
//!
//! ## Decision
//!
//! ```text
//! closure is terminal (configured status / no token) ──▶ GiveUp(Terminal)
//! attempts_made >= max_attempts                      ──▶ GiveUp(Exhausted)
//! otherwise                                          ──▶ RetryAfter(min((attempts_made + 1) * base, max))
//! ```
//!
//! With the defaults (base 1s, 5 attempts) a topic that never connects sees
//! retries after 1s, 2s, 3s, 4s and 5s, and the sixth failure gives up.

use std::fmt;
use std::time::Duration;

/// Why a transport connection closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The far end finished the stream.
    Ended,
    /// Connect or read failure below HTTP.
    Network(String),
    /// The endpoint answered with a non-success status.
    Rejected { status: u16, detail: String },
    /// No bearer token was available for the attempt.
    MissingCredentials,
}

impl CloseReason {
    /// HTTP status attached to the closure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            CloseReason::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Ended => f.write_str("stream ended"),
            CloseReason::Network(detail) => write!(f, "network failure: {}", detail),
            CloseReason::Rejected { status, detail } if detail.is_empty() => {
                write!(f, "rejected with status {}", status)
            }
            CloseReason::Rejected { status, detail } => {
                write!(f, "rejected with status {}: {}", status, detail)
            }
            CloseReason::MissingCredentials => f.write_str("missing credentials"),
        }
    }
}

/// Outcome of a policy decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Schedule another attempt after the delay.
    RetryAfter(Duration),
    /// Stop reconnecting and fall back to polling.
    GiveUp(GiveUpReason),
}

/// Why the policy stopped retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    /// The retry bound was reached.
    Exhausted { attempts: u32 },
    /// The closure is classified as not worth retrying.
    Terminal { status: Option<u16> },
}

/// Linear-capped backoff with a hard attempt bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay unit; attempt `n` waits `n * base_delay`.
    pub base_delay: Duration,

    /// Upper bound for any single delay.
    pub max_delay: Duration,

    /// Reconnect attempts allowed before giving up.
    pub max_attempts: u32,

    /// HTTP statuses that end reconnection immediately.
    pub terminal_statuses: Vec<u16>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            max_attempts: 5,
            terminal_statuses: vec![401, 403],
        }
    }
}

impl ReconnectPolicy {
    /// Sets the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the delay cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the attempt bound.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Replaces the terminal status classification.
    pub fn with_terminal_statuses(mut self, statuses: Vec<u16>) -> Self {
        self.terminal_statuses = statuses;
        self
    }

    /// Delay before the given (1-based) attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .checked_mul(attempt)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Whether a closure should skip retries entirely.
    pub fn is_terminal(&self, reason: &CloseReason) -> bool {
        match reason {
            CloseReason::MissingCredentials => true,
            CloseReason::Rejected { status, .. } => self.terminal_statuses.contains(status),
            CloseReason::Ended | CloseReason::Network(_) => false,
        }
    }

    /// Decides what to do after a closure, given the attempts already made.
    pub fn decide(&self, attempts_made: u32, reason: &CloseReason) -> ReconnectDecision {
        if self.is_terminal(reason) {
            return ReconnectDecision::GiveUp(GiveUpReason::Terminal {
                status: reason.status(),
            });
        }
        if attempts_made >= self.max_attempts {
            return ReconnectDecision::GiveUp(GiveUpReason::Exhausted {
                attempts: attempts_made,
            });
        }
        ReconnectDecision::RetryAfter(self.delay_for(attempts_made + 1))
    }
}
