//! Real-time delivery configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::realtime::RegistryConfig;
use crate::domain::realtime::ReconnectPolicy;

/// Upper bound on configured reconnect attempts
const MAX_RECONNECT_ATTEMPTS: u32 = 50;

/// Reconnection, fallback polling and refresh settings
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Delay unit in milliseconds; attempt n waits n times this
    #[serde(default = "default_base_delay")]
    pub reconnect_base_delay_ms: u64,

    /// Cap on any single reconnect delay in milliseconds
    #[serde(default = "default_max_delay")]
    pub reconnect_max_delay_ms: u64,

    /// Reconnect attempts before falling back to polling
    #[serde(default = "default_max_attempts")]
    pub max_reconnect_attempts: u32,

    /// Fallback poll interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Minimum spacing of refetches per topic in milliseconds
    #[serde(default = "default_debounce")]
    pub refresh_debounce_ms: u64,

    /// HTTP statuses that skip retries and fall back immediately
    #[serde(default = "default_terminal_statuses")]
    pub terminal_close_statuses: Vec<u16>,
}

impl RealtimeConfig {
    /// Reconnection policy built from these settings
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::default()
            .with_base_delay(Duration::from_millis(self.reconnect_base_delay_ms))
            .with_max_delay(Duration::from_millis(self.reconnect_max_delay_ms))
            .with_max_attempts(self.max_reconnect_attempts)
            .with_terminal_statuses(self.terminal_close_statuses.clone())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }

    /// Registry settings built from these settings
    pub fn registry(&self) -> RegistryConfig {
        RegistryConfig {
            policy: self.reconnect_policy(),
            poll_interval: self.poll_interval(),
        }
    }

    /// Validate real-time configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.reconnect_base_delay_ms == 0 {
            return Err(ValidationError::InvalidDelay("realtime.reconnect_base_delay_ms"));
        }
        if self.reconnect_max_delay_ms < self.reconnect_base_delay_ms {
            return Err(ValidationError::MaxDelayBelowBase);
        }
        if self.max_reconnect_attempts > MAX_RECONNECT_ATTEMPTS {
            return Err(ValidationError::TooManyAttempts);
        }
        if self.poll_interval_ms == 0 {
            return Err(ValidationError::InvalidDelay("realtime.poll_interval_ms"));
        }
        if let Some(status) = self
            .terminal_close_statuses
            .iter()
            .find(|s| !(100..=599).contains(*s))
        {
            return Err(ValidationError::InvalidStatusCode(*status));
        }
        Ok(())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            reconnect_base_delay_ms: default_base_delay(),
            reconnect_max_delay_ms: default_max_delay(),
            max_reconnect_attempts: default_max_attempts(),
            poll_interval_ms: default_poll_interval(),
            refresh_debounce_ms: default_debounce(),
            terminal_close_statuses: default_terminal_statuses(),
        }
    }
}

fn default_base_delay() -> u64 {
    1_000
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_poll_interval() -> u64 {
    10_000
}

fn default_debounce() -> u64 {
    1_000
}

fn default_terminal_statuses() -> Vec<u16> {
    vec![401, 403]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_behavior() {
        let config = RealtimeConfig::default();
        assert_eq!(config.reconnect_policy(), ReconnectPolicy::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.refresh_debounce(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_base_delay() {
        let config = RealtimeConfig {
            reconnect_base_delay_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidDelay(_))
        ));
    }

    #[test]
    fn test_rejects_max_below_base() {
        let config = RealtimeConfig {
            reconnect_base_delay_ms: 5_000,
            reconnect_max_delay_ms: 1_000,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::MaxDelayBelowBase));
    }

    #[test]
    fn test_rejects_excessive_attempts() {
        let config = RealtimeConfig {
            max_reconnect_attempts: 51,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::TooManyAttempts));
    }

    #[test]
    fn test_rejects_bogus_status_code() {
        let config = RealtimeConfig {
            terminal_close_statuses: vec![401, 9000],
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidStatusCode(9000))
        );
    }
}
