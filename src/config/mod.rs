//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `DEALER_LIVE_` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use dealer_live::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Streaming from {}", config.api.base_url);
//! ```

mod api;
mod error;
mod logging;
mod realtime;

pub use api::ApiConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use realtime::RealtimeConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Bidding API endpoints and timeouts
    pub api: ApiConfig,

    /// Reconnection, fallback polling and refresh settings
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Tracing output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `DEALER_LIVE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `DEALER_LIVE__API__BASE_URL=https://...` -> `api.base_url = ...`
    /// - `DEALER_LIVE__REALTIME__MAX_RECONNECT_ATTEMPTS=8` -> `realtime.max_reconnect_attempts = 8`
    /// - `DEALER_LIVE__REALTIME__TERMINAL_CLOSE_STATUSES=401,403,410` -> list
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("DEALER_LIVE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("realtime.terminal_close_statuses")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load and validate in one step
    pub fn load_validated() -> Result<Self, ConfigError> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// Performs semantic validation of configuration:
    /// - URL scheme and path templates
    /// - Non-zero delays and timeouts
    /// - Reconnect bounds
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.api.validate()?;
        self.realtime.validate()?;
        Ok(())
    }
}
