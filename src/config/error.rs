//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("API base URL must start with http:// or https://")]
    InvalidBaseUrl,

    #[error("Path template {0} must contain {{session_id}}")]
    InvalidPathTemplate(&'static str),

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(&'static str),

    #[error("Invalid delay: {0} must be greater than zero")]
    InvalidDelay(&'static str),

    #[error("Reconnect max delay is below the base delay")]
    MaxDelayBelowBase,

    #[error("Reconnect attempts exceed maximum allowed (50)")]
    TooManyAttempts,

    #[error("Invalid HTTP status code: {0}")]
    InvalidStatusCode(u16),
}
