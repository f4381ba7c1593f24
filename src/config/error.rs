//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ConfigValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid API base URL: {0}")]
    InvalidApiUrl(String),

    #[error("Invalid socket URL: {0}")]
    InvalidSocketUrl(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid connect timeout")]
    InvalidConnectTimeout,

    #[error("max_attempts must be at least 1")]
    InvalidMaxAttempts,

    #[error("Reconnect interval must be positive and not exceed the ceiling")]
    InvalidBackoff,

    #[error("Page size for {0} must be positive")]
    InvalidPageSize(&'static str),

    #[error("API must use HTTPS in production")]
    ApiMustBeHttps,

    #[error("Socket must use WSS in production")]
    SocketMustBeWss,
}
