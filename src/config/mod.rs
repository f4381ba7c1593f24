//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CIVIC_LIVE` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use civic_live_sync::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Streaming from {}", config.stream_url());
//! ```

mod api;
mod auth;
mod client;
mod error;
mod realtime;
mod views;

pub use api::ApiConfig;
pub use auth::AuthConfig;
pub use client::{ClientConfig, Environment, LogFormat};
pub use error::{ConfigError, ConfigValidationError};
pub use realtime::{BackoffKind, RealtimeConfig};
pub use views::ViewsConfig;

use serde::Deserialize;

use crate::application::{LiveChannelConfig, LiveSyncSettings, StoreConfig};
use crate::domain::connection::Topic;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Environment and logging
    #[serde(default)]
    pub client: ClientConfig,

    /// REST endpoint
    pub api: ApiConfig,

    /// Bearer credential
    #[serde(default)]
    pub auth: AuthConfig,

    /// Live channels
    pub realtime: RealtimeConfig,

    /// Window sizes and UI timings
    #[serde(default)]
    pub views: ViewsConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CIVIC_LIVE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CIVIC_LIVE__API__BASE_URL=...` -> `api.base_url = ...`
    /// - `CIVIC_LIVE__REALTIME__MAX_ATTEMPTS=3` -> `realtime.max_attempts = 3`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CIVIC_LIVE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ConfigValidationError` for bad URL schemes, out-of-range
    /// timeouts, zero page sizes or a zero retry bound, and for plain
    /// HTTP/WS endpoints in production.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let environment = self.client.environment;
        self.api.validate(environment)?;
        self.realtime.validate(environment)?;
        self.views.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.client.is_production()
    }

    /// Full URL of the server-sent notification stream.
    pub fn stream_url(&self) -> String {
        self.api.url(&self.realtime.stream_path)
    }

    /// Synchronizer settings derived from the realtime and views sections.
    pub fn live_sync_settings(&self) -> LiveSyncSettings {
        let channel = LiveChannelConfig::default()
            .with_policy(self.realtime.reconnect_policy())
            .with_liveness_timeout(self.realtime.liveness_timeout());

        LiveSyncSettings {
            store: StoreConfig {
                complaint_page_size: self.views.complaint_page_size,
                notification_page_size: self.views.notification_page_size,
                map_window_size: self.views.map_window_size,
            },
            socket: channel.clone().with_topics(Topic::defaults()),
            stream: channel,
            toast_lifetime: self.views.toast_lifetime(),
            map_debounce: self.views.map_debounce(),
            statistics_debounce: self.views.statistics_debounce(),
            announce_complaint_updates: self.views.announce_complaint_updates,
        }
    }
}
