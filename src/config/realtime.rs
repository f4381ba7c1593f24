//! Live channel configuration

use serde::Deserialize;
use std::time::Duration;

use super::client::Environment;
use super::error::ConfigValidationError;
use crate::domain::connection::{BackoffPolicy, ReconnectPolicy};

/// Socket and stream channel configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// STOMP-over-WebSocket endpoint, e.g. `ws://localhost:8080/ws`
    pub socket_url: String,

    /// Server-sent events path under the API base URL
    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    /// Consecutive failures tolerated before a channel gives up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed backoff interval, or the exponential base
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_ms: u64,

    #[serde(default)]
    pub backoff: BackoffKind,

    /// Upper bound for exponential backoff
    #[serde(default = "default_backoff_ceiling")]
    pub backoff_ceiling_ms: u64,

    /// Inbound silence longer than this is treated as a dead connection
    #[serde(default)]
    pub liveness_timeout_secs: Option<u64>,

    /// Handshake timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// Backoff strategy between reconnect attempts
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

impl RealtimeConfig {
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        let interval = Duration::from_millis(self.reconnect_interval_ms);
        let backoff = match self.backoff {
            BackoffKind::Fixed => BackoffPolicy::Fixed { interval },
            BackoffKind::Exponential => BackoffPolicy::Exponential {
                base: interval,
                ceiling: Duration::from_millis(self.backoff_ceiling_ms),
            },
        };
        ReconnectPolicy {
            max_attempts: self.max_attempts,
            backoff,
        }
    }

    pub fn liveness_timeout(&self) -> Option<Duration> {
        self.liveness_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Validate live channel configuration
    ///
    /// In production, requires WSS for the socket.
    pub fn validate(&self, environment: Environment) -> Result<(), ConfigValidationError> {
        if self.socket_url.is_empty() {
            return Err(ConfigValidationError::MissingRequired("REALTIME__SOCKET_URL"));
        }
        if !self.socket_url.starts_with("ws://") && !self.socket_url.starts_with("wss://") {
            return Err(ConfigValidationError::InvalidSocketUrl(self.socket_url.clone()));
        }
        if self.max_attempts == 0 {
            return Err(ConfigValidationError::InvalidMaxAttempts);
        }
        if self.reconnect_interval_ms == 0
            || (self.backoff == BackoffKind::Exponential && self.backoff_ceiling_ms < self.reconnect_interval_ms)
        {
            return Err(ConfigValidationError::InvalidBackoff);
        }
        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > 300 {
            return Err(ConfigValidationError::InvalidConnectTimeout);
        }
        if environment == Environment::Production && !self.socket_url.starts_with("wss://") {
            return Err(ConfigValidationError::SocketMustBeWss);
        }
        Ok(())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            socket_url: String::new(),
            stream_path: default_stream_path(),
            max_attempts: default_max_attempts(),
            reconnect_interval_ms: default_reconnect_interval(),
            backoff: BackoffKind::default(),
            backoff_ceiling_ms: default_backoff_ceiling(),
            liveness_timeout_secs: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_stream_path() -> String {
    "/notifications/stream".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_reconnect_interval() -> u64 {
    5_000
}

fn default_backoff_ceiling() -> u64 {
    60_000
}

fn default_connect_timeout() -> u64 {
    10
}
