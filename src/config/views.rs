//! View and UI timing configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ConfigValidationError;

/// Window sizes and UI timings
#[derive(Debug, Clone, Deserialize)]
pub struct ViewsConfig {
    #[serde(default = "default_complaint_page_size")]
    pub complaint_page_size: usize,

    #[serde(default = "default_notification_page_size")]
    pub notification_page_size: usize,

    /// Upper bound on complaints held for the map
    #[serde(default = "default_map_window_size")]
    pub map_window_size: usize,

    #[serde(default = "default_toast_lifetime")]
    pub toast_lifetime_ms: u64,

    #[serde(default = "default_map_debounce")]
    pub map_debounce_ms: u64,

    #[serde(default = "default_statistics_debounce")]
    pub statistics_debounce_ms: u64,

    /// Raise a toast when a complaint changes
    #[serde(default = "default_announce")]
    pub announce_complaint_updates: bool,
}

impl ViewsConfig {
    pub fn toast_lifetime(&self) -> Duration {
        Duration::from_millis(self.toast_lifetime_ms)
    }

    pub fn map_debounce(&self) -> Duration {
        Duration::from_millis(self.map_debounce_ms)
    }

    pub fn statistics_debounce(&self) -> Duration {
        Duration::from_millis(self.statistics_debounce_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (name, size) in [
            ("complaints", self.complaint_page_size),
            ("notifications", self.notification_page_size),
            ("map", self.map_window_size),
        ] {
            if size == 0 {
                return Err(ConfigValidationError::InvalidPageSize(name));
            }
        }
        Ok(())
    }
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            complaint_page_size: default_complaint_page_size(),
            notification_page_size: default_notification_page_size(),
            map_window_size: default_map_window_size(),
            toast_lifetime_ms: default_toast_lifetime(),
            map_debounce_ms: default_map_debounce(),
            statistics_debounce_ms: default_statistics_debounce(),
            announce_complaint_updates: default_announce(),
        }
    }
}

fn default_complaint_page_size() -> usize {
    10
}

fn default_notification_page_size() -> usize {
    20
}

fn default_map_window_size() -> usize {
    500
}

fn default_toast_lifetime() -> u64 {
    5_000
}

fn default_map_debounce() -> u64 {
    300
}

fn default_statistics_debounce() -> u64 {
    1_000
}

fn default_announce() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_views_defaults() {
        let views = ViewsConfig::default();
        assert_eq!(views.complaint_page_size, 10);
        assert_eq!(views.map_debounce(), Duration::from_millis(300));
        assert_eq!(views.toast_lifetime(), Duration::from_secs(5));
        assert!(views.announce_complaint_updates);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let views = ViewsConfig {
            notification_page_size: 0,
            ..Default::default()
        };
        assert_eq!(
            views.validate(),
            Err(ConfigValidationError::InvalidPageSize("notifications"))
        );
    }
}
