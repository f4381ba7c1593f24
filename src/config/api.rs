//! REST API configuration

use serde::Deserialize;
use std::time::Duration;

use super::client::Environment;
use super::error::ConfigValidationError;

/// REST endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API root, e.g. `http://localhost:8080/api`
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Joins a path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Validate API configuration
    ///
    /// In production, requires HTTPS.
    pub fn validate(&self, environment: Environment) -> Result<(), ConfigValidationError> {
        if self.base_url.is_empty() {
            return Err(ConfigValidationError::MissingRequired("API__BASE_URL"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigValidationError::InvalidApiUrl(self.base_url.clone()));
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err(ConfigValidationError::InvalidTimeout);
        }
        if environment == Environment::Production && !self.base_url.starts_with("https://") {
            return Err(ConfigValidationError::ApiMustBeHttps);
        }
        Ok(())
    }
}

fn default_request_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            request_timeout_secs: default_request_timeout(),
        }
    }

    #[test]
    fn test_url_joining() {
        assert_eq!(
            config("http://localhost:8080/api/").url("/notifications/stream"),
            "http://localhost:8080/api/notifications/stream"
        );
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        assert_eq!(
            config("ftp://example.com").validate(Environment::Development),
            Err(ConfigValidationError::InvalidApiUrl("ftp://example.com".into()))
        );
    }

    #[test]
    fn test_production_requires_https() {
        let api = config("http://api.example.com");
        assert!(api.validate(Environment::Development).is_ok());
        assert_eq!(
            api.validate(Environment::Production),
            Err(ConfigValidationError::ApiMustBeHttps)
        );
    }

    #[test]
    fn test_validation_invalid_timeout() {
        let mut api = config("http://localhost");
        api.request_timeout_secs = 0;
        assert!(api.validate(Environment::Development).is_err());
        api.request_timeout_secs = 500;
        assert!(api.validate(Environment::Development).is_err());
    }
}
