//! Authentication configuration

use secrecy::Secret;
use serde::Deserialize;

use crate::domain::foundation::Credentials;

/// Bearer credential shared by the REST client and both live channels
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Bearer token; absent for backends running without auth
    #[serde(default)]
    pub token: Option<Secret<String>>,
}

impl AuthConfig {
    pub fn credentials(&self) -> Credentials {
        match &self.token {
            Some(token) => Credentials::from_secret(token.clone()),
            None => Credentials::anonymous(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_is_anonymous() {
        assert_eq!(AuthConfig::default().credentials().token(), None);
    }

    #[test]
    fn test_token_is_redacted_in_debug() {
        let config = AuthConfig {
            token: Some(Secret::new("abc.def".to_string())),
        };
        assert_eq!(config.credentials().token(), Some("abc.def"));
        assert!(!format!("{:?}", config).contains("abc.def"));
    }
}
