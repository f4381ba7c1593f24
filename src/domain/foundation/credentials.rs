//! Bearer credential presented by both live channels and the REST client.

use secrecy::{ExposeSecret, Secret};

/// Bearer credential established before connecting.
///
/// The token itself is never logged; `Debug` is redacted by `Secret`.
#[derive(Debug, Clone)]
pub struct Credentials {
    token: Option<Secret<String>>,
}

impl Credentials {
    /// Creates credentials carrying a bearer token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(Secret::new(token.into())),
        }
    }

    /// Creates credentials from an already-wrapped secret.
    pub fn from_secret(token: Secret<String>) -> Self {
        Self { token: Some(token) }
    }

    /// Credentials with no token, for backends running without auth.
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    /// Returns the raw token, if any.
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_ref()
            .map(|t| t.expose_secret().as_str())
            .filter(|t| !t.is_empty())
    }

    /// Returns the `Authorization` header value, if a token is present.
    pub fn authorization_header(&self) -> Option<String> {
        self.token().map(|t| format!("Bearer {}", t))
    }
}
