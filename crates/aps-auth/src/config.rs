//! Auth client configuration
//!
//! The client id, secret, and callback URL are bound per `AuthClient`
//! instance through this value rather than through module-level globals, so
//! a process can hold differently-configured clients (production, tests
//! against a mock provider) side by side.

use std::fmt;

use crate::constants::{DEFAULT_AUTH_BASE_URL, INTERNAL_SCOPE, PUBLIC_SCOPE};

/// Configuration for one OAuth application.
#[derive(Clone)]
pub struct AuthConfig {
    pub client_id: String,
    client_secret: String,
    pub callback_url: String,
    /// Base URL for the authorize and token endpoints. Defaults to the
    /// production APS host; overridden in tests to point at a local mock.
    pub base_url: String,
    /// Scope requested for the internal (server-side) token
    pub internal_scope: String,
    /// Scope the refresh grant narrows to when minting the public token
    pub public_scope: String,
}

impl AuthConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            callback_url: callback_url.into(),
            base_url: DEFAULT_AUTH_BASE_URL.into(),
            internal_scope: INTERNAL_SCOPE.into(),
            public_scope: PUBLIC_SCOPE.into(),
        }
    }

    /// Point the client at a different provider host (tests, staging).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The client secret, exposed only for building the token request.
    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

// Manual Debug so the client secret never reaches log output.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("callback_url", &self.callback_url)
            .field("base_url", &self.base_url)
            .field("internal_scope", &self.internal_scope)
            .field("public_scope", &self.public_scope)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_production_host_and_scopes() {
        let config = AuthConfig::new("cid", "csecret", "http://localhost:8080/api/auth/callback");
        assert_eq!(config.base_url, DEFAULT_AUTH_BASE_URL);
        assert_eq!(config.internal_scope, "data:read");
        assert_eq!(config.public_scope, "viewables:read");
    }

    #[test]
    fn with_base_url_overrides_host() {
        let config = AuthConfig::new("cid", "csecret", "http://cb").with_base_url("http://127.0.0.1:9");
        assert_eq!(config.base_url, "http://127.0.0.1:9");
    }

    #[test]
    fn debug_redacts_client_secret() {
        let config = AuthConfig::new("cid", "super-secret", "http://cb");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"), "secret leaked: {debug}");
        assert!(debug.contains("[REDACTED]"));
    }
}
