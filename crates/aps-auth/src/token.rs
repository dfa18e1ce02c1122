//! Raw token endpoint grants
//!
//! The two POSTs the broker is built from:
//! 1. `authorization_code` grant (initial consent completion)
//! 2. `refresh_token` grant, with an explicit `scope` parameter — replaying
//!    the refresh token under a narrower scope is how the restricted public
//!    token is minted from the same consent
//!
//! Both authenticate with HTTP Basic (client id + secret) per the APS
//! OAuth v2 token endpoint.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AuthConfig;
use crate::constants::{AUTHORIZE_PATH, TOKEN_PATH};
use crate::error::{Error, Result};

/// Response from the token endpoint for both grant types.
///
/// `expires_in` is a delta in seconds from response time; the broker
/// converts it to an absolute unix millisecond timestamp when assembling
/// a `Credentials` value.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires (delta, not absolute)
    pub expires_in: u64,
}

/// OAuth client bound to one application configuration.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    pub(crate) config: AuthConfig,
}

impl AuthClient {
    pub fn new(http: reqwest::Client, config: AuthConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Build the provider consent URL the login route redirects to.
    ///
    /// Consent is requested under the internal (broad) scope; the public
    /// token is derived later by scope-narrowing refresh, so the user only
    /// ever sees one consent prompt.
    pub fn authorization_url(&self) -> String {
        format!(
            "{}{}?response_type=code&client_id={}&redirect_uri={}&scope={}",
            self.config.base_url,
            AUTHORIZE_PATH,
            self.config.client_id,
            urlencoded(&self.config.callback_url),
            urlencoded(&self.config.internal_scope),
        )
    }

    /// Exchange a single-use authorization code for a token pair.
    pub async fn code_grant(&self, code: &str) -> Result<TokenResponse> {
        debug!("submitting authorization_code grant");
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.config.callback_url),
        ])
        .await
    }

    /// Rotate a refresh token, narrowing to `scope`.
    ///
    /// The provider issues a new refresh token on every use; the previous
    /// one is dead the moment this call succeeds.
    pub async fn refresh_grant(&self, refresh: &str, scope: &str) -> Result<TokenResponse> {
        debug!(scope, "submitting refresh_token grant");
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh),
            ("scope", scope),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let url = format!("{}{}", self.config.base_url, TOKEN_PATH);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.client_id, Some(self.config.client_secret()))
            .form(form)
            .send()
            .await
            .map_err(|e| Error::Http(format!("token endpoint request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));

            // 4xx means the grant itself was rejected: bad/expired/consumed
            // code or a revoked refresh token
            if status.is_client_error() {
                return Err(Error::AuthExchange(format!(
                    "token endpoint returned {status}: {body}"
                )));
            }

            return Err(Error::Http(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

/// Minimal URL encoding for parameter values.
/// Only encodes characters that would break URL parameter parsing.
fn urlencoded(s: &str) -> String {
    s.replace(' ', "%20")
        .replace(':', "%3A")
        .replace('/', "%2F")
}
