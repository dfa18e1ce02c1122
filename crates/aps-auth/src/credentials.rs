//! The dual-token credential broker
//!
//! A session's `Credentials` bundles two bearer tokens minted from one user
//! consent: the broad-scope internal token and the restricted-scope public
//! token. The provider enforces scope at issuance, so one token cannot serve
//! both; instead the broker chains two grants off a single refresh token,
//! always keeping the most recently rotated value.
//!
//! `Credentials` is atomic: it is built whole by `exchange_code`/`refresh`
//! and replaced whole, never field-mutated. A refresh invalidates the prior
//! refresh token, so a partially updated value would strand the session.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::token::AuthClient;

/// One session's worth of OAuth credentials.
///
/// `expires_at` is a unix timestamp in milliseconds (absolute, not a delta),
/// computed from the internal (first-stage) grant's reported lifetime. The
/// two tokens are issued close enough together that one clock is acceptable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Restricted-scope token safe to hand to client-side viewer code
    pub public_token: String,
    /// Broad-scope token for server-side data reads
    pub internal_token: String,
    /// Single refresh token valid for both kinds; rotates on every use,
    /// only the latest value is live
    pub refresh_token: String,
    /// Expiration as unix timestamp in milliseconds
    pub expires_at: u64,
}

impl Credentials {
    /// Whether the access tokens must be treated as stale at `now_millis`.
    pub fn is_expired(&self, now_millis: u64) -> bool {
        self.expires_at <= now_millis
    }
}

/// Current unix time in milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl AuthClient {
    /// Convert a single-use authorization code into a fresh `Credentials`.
    ///
    /// Stage one exchanges the code under the internal scope, yielding the
    /// internal token, a refresh token, and the lifetime. Stage two replays
    /// that refresh token under the public scope to mint the public token
    /// and rotate the refresh token. Either stage failing fails the whole
    /// operation; no partial value escapes.
    pub async fn exchange_code(&self, code: &str) -> Result<Credentials> {
        let internal = self.code_grant(code).await?;
        let public = self
            .refresh_grant(&internal.refresh_token, &self.config.public_scope)
            .await?;

        debug!("authorization code exchanged for credential pair");
        Ok(Credentials {
            public_token: public.access_token,
            internal_token: internal.access_token,
            refresh_token: public.refresh_token,
            expires_at: now_millis() + internal.expires_in * 1000,
        })
    }

    /// Rebuild `Credentials` from a refresh token after expiry.
    ///
    /// Same two-stage pattern as `exchange_code`: refresh under the internal
    /// scope to rotate the pair, then refresh again under the public scope
    /// using the token stage one produced. The returned refresh token is
    /// always the second stage's — the most recently rotated value.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Credentials> {
        let internal = self
            .refresh_grant(refresh_token, &self.config.internal_scope)
            .await?;
        let public = self
            .refresh_grant(&internal.refresh_token, &self.config.public_scope)
            .await?;

        debug!("credential pair refreshed");
        Ok(Credentials {
            public_token: public.access_token,
            internal_token: internal.access_token,
            refresh_token: public.refresh_token,
            expires_at: now_millis() + internal.expires_in * 1000,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::constants::TOKEN_PATH;
    use crate::error::Error;
    use axum::Router;
    use axum::extract::{Form, State};
    use axum::http::StatusCode;
    use axum::routing::post;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use tokio::sync::Mutex;

    /// Scripted token endpoint: codes are single-use, refresh tokens rotate
    /// on every grant, and refresh grants can be forced to fail.
    #[derive(Default)]
    struct MockProvider {
        consumed_codes: Mutex<HashSet<String>>,
        rotation: AtomicU64,
        /// (grant_type, scope) pairs in arrival order
        grants: Mutex<Vec<(String, String)>>,
        fail_refresh: AtomicBool,
    }

    async fn token_handler(
        State(provider): State<Arc<MockProvider>>,
        Form(form): Form<HashMap<String, String>>,
    ) -> (StatusCode, axum::Json<serde_json::Value>) {
        let grant = form.get("grant_type").cloned().unwrap_or_default();
        let scope = form.get("scope").cloned().unwrap_or_default();
        provider.grants.lock().await.push((grant.clone(), scope.clone()));

        let reject = |msg: &str| {
            (
                StatusCode::BAD_REQUEST,
                axum::Json(serde_json::json!({"error": "invalid_grant", "error_description": msg})),
            )
        };

        match grant.as_str() {
            "authorization_code" => {
                let code = form.get("code").cloned().unwrap_or_default();
                if code != "valid-code" {
                    return reject("unknown code");
                }
                let mut consumed = provider.consumed_codes.lock().await;
                if !consumed.insert(code) {
                    return reject("code already consumed");
                }
                let n = provider.rotation.fetch_add(1, Ordering::SeqCst);
                (
                    StatusCode::OK,
                    axum::Json(serde_json::json!({
                        "access_token": "at_internal_0",
                        "refresh_token": format!("rt_{n}"),
                        "expires_in": 3599,
                    })),
                )
            }
            "refresh_token" => {
                if provider.fail_refresh.load(Ordering::SeqCst) {
                    return reject("refresh token revoked");
                }
                let n = provider.rotation.fetch_add(1, Ordering::SeqCst);
                (
                    StatusCode::OK,
                    axum::Json(serde_json::json!({
                        "access_token": format!("at_{}_{n}", scope.replace(':', "_")),
                        "refresh_token": format!("rt_{n}"),
                        "expires_in": 3599,
                    })),
                )
            }
            _ => reject("unsupported grant type"),
        }
    }

    async fn start_mock_provider() -> (Arc<MockProvider>, AuthClient) {
        let provider = Arc::new(MockProvider::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = Router::new()
            .route(TOKEN_PATH, post(token_handler))
            .with_state(provider.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = AuthConfig::new("cid", "csecret", "http://localhost/cb")
            .with_base_url(format!("http://{addr}"));
        (provider, AuthClient::new(reqwest::Client::new(), config))
    }

    #[tokio::test]
    async fn exchange_code_yields_complete_credentials() {
        let (_provider, client) = start_mock_provider().await;
        let before = now_millis();

        let credentials = client.exchange_code("valid-code").await.unwrap();

        assert!(!credentials.public_token.is_empty());
        assert!(!credentials.internal_token.is_empty());
        assert!(!credentials.refresh_token.is_empty());
        assert!(
            credentials.expires_at > before,
            "expires_at must be strictly in the future"
        );
    }

    #[tokio::test]
    async fn exchange_code_chains_code_then_public_refresh() {
        let (provider, client) = start_mock_provider().await;

        let credentials = client.exchange_code("valid-code").await.unwrap();

        let grants = provider.grants.lock().await.clone();
        assert_eq!(grants.len(), 2, "exactly two grants: code then refresh");
        assert_eq!(grants[0].0, "authorization_code");
        assert_eq!(grants[1], ("refresh_token".into(), "viewables:read".into()));

        // The kept refresh token is the second (rotated) one, and the public
        // token comes from the narrowed refresh grant
        assert_eq!(credentials.refresh_token, "rt_1");
        assert_eq!(credentials.internal_token, "at_internal_0");
        assert!(credentials.public_token.starts_with("at_viewables_read_"));
    }

    #[tokio::test]
    async fn exchange_code_is_single_use() {
        let (_provider, client) = start_mock_provider().await;

        client.exchange_code("valid-code").await.unwrap();
        let replay = client.exchange_code("valid-code").await;

        assert!(
            matches!(replay, Err(Error::AuthExchange(_))),
            "replaying a consumed code must fail the exchange, got: {replay:?}"
        );
    }

    #[tokio::test]
    async fn refresh_runs_broad_then_narrow_stages() {
        let (provider, client) = start_mock_provider().await;

        let credentials = client.refresh("rt_seed").await.unwrap();

        let grants = provider.grants.lock().await.clone();
        assert_eq!(
            grants,
            vec![
                ("refresh_token".into(), "data:read".into()),
                ("refresh_token".into(), "viewables:read".into()),
            ]
        );
        // Final refresh token is the second stage's rotation
        assert_eq!(credentials.refresh_token, "rt_1");
        assert!(credentials.internal_token.starts_with("at_data_read_"));
        assert!(credentials.public_token.starts_with("at_viewables_read_"));
    }

    #[tokio::test]
    async fn second_stage_failure_fails_the_whole_exchange() {
        let (provider, client) = start_mock_provider().await;
        provider.fail_refresh.store(true, Ordering::SeqCst);

        let result = client.exchange_code("valid-code").await;
        assert!(
            matches!(result, Err(Error::AuthExchange(_))),
            "a failed public-token stage must fail the operation whole, got: {result:?}"
        );
    }

    #[tokio::test]
    async fn revoked_refresh_token_fails() {
        let (provider, client) = start_mock_provider().await;
        provider.fail_refresh.store(true, Ordering::SeqCst);

        let result = client.refresh("rt_revoked").await;
        assert!(matches!(result, Err(Error::AuthExchange(_))));
    }

    #[test]
    fn is_expired_compares_against_now() {
        let credentials = Credentials {
            public_token: "pt".into(),
            internal_token: "it".into(),
            refresh_token: "rt".into(),
            expires_at: 1_000,
        };
        assert!(credentials.is_expired(1_000));
        assert!(credentials.is_expired(2_000));
        assert!(!credentials.is_expired(999));
    }

    #[test]
    fn credentials_round_trip_serde() {
        let credentials = Credentials {
            public_token: "pt".into(),
            internal_token: "it".into(),
            refresh_token: "rt".into(),
            expires_at: 1735500000000,
        };
        let json = serde_json::to_string(&credentials).unwrap();
        let back: Credentials = serde_json::from_str(&json).unwrap();
        assert_eq!(back.refresh_token, "rt");
        assert_eq!(back.expires_at, 1735500000000);
    }
}
