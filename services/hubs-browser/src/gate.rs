//! The session gate
//!
//! Runs at the top of every credential-requiring handler: resolves the
//! session cookie to stored `Credentials`, refreshing them through the
//! broker first when stale. No cookie or no stored session means 401 before
//! any handler body runs or any upstream call is made.

use aps_auth::{Credentials, now_millis};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::metrics;
use crate::state::AppState;

/// Validate the request's session, refreshing expired credentials in place.
///
/// Returns the session id and the (possibly refreshed) credentials the
/// handler should use. Exactly one refresh happens per call when the stored
/// value is stale; a failed refresh propagates as an authentication error
/// with no retry and no fallback.
pub async fn authenticate(
    state: &AppState,
    jar: &CookieJar,
) -> Result<(String, Credentials), ApiError> {
    let session_id = jar
        .get(&state.cookie.name)
        .map(|c| c.value().to_string())
        .ok_or(ApiError::Unauthenticated)?;

    let credentials = state
        .sessions
        .get(&session_id)
        .await
        .ok_or(ApiError::Unauthenticated)?;

    if !credentials.is_expired(now_millis()) {
        return Ok((session_id, credentials));
    }

    debug!("session credentials expired, refreshing");
    let refreshed = match state.auth.refresh(&credentials.refresh_token).await {
        Ok(credentials) => credentials,
        Err(e) => {
            metrics::record_token_refresh("error");
            return Err(e.into());
        }
    };
    metrics::record_token_refresh("ok");

    // Refreshes on one session are not serialized: two concurrent requests
    // may both refresh, the last store write wins, and the loser holds a
    // rotated-away refresh token that will fail its next use. The next
    // request on that session then re-authenticates from scratch.
    state
        .sessions
        .set(session_id.clone(), refreshed.clone())
        .await;
    info!("session credentials refreshed");

    Ok((session_id, refreshed))
}
