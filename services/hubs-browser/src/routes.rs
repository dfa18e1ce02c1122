//! HTTP routes
//!
//! Auth routes (login/logout/callback/token/profile) and the gated Data
//! Management pass-through routes, plus the ambient health and metrics
//! endpoints. Every gated handler calls `gate::authenticate` before touching
//! the upstream.

use std::sync::atomic::Ordering;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use aps_auth::now_millis;

use crate::error::ApiError;
use crate::gate;
use crate::metrics;
use crate::session::generate_session_id;
use crate::state::AppState;

/// Build the axum router with all routes and shared state.
///
/// Applies a concurrency limit layer based on `max_connections`.
pub fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/api/auth/login", get(login))
        .route("/api/auth/logout", get(logout))
        .route("/api/auth/callback", get(callback))
        .route("/api/auth/token", get(auth_token))
        .route("/api/auth/profile", get(profile))
        .route("/api/hubs", get(list_hubs))
        .route("/api/hubs/{hub}/projects", get(list_projects))
        .route(
            "/api/hubs/{hub}/projects/{project}/contents",
            get(list_contents),
        )
        .route(
            "/api/hubs/{hub}/projects/{project}/contents/{item}/versions",
            get(list_versions),
        )
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            track_requests,
        ))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

/// Request accounting: atomic counters for /health, Prometheus series for
/// /metrics.
async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let start = Instant::now();
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let response = next.run(request).await;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
    }
    metrics::record_request(status.as_u16(), &method, start.elapsed().as_secs_f64());
    response
}

/// 302 Found, matching what browsers expect from the auth redirects.
fn found(location: &str) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, location.to_string())],
        "",
    )
        .into_response()
}

/// Record upstream failures before converting them for the response.
fn upstream_error(err: aps_data::Error) -> ApiError {
    if let aps_data::Error::Upstream { status, .. } = &err {
        metrics::record_upstream_error(*status);
    }
    err.into()
}

/// GET /api/auth/login — send the browser to the provider consent page.
async fn login(State(state): State<AppState>) -> Response {
    found(&state.auth.authorization_url())
}

/// GET /api/auth/logout — drop the session and clear the cookie.
///
/// Always succeeds: logging out of an absent session is a no-op, and the
/// second call in a row behaves identically to the first.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Response) {
    if let Some(cookie) = jar.get(&state.cookie.name) {
        state.sessions.delete(cookie.value()).await;
        info!("session ended");
    }
    let jar = jar.remove(Cookie::build(state.cookie.name.clone()).path("/"));
    (jar, found("/"))
}

#[derive(Deserialize)]
struct CallbackQuery {
    code: Option<String>,
}

/// GET /api/auth/callback — consume the single-use authorization code.
///
/// On success the exchanged credentials are stored under a fresh session id
/// and the id is set as the session cookie.
async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<(CookieJar, Response), ApiError> {
    let code = query
        .code
        .ok_or_else(|| ApiError::BadRequest("missing code query parameter".into()))?;

    let credentials = state.auth.exchange_code(&code).await?;

    // A relogin replaces the session the browser already holds; without this
    // the old entry would sit in the store until the max-age sweep
    if let Some(previous) = jar.get(&state.cookie.name) {
        state.sessions.delete(previous.value()).await;
    }

    let session_id = generate_session_id();
    state.sessions.set(session_id.clone(), credentials).await;
    info!("session established");

    let cookie = Cookie::build((state.cookie.name.clone(), session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.cookie.secure)
        .max_age(time::Duration::seconds(state.cookie.max_age_secs as i64))
        .build();

    Ok((jar.add(cookie), found("/")))
}

/// GET /api/auth/token — the public (viewer-scope) token for the browser.
async fn auth_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Value>, ApiError> {
    let (_, credentials) = gate::authenticate(&state, &jar).await?;

    let expires_in = credentials.expires_at.saturating_sub(now_millis()) / 1000;
    Ok(Json(serde_json::json!({
        "access_token": credentials.public_token,
        "expires_in": expires_in,
    })))
}

/// GET /api/auth/profile — display name from the provider userinfo endpoint.
async fn profile(State(state): State<AppState>, jar: CookieJar) -> Result<Json<Value>, ApiError> {
    let (_, credentials) = gate::authenticate(&state, &jar).await?;

    let profile = state
        .data
        .user_profile(&credentials.internal_token)
        .await
        .map_err(upstream_error)?;

    Ok(Json(serde_json::json!({
        "name": profile.get("name").cloned().unwrap_or(Value::Null),
    })))
}

/// GET /api/hubs
async fn list_hubs(State(state): State<AppState>, jar: CookieJar) -> Result<Json<Value>, ApiError> {
    let (_, credentials) = gate::authenticate(&state, &jar).await?;

    let hubs = state
        .data
        .hubs(&credentials.internal_token)
        .await
        .map_err(upstream_error)?;
    Ok(Json(hubs))
}

/// GET /api/hubs/{hub}/projects
async fn list_projects(
    State(state): State<AppState>,
    Path(hub): Path<String>,
    jar: CookieJar,
) -> Result<Json<Value>, ApiError> {
    let (_, credentials) = gate::authenticate(&state, &jar).await?;

    let projects = state
        .data
        .projects(&hub, &credentials.internal_token)
        .await
        .map_err(upstream_error)?;
    Ok(Json(projects))
}

#[derive(Deserialize)]
struct ContentsQuery {
    folder: Option<String>,
}

/// GET /api/hubs/{hub}/projects/{project}/contents?folder=
///
/// Lists the project's top folders when `folder` is absent, otherwise the
/// contents of that folder.
async fn list_contents(
    State(state): State<AppState>,
    Path((hub, project)): Path<(String, String)>,
    Query(query): Query<ContentsQuery>,
    jar: CookieJar,
) -> Result<Json<Value>, ApiError> {
    let (_, credentials) = gate::authenticate(&state, &jar).await?;

    let contents = match query.folder {
        None => {
            state
                .data
                .top_folders(&hub, &project, &credentials.internal_token)
                .await
        }
        Some(folder) => {
            state
                .data
                .folder_contents(&project, &folder, &credentials.internal_token)
                .await
        }
    }
    .map_err(upstream_error)?;
    Ok(Json(contents))
}

/// GET /api/hubs/{hub}/projects/{project}/contents/{item}/versions
///
/// The hub segment is part of the route shape but the provider keys item
/// versions by project and item only.
async fn list_versions(
    State(state): State<AppState>,
    Path((_hub, project, item)): Path<(String, String, String)>,
    jar: CookieJar,
) -> Result<Json<Value>, ApiError> {
    let (_, credentials) = gate::authenticate(&state, &jar).await?;

    let versions = state
        .data
        .item_versions(&project, &item, &credentials.internal_token)
        .await
        .map_err(upstream_error)?;
    Ok(Json(versions))
}

/// Health endpoint: uptime, request counters, live session count.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.metrics.started_at.elapsed().as_secs();
    let requests = state.metrics.requests_total.load(Ordering::Relaxed);
    let errors = state.metrics.errors_total.load(Ordering::Relaxed);
    let sessions = state.sessions.len().await;

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        serde_json::json!({
            "status": "healthy",
            "uptime_seconds": uptime,
            "requests_served": requests,
            "errors_total": errors,
            "sessions_active": sessions,
        })
        .to_string(),
    )
}

/// Prometheus metrics endpoint — text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}
