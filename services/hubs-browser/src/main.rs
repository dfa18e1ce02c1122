//! APS Hubs Browser backend
//!
//! Single-binary Rust service that:
//! 1. Walks a user through the Autodesk Platform Services three-legged flow
//! 2. Keeps dual-scope credentials server-side, keyed by a session cookie
//! 3. Re-exposes Data Management reads (hubs, projects, contents, versions)
//! 4. Hands the browser only the restricted viewer-scope token

mod config;
mod error;
mod gate;
mod metrics;
mod routes;
mod session;
mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aps_auth::{AuthClient, AuthConfig};
use aps_data::DataClient;

use crate::config::Config;
use crate::session::MemoryStore;
use crate::state::{AppState, CookieSettings, ServiceMetrics};

/// How long in-flight requests get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting hubs-browser");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        client_id = %config.aps.client_id,
        callback_url = %config.aps.callback_url,
        cookie = %config.session.cookie_name,
        "configuration loaded"
    );

    let client_secret = config
        .aps
        .client_secret
        .as_ref()
        .map(|s| s.expose().clone())
        .context("config loaded without a client secret")?;

    // One connection pool shared by both upstream clients
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build HTTP client")?;

    let mut auth_config = AuthConfig::new(
        config.aps.client_id.clone(),
        client_secret,
        config.aps.callback_url.clone(),
    );
    if let Some(ref base_url) = config.aps.auth_base_url {
        auth_config = auth_config.with_base_url(base_url.clone());
    }

    let mut data_client = DataClient::new(http.clone());
    if let Some(ref base_url) = config.aps.data_base_url {
        data_client = data_client.with_base_url(base_url.clone());
    }
    if let Some(ref url) = config.aps.userinfo_url {
        data_client = data_client.with_userinfo_url(url.clone());
    }

    let app_state = AppState {
        auth: Arc::new(AuthClient::new(http, auth_config)),
        data: Arc::new(data_client),
        sessions: Arc::new(MemoryStore::new(Duration::from_secs(
            config.session.max_age_secs,
        ))),
        cookie: CookieSettings::new(
            config.session.cookie_name.clone(),
            config.session.cookie_secure,
            config.session.max_age_secs,
        ),
        metrics: ServiceMetrics::new(),
        prometheus: prometheus_handle,
    };

    let app = routes::build_router(app_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;

    info!(addr = %listen_addr, "accepting requests");

    // Graceful shutdown with drain timeout enforcement:
    // 1. shutdown_signal() fires on SIGTERM/SIGINT
    // 2. axum stops accepting new connections and drains in-flight requests
    // 3. DRAIN_TIMEOUT keeps a slow client from blocking process exit
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;

    // Signal the server to begin draining, then race drain against timeout
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
