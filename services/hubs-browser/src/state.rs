//! Shared application state

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Instant;

use aps_auth::AuthClient;
use aps_data::DataClient;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::session::SessionStore;

/// Shared state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthClient>,
    pub data: Arc<DataClient>,
    pub sessions: Arc<dyn SessionStore>,
    pub cookie: CookieSettings,
    pub metrics: ServiceMetrics,
    pub prometheus: PrometheusHandle,
}

/// Session cookie parameters from config
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
    pub max_age_secs: u64,
}

impl CookieSettings {
    pub fn new(name: impl Into<String>, secure: bool, max_age_secs: u64) -> Self {
        Self {
            name: name.into(),
            secure,
            max_age_secs,
        }
    }
}

/// Atomic counters feeding the health endpoint
#[derive(Clone)]
pub struct ServiceMetrics {
    pub requests_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            errors_total: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}
