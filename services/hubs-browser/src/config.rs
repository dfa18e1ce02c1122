//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The APS client secret is loaded from the APS_CLIENT_SECRET env var or
//! client_secret_file, never stored in the TOML directly to avoid leaking
//! secrets.

use common::Secret;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub aps: ApsConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// HTTP server settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// APS application settings
#[derive(Debug, Deserialize)]
pub struct ApsConfig {
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to the
    /// APS_CLIENT_SECRET env var)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    pub callback_url: String,
    /// Override for the auth endpoints (tests, staging)
    #[serde(default)]
    pub auth_base_url: Option<String>,
    /// Override for the Data Management endpoints
    #[serde(default)]
    pub data_base_url: Option<String>,
    /// Override for the userinfo endpoint
    #[serde(default)]
    pub userinfo_url: Option<String>,
}

/// Session cookie settings
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default)]
    pub cookie_secure: bool,
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            cookie_secure: false,
            max_age_secs: default_max_age_secs(),
        }
    }
}

fn default_max_connections() -> usize {
    1000
}

fn default_cookie_name() -> String {
    "hubs-browser-session".into()
}

fn default_max_age_secs() -> u64 {
    24 * 60 * 60
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Client secret resolution order:
    /// 1. APS_CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.aps.client_id.trim().is_empty() {
            return Err(common::Error::Config("aps.client_id is empty".into()));
        }

        if !config.aps.callback_url.starts_with("http://")
            && !config.aps.callback_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "callback_url must start with http:// or https://, got: {}",
                config.aps.callback_url
            )));
        }

        for url in [&config.aps.auth_base_url, &config.aps.data_base_url] {
            if let Some(url) = url
                && !url.starts_with("http://")
                && !url.starts_with("https://")
            {
                return Err(common::Error::Config(format!(
                    "base URL overrides must start with http:// or https://, got: {url}"
                )));
            }
        }

        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if config.session.max_age_secs == 0 {
            return Err(common::Error::Config(
                "session.max_age_secs must be greater than 0".into(),
            ));
        }

        // Resolve client secret: env var takes precedence over file
        if let Ok(secret) = std::env::var("APS_CLIENT_SECRET") {
            config.aps.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.aps.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.aps.client_secret = Some(Secret::new(secret));
            }
        }

        if config.aps.client_secret.is_none() {
            return Err(common::Error::Config(
                "no APS client secret: set APS_CLIENT_SECRET or client_secret_file".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("hubs-browser.toml")
    }
}
