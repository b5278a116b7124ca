//! Runtime configuration
//!
//! Loading flow:
//! 1. Start with [`SyncConfig::default()`]
//! 2. If a JSON config file is given, its values replace the defaults
//! 3. Apply `REALTIME_*` environment variable overrides (highest priority)
//!
//! Endpoint fields are kept as raw strings. Turning them into a connection URL
//! never fails; see [`crate::connection::endpoint`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SyncError};

/// Environment variable names read by [`SyncConfig::apply_env_overrides`]
pub mod env {
    pub const API_URL: &str = "REALTIME_API_URL";
    pub const WS_URL: &str = "REALTIME_WS_URL";
    pub const PAGE_ORIGIN: &str = "REALTIME_PAGE_ORIGIN";
    pub const PROJECT_ID: &str = "REALTIME_PROJECT_ID";
    pub const ENV_ID: &str = "REALTIME_ENV_ID";
    pub const TOKEN: &str = "REALTIME_TOKEN";
}

/// Reconnect backoff settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// First reconnect delay, also the value restored after a successful open
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay
    pub max_delay_ms: u64,
    /// Multiplier applied after each scheduled attempt
    pub factor: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            max_delay_ms: 15000,
            factor: 2,
        }
    }
}

/// Configuration for one realtime session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the REST API, e.g. `https://api.example.com`
    pub api_url: Option<String>,

    /// Explicit WebSocket base; ws(s), http(s) or a bare `host:port`
    pub ws_url: Option<String>,

    /// Origin of the hosting page, e.g. `https://admin.example.com`
    pub page_origin: Option<String>,

    pub project_id: String,

    /// Numeric environment id sent as `env_id`
    pub env_id: u64,

    /// Bearer token carried in the `token` query parameter
    pub token: Option<String>,

    /// Give up on a connection attempt after this long
    pub connect_timeout_ms: u64,

    pub backoff: BackoffConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            ws_url: None,
            page_origin: None,
            project_id: String::new(),
            env_id: 0,
            token: None,
            connect_timeout_ms: 10_000,
            backoff: BackoffConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Create a config for a project/environment pair with default settings
    pub fn new(project_id: impl Into<String>, env_id: u64) -> Self {
        Self {
            project_id: project_id.into(),
            env_id,
            ..Self::default()
        }
    }

    /// Load configuration from an optional file plus the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Read a JSON config file. Absent keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(?path, "loading realtime config from file");
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)
            .map_err(|e| SyncError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Override fields from `REALTIME_*` variables resolved through `lookup`
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(value) = get(env::API_URL) {
            self.api_url = Some(value);
        }
        if let Some(value) = get(env::WS_URL) {
            self.ws_url = Some(value);
        }
        if let Some(value) = get(env::PAGE_ORIGIN) {
            self.page_origin = Some(value);
        }
        if let Some(value) = get(env::PROJECT_ID) {
            self.project_id = value;
        }
        if let Some(value) = get(env::ENV_ID) {
            self.env_id = value.trim().parse().map_err(|_| {
                SyncError::Config(format!("{} must be numeric, got {:?}", env::ENV_ID, value))
            })?;
        }
        if let Some(value) = get(env::TOKEN) {
            self.token = Some(value);
        }
        Ok(())
    }

    /// Check the values a session cannot run without
    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(SyncError::Config("project_id is required".to_string()));
        }
        if self.backoff.initial_delay_ms == 0 {
            return Err(SyncError::Config(
                "backoff.initial_delay_ms must be greater than zero".to_string(),
            ));
        }
        if self.backoff.max_delay_ms < self.backoff.initial_delay_ms {
            return Err(SyncError::Config(
                "backoff.max_delay_ms must not be below initial_delay_ms".to_string(),
            ));
        }
        if self.backoff.factor == 0 {
            return Err(SyncError::Config("backoff.factor must be at least 1".to_string()));
        }
        Ok(())
    }
}
