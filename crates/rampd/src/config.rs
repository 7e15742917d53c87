//! Configuration management for rampd.
//!
//! Loads settings from a TOML file or uses defaults. Every field has a
//! serde default so partial config files keep working across upgrades.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Default config file path.
pub const CONFIG_PATH: &str = "/etc/ramp/config.toml";

/// Content backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the content-management backend.
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:8098".to_string()
}

fn default_backend_timeout() -> u64 {
    5
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RampdConfig {
    /// Address the HTTP API listens on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Directory for persisted learner profiles.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default)]
    pub backend: BackendConfig,

    /// Catalog cache TTL in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Quiet period before a profile write is flushed, in seconds.
    #[serde(default = "default_flush_quiet")]
    pub flush_quiet_secs: u64,

    /// Settle delay after a tier change before the next catalog fetch, in
    /// milliseconds. Best-effort guard against serving a stale-tier catalog.
    #[serde(default = "default_tier_settle_ms")]
    pub tier_settle_ms: u64,

    /// Optional webhook for must-notify domain events.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8710".to_string()
}

fn default_data_dir() -> String {
    "/var/lib/ramp".to_string()
}

fn default_cache_ttl() -> u64 {
    60
}

fn default_flush_quiet() -> u64 {
    2
}

fn default_tier_settle_ms() -> u64 {
    250
}

impl Default for RampdConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            data_dir: default_data_dir(),
            backend: BackendConfig::default(),
            cache_ttl_secs: default_cache_ttl(),
            flush_quiet_secs: default_flush_quiet(),
            tier_settle_ms: default_tier_settle_ms(),
            webhook_url: None,
        }
    }
}

impl RampdConfig {
    /// Load from a config file, falling back to defaults when the file is
    /// missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }
}
