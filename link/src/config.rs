//! Configuration for the state store, remote mirror and dataset pipeline.
//!
//! All values have defaults matching the production deployment, so most
//! callers only override the key/value endpoint.
//!
//! # Examples
//!
//! ```rust
//! use instances_link::LinkConfig;
//! use std::time::Duration;
//!
//! // Use defaults
//! let config = LinkConfig::default();
//! assert_eq!(config.write_debounce(), Duration::from_millis(300));
//!
//! // Point at a self-hosted mirror
//! let config = LinkConfig::builder()
//!     .kv_url("http://localhost:8787/")
//!     .shard_count(4)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.shard_count, 4);
//! ```

use crate::error::{LinkError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Environment variable overriding [`LinkConfig::kv_url`].
pub const ENV_KV_URL: &str = "INSTANCES_KV_URL";

/// Environment variable overriding [`LinkConfig::asset_base_url`].
pub const ENV_ASSET_BASE_URL: &str = "INSTANCES_ASSET_BASE_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Base URL of the key/value mirror. Snapshots are POSTed here and read
    /// back from `<kv_url>/<id>`.
    #[serde(default = "default_kv_url")]
    pub kv_url: String,

    /// Origin that relative shard paths are resolved against.
    #[serde(default = "default_asset_base_url")]
    pub asset_base_url: String,

    /// Quiet period after the last edit before a snapshot is uploaded.
    /// Default: 300ms
    #[serde(default = "default_write_debounce_ms")]
    pub write_debounce_ms: u64,

    /// Page-local key prefix for current-schema records (`<prefix><path>`).
    #[serde(default = "default_storage_prefix")]
    pub storage_prefix: String,

    /// Page-local key holding the sticky currency shared by every path.
    #[serde(default = "default_currency_storage_key")]
    pub currency_storage_key: String,

    /// Currency used when neither the session nor storage knows one.
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Number of shards a `{}` path template expands into.
    #[serde(default = "default_shard_count")]
    pub shard_count: usize,
}

fn default_kv_url() -> String {
    "https://instanceskv.vantagesh.workers.dev/".to_string()
}

fn default_asset_base_url() -> String {
    "https://instances.vantage.sh/".to_string()
}

fn default_write_debounce_ms() -> u64 {
    300
}

fn default_storage_prefix() -> String {
    "gstate-".to_string()
}

fn default_currency_storage_key() -> String {
    "last_currency".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_shard_count() -> usize {
    10
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            kv_url: default_kv_url(),
            asset_base_url: default_asset_base_url(),
            write_debounce_ms: default_write_debounce_ms(),
            storage_prefix: default_storage_prefix(),
            currency_storage_key: default_currency_storage_key(),
            default_currency: default_currency(),
            shard_count: default_shard_count(),
        }
    }
}

impl LinkConfig {
    /// Create a new builder starting from the defaults.
    pub fn builder() -> LinkConfigBuilder {
        LinkConfigBuilder::new()
    }

    /// Load configuration from a TOML file.
    ///
    /// Missing keys fall back to their defaults. Environment overrides are
    /// applied separately via [`apply_env_overrides`](Self::apply_env_overrides).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            LinkError::ConfigurationError(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: LinkConfig = toml::from_str(&content).map_err(|e| {
            LinkError::ConfigurationError(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `INSTANCES_KV_URL` / `INSTANCES_ASSET_BASE_URL` if set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(ENV_KV_URL) {
            if !value.trim().is_empty() {
                self.kv_url = value.trim().to_string();
            }
        }
        if let Ok(value) = std::env::var(ENV_ASSET_BASE_URL) {
            if !value.trim().is_empty() {
                self.asset_base_url = value.trim().to_string();
            }
        }
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.kv_url).map_err(|e| {
            LinkError::ConfigurationError(format!("Invalid kv_url '{}': {}", self.kv_url, e))
        })?;
        Url::parse(&self.asset_base_url).map_err(|e| {
            LinkError::ConfigurationError(format!(
                "Invalid asset_base_url '{}': {}",
                self.asset_base_url, e
            ))
        })?;

        if self.storage_prefix.is_empty() {
            return Err(LinkError::ConfigurationError(
                "storage_prefix cannot be empty".to_string(),
            ));
        }
        if self.currency_storage_key.is_empty() {
            return Err(LinkError::ConfigurationError(
                "currency_storage_key cannot be empty".to_string(),
            ));
        }
        // The sticky currency must never be mistaken for a page record.
        if self.currency_storage_key.starts_with(&self.storage_prefix) {
            return Err(LinkError::ConfigurationError(format!(
                "currency_storage_key '{}' collides with storage_prefix '{}'",
                self.currency_storage_key, self.storage_prefix
            )));
        }
        if self.shard_count == 0 {
            return Err(LinkError::ConfigurationError(
                "shard_count must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn write_debounce(&self) -> Duration {
        Duration::from_millis(self.write_debounce_ms)
    }

    /// Page-local key for a path's current-schema record.
    pub fn state_key(&self, path: &str) -> String {
        format!("{}{}", self.storage_prefix, path)
    }
}

/// Builder for [`LinkConfig`].
#[derive(Debug, Clone)]
pub struct LinkConfigBuilder {
    config: LinkConfig,
}

impl LinkConfigBuilder {
    fn new() -> Self {
        Self {
            config: LinkConfig::default(),
        }
    }

    pub fn kv_url(mut self, url: impl Into<String>) -> Self {
        self.config.kv_url = url.into();
        self
    }

    pub fn asset_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.asset_base_url = url.into();
        self
    }

    pub fn write_debounce(mut self, debounce: Duration) -> Self {
        self.config.write_debounce_ms = debounce.as_millis() as u64;
        self
    }

    pub fn write_debounce_ms(mut self, ms: u64) -> Self {
        self.config.write_debounce_ms = ms;
        self
    }

    pub fn storage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.storage_prefix = prefix.into();
        self
    }

    pub fn currency_storage_key(mut self, key: impl Into<String>) -> Self {
        self.config.currency_storage_key = key.into();
        self
    }

    pub fn default_currency(mut self, currency: impl Into<String>) -> Self {
        self.config.default_currency = currency.into();
        self
    }

    pub fn shard_count(mut self, count: usize) -> Self {
        self.config.shard_count = count;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<LinkConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
