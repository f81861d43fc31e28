//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (REMOTE_MODELS_*)
//! 2. TOML config file (if REMOTE_MODELS_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::schema::Column;

mod validation;

pub use validation::ConfigError;

/// Environment variable naming the TOML config file.
pub const CONFIG_FILE_ENV: &str = "REMOTE_MODELS_CONFIG_FILE";

/// How page requests are sent to the remote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// `GET <endpoint>?page=N`
    #[default]
    Get,
    /// `POST <endpoint>` with `{model, api_key, page}` as JSON body.
    Post,
}

/// A model declared in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Logical name, e.g. `Celebrity`.
    pub name: String,

    /// Endpoint override: path below `api_path`, or absolute URL.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Explicit schema as `{ name, type }` entries, in column order.
    #[serde(default)]
    pub schema: Option<Vec<Column>>,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (REMOTE_MODELS_*)
/// 2. TOML config file (if REMOTE_MODELS_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote domain, e.g. `https://yourdomain.com/`.
    ///
    /// Set via REMOTE_MODELS_DOMAIN environment variable.
    #[serde(default)]
    pub domain: String,

    /// API path prefix joined between domain and endpoint.
    ///
    /// Set via REMOTE_MODELS_API_PATH environment variable.
    #[serde(default = "default_api_path")]
    pub api_path: String,

    /// Directory holding the per-model cache files.
    ///
    /// Set via REMOTE_MODELS_CACHE_PATH environment variable.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Cache file name prefix.
    ///
    /// Set via REMOTE_MODELS_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Cache TTL in seconds. Unset means freshness by mtime comparison.
    ///
    /// Set via REMOTE_MODELS_CACHE_TTL_SECS environment variable.
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,

    /// Path of the TTL marker database.
    ///
    /// Defaults to `<cache_path>/<cache_prefix>-ttl-markers.sqlite`.
    #[serde(default)]
    pub marker_db_path: Option<PathBuf>,

    /// Shared secret for outward fetches and served pages.
    ///
    /// Set via REMOTE_MODELS_API_KEY environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request transport used by the fetcher.
    #[serde(default)]
    pub transport: Transport,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Models mirrored from the remote.
    #[serde(default)]
    pub models: Vec<ModelConfig>,

    /// Model names this instance serves outward to other instances.
    #[serde(default)]
    pub host_models: Vec<String>,

    /// Config file the values were loaded from, if any.
    #[serde(skip)]
    pub config_file: Option<PathBuf>,
}

fn default_api_path() -> String {
    "/api/_remote/_models".into()
}

fn default_cache_path() -> PathBuf {
    std::env::temp_dir()
}

fn default_cache_prefix() -> String {
    "remote".into()
}

fn default_user_agent() -> String {
    "remote-models/0.1".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            api_path: default_api_path(),
            cache_path: default_cache_path(),
            cache_prefix: default_cache_prefix(),
            cache_ttl_secs: None,
            marker_db_path: None,
            api_key: None,
            transport: Transport::Get,
            user_agent: default_user_agent(),
            models: Vec::new(),
            host_models: Vec::new(),
            config_file: None,
        }
    }
}

impl AppConfig {
    /// Cache TTL as Duration, if TTL tracking is enabled.
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }

    /// Resolved path of the TTL marker database.
    pub fn marker_db_path(&self) -> PathBuf {
        self.marker_db_path
            .clone()
            .unwrap_or_else(|| self.cache_path.join(format!("{}-ttl-markers.sqlite", self.cache_prefix)))
    }

    /// Whether a model is served outward.
    pub fn is_host_model(&self, name: &str) -> bool {
        self.host_models.iter().any(|m| m == name)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `REMOTE_MODELS_`
    /// 2. TOML file from `REMOTE_MODELS_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config_file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_path) = &config_file {
            figment = figment.merge(Toml::file(config_path));
        }

        figment = figment.merge(
            Env::prefixed("REMOTE_MODELS_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let mut config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        config.config_file = config_file;

        config.validate()?;

        Ok(config)
    }

    /// Shared secret, required for POST transport and outward serving.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the API key is not set.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "api_key".into(),
            hint: "Set REMOTE_MODELS_API_KEY environment variable".into(),
        })
    }
}
