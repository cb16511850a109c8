//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFCACHE_*)
//! 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OFFCACHE_*)
/// 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name of the cache store owned by this deployed version.
    ///
    /// Set via OFFCACHE_GENERATION environment variable.
    #[serde(default = "default_generation")]
    pub generation: String,

    /// Assets precached at install, relative to `scope`.
    ///
    /// Set via OFFCACHE_MANIFEST, e.g. `'["/", "index.html"]'`.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Manifest entry served to navigations while offline.
    ///
    /// Set via OFFCACHE_OFFLINE_FALLBACK environment variable.
    #[serde(default = "default_offline_fallback")]
    pub offline_fallback: String,

    /// Base URL the worker controls; same-origin responses are cacheable.
    ///
    /// Set via OFFCACHE_SCOPE environment variable.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Path to SQLite cache database.
    ///
    /// Set via OFFCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Optional network request timeout in milliseconds. Unset means the
    /// transport waits as long as the host lets it.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Maximum number of redirects the transport follows.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_generation() -> String {
    "offcache-v1".into()
}

fn default_manifest() -> Vec<String> {
    vec!["/".into(), "index.html".into(), "offline.html".into()]
}

fn default_offline_fallback() -> String {
    "offline.html".into()
}

fn default_scope() -> String {
    "http://localhost:8080/".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offcache.sqlite")
}

fn default_user_agent() -> String {
    "offcache/0.1".into()
}

fn default_max_redirects() -> usize {
    20
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generation: default_generation(),
            manifest: default_manifest(),
            offline_fallback: default_offline_fallback(),
            scope: default_scope(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: None,
            max_redirects: default_max_redirects(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Whether offline navigations can be answered with the fallback document.
    pub fn fallback_enabled(&self) -> bool {
        self.manifest.iter().any(|entry| entry == &self.offline_fallback)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be read, or
    /// if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OFFCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OFFCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
