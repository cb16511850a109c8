//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::AppConfig;
use thiserror::Error;
use url::Url;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `generation` is empty
    /// - a `manifest` entry is blank or listed twice
    /// - `scope` is not an absolute http(s) URL
    /// - `timeout_ms` is set below 100ms or above 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "generation".into(), reason: "must not be empty".into() });
        }

        let mut seen = HashSet::new();
        for entry in &self.manifest {
            if entry.trim().is_empty() {
                return Err(ConfigError::Invalid { field: "manifest".into(), reason: "entries must not be blank".into() });
            }
            if !seen.insert(entry.as_str()) {
                return Err(ConfigError::Invalid { field: "manifest".into(), reason: format!("duplicate entry: {entry}") });
            }
        }

        match Url::parse(&self.scope) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::Invalid {
                    field: "scope".into(),
                    reason: format!("unsupported scheme: {}", url.scheme()),
                });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "scope".into(), reason: e.to_string() }),
        }

        if let Some(timeout_ms) = self.timeout_ms {
            if timeout_ms < 100 {
                return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
            }
            if timeout_ms > 300_000 {
                return Err(ConfigError::Invalid {
                    field: "timeout_ms".into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if !self.fallback_enabled() {
            tracing::warn!(
                offline_fallback = %self.offline_fallback,
                manifest_len = self.manifest.len(),
                "offline fallback is not in the manifest; offline navigations will get a 503"
            );
        }

        Ok(())
    }
}
