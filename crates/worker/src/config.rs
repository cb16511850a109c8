//! Per-version worker configuration.
//!
//! Passed explicitly to every lifecycle phase so that install, activate and
//! fetch of one deployed version all agree on the same generation.

use offcache_client::resolve;
use offcache_core::{AppConfig, Request};
use url::Url;

use crate::WorkerError;

/// Configuration shared by the three lifecycle phases of one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Name of the cache store this version owns.
    pub generation: String,
    /// Base URL manifest entries resolve against.
    pub scope: Url,
    /// Assets precached at install, in order.
    pub manifest: Vec<String>,
    /// Manifest entry served to offline navigations.
    pub offline_fallback: String,
}

impl WorkerConfig {
    pub fn new(generation: impl Into<String>, scope: Url) -> Self {
        Self { generation: generation.into(), scope, manifest: Vec::new(), offline_fallback: "offline.html".into() }
    }

    pub fn with_manifest<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.manifest = entries.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_offline_fallback(mut self, entry: impl Into<String>) -> Self {
        self.offline_fallback = entry.into();
        self
    }

    /// Manifest entries resolved against the scope, in manifest order.
    pub fn manifest_urls(&self) -> Result<Vec<Url>, WorkerError> {
        self.manifest
            .iter()
            .map(|entry| resolve(&self.scope, entry).map_err(WorkerError::from))
            .collect()
    }

    /// The fallback only applies when it is literally listed in the manifest.
    pub fn fallback_enabled(&self) -> bool {
        self.manifest.iter().any(|entry| entry == &self.offline_fallback)
    }

    /// Cache lookup request for the fallback document.
    pub fn fallback_request(&self) -> Result<Request, WorkerError> {
        Ok(Request::get(resolve(&self.scope, &self.offline_fallback)?))
    }
}

impl TryFrom<&AppConfig> for WorkerConfig {
    type Error = WorkerError;

    fn try_from(config: &AppConfig) -> Result<Self, Self::Error> {
        let scope = Url::parse(&config.scope).map_err(|e| WorkerError::InvalidConfig(format!("scope: {e}")))?;
        Ok(Self::new(config.generation.clone(), scope)
            .with_manifest(config.manifest.iter().cloned())
            .with_offline_fallback(config.offline_fallback.clone()))
    }
}
