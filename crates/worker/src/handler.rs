//! Lifecycle handler implementation.
//!
//! This module defines the hook interface a host drives and the offline
//! worker that implements it on top of the three lifecycle phases.

use std::sync::Arc;

use async_trait::async_trait;
use offcache_core::{CacheStorage, Request, Response, Transport};

use crate::lifecycle::{self, ActivationReport, Router};
use crate::{WorkerConfig, WorkerError};

/// The three hooks a lifecycle host awaits.
#[async_trait]
pub trait LifecycleHandler: Send + Sync {
    /// Runs once per version; the version only progresses if this succeeds.
    async fn install(&self) -> Result<(), WorkerError>;

    /// Runs once the version becomes current.
    async fn activate(&self) -> Result<(), WorkerError>;

    /// Answers one intercepted request. Never fails.
    async fn fetch(&self, request: Request) -> Response;
}

/// Offline caching worker for one deployed version.
#[derive(Clone)]
pub struct OfflineWorker {
    config: Arc<WorkerConfig>,
    storage: Arc<dyn CacheStorage>,
    transport: Arc<dyn Transport>,
    router: Router,
}

impl OfflineWorker {
    pub fn new(config: WorkerConfig, storage: Arc<dyn CacheStorage>, transport: Arc<dyn Transport>) -> Self {
        let config = Arc::new(config);
        let router = Router::new(Arc::clone(&config), Arc::clone(&storage), Arc::clone(&transport));
        Self { config, storage, transport, router }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Router with outcome reporting, for callers that need more than the response.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Install, returning how many assets were cached.
    pub async fn precache(&self) -> Result<usize, WorkerError> {
        lifecycle::install(&self.config, Arc::clone(&self.storage), self.transport.as_ref()).await
    }

    /// Activate, returning which stale stores were removed.
    pub async fn cleanup(&self) -> Result<ActivationReport, WorkerError> {
        lifecycle::activate(&self.config, self.storage.as_ref()).await
    }
}

#[async_trait]
impl LifecycleHandler for OfflineWorker {
    async fn install(&self) -> Result<(), WorkerError> {
        self.precache().await.map(|_| ())
    }

    async fn activate(&self) -> Result<(), WorkerError> {
        self.cleanup().await.map(|_| ())
    }

    async fn fetch(&self, request: Request) -> Response {
        self.router.route(request).await.response
    }
}
