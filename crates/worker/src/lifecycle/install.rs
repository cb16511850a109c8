//! Install phase: precache the manifest.

use std::sync::Arc;

use offcache_core::{CacheStorage, CacheStore, Transport};

use crate::{WorkerConfig, WorkerError};

/// Open the store for the current generation and add every manifest asset
/// as one all-or-nothing batch.
///
/// Failures are logged here and returned; the caller decides what a failed
/// install means for the version. Returns the number of assets cached.
pub async fn install(
    config: &WorkerConfig, storage: Arc<dyn CacheStorage>, transport: &dyn Transport,
) -> Result<usize, WorkerError> {
    populate(config, storage, transport).await.inspect_err(|e| {
        tracing::error!(generation = %config.generation, error = %e, "caching core assets failed");
    })
}

async fn populate(
    config: &WorkerConfig, storage: Arc<dyn CacheStorage>, transport: &dyn Transport,
) -> Result<usize, WorkerError> {
    let urls = config.manifest_urls()?;

    let store = CacheStore::open(storage, &config.generation)
        .await
        .map_err(WorkerError::InstallFailed)?;

    tracing::info!(generation = %store.name(), assets = urls.len(), "caching core assets");

    let count = store
        .add_all(transport, &urls)
        .await
        .map_err(WorkerError::InstallFailed)?;

    tracing::info!(generation = %store.name(), cached = count, "core assets cached");
    Ok(count)
}
