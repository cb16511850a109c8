//! Activate phase: delete cache stores from earlier generations.

use futures_util::future::join_all;
use offcache_core::CacheStorage;

use crate::{WorkerConfig, WorkerError};

/// Stores removed (or not) by one activation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    pub deleted: Vec<String>,
    /// Stale stores whose deletion failed; they stay behind.
    pub failed: Vec<String>,
}

/// Delete every cache store whose name is not the current generation.
///
/// Deletions run concurrently and independently; one failure does not stop
/// the others. Only a failure to list the stores is returned as an error.
pub async fn activate(config: &WorkerConfig, storage: &dyn CacheStorage) -> Result<ActivationReport, WorkerError> {
    let names = storage.keys().await.map_err(|e| {
        tracing::error!(generation = %config.generation, error = %e, "listing caches failed");
        WorkerError::ActivationFailed(e)
    })?;

    let stale: Vec<String> = names.into_iter().filter(|name| name != &config.generation).collect();
    let results = join_all(stale.iter().map(|name| storage.delete(name))).await;

    let mut report = ActivationReport::default();
    for (name, result) in stale.into_iter().zip(results) {
        match result {
            Ok(true) => {
                tracing::debug!("deleted stale cache {}", name);
                report.deleted.push(name);
            }
            Ok(false) => tracing::debug!("stale cache {} already gone", name),
            Err(e) => {
                tracing::warn!(cache = %name, code = e.code(), error = %e, "failed to delete stale cache");
                report.failed.push(name);
            }
        }
    }

    tracing::info!(
        generation = %config.generation,
        deleted = report.deleted.len(),
        failed = report.failed.len(),
        "activated"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::testing::*;
    use offcache_core::CacheDb;
    use std::sync::atomic::Ordering;

    async fn storage_with(names: &[&str]) -> CacheDb {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in names {
            db.open_cache(name).await.unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_activate_keeps_only_current() {
        let db = storage_with(&["neurocalm-v0", "neurocalm-v1", "scratch", "neurocalm-v2"]).await;

        let report = activate(&config("neurocalm-v2"), &db).await.unwrap();

        assert_eq!(report.deleted, vec!["neurocalm-v0", "neurocalm-v1", "scratch"]);
        assert!(report.failed.is_empty());
        assert_eq!(db.cache_names().await.unwrap(), vec!["neurocalm-v2"]);
    }

    #[tokio::test]
    async fn test_activate_with_nothing_stale() {
        let db = storage_with(&["neurocalm-v1"]).await;

        let report = activate(&config("neurocalm-v1"), &db).await.unwrap();

        assert_eq!(report, ActivationReport::default());
        assert_eq!(db.cache_names().await.unwrap(), vec!["neurocalm-v1"]);
    }

    #[tokio::test]
    async fn test_activate_does_not_create_current_store() {
        let db = storage_with(&["neurocalm-v1"]).await;

        activate(&config("neurocalm-v2"), &db).await.unwrap();

        assert!(db.cache_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activate_continues_past_failed_delete() {
        let flaky = FlakyStorage::new(storage_with(&["v0", "v1", "v2", "v3"]).await);
        flaky.fail_delete_of("v1");

        let report = activate(&config("v3"), &flaky).await.unwrap();

        assert_eq!(report.deleted, vec!["v0", "v2"]);
        assert_eq!(report.failed, vec!["v1"]);
        assert_eq!(flaky.keys().await.unwrap(), vec!["v1", "v3"]);
    }

    #[tokio::test]
    async fn test_activate_reports_listing_failure() {
        let flaky = FlakyStorage::new(storage_with(&["v0", "v1"]).await);
        flaky.fail_keys.store(true, Ordering::SeqCst);

        let result = activate(&config("v1"), &flaky).await;

        assert!(matches!(result, Err(WorkerError::ActivationFailed(_))));
    }
}
