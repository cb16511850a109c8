//! In-process lifecycle host.
//!
//! Drives registered handlers through install and activate and dispatches
//! intercepted requests to whichever version is active. A version whose
//! install fails becomes redundant and the previous version keeps serving.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use offcache_core::{Request, Response};
use tokio::sync::RwLock;

use crate::LifecycleHandler;

/// Lifecycle state of a registered version.
///
/// `register` only ever returns the terminal `Activated` or `Redundant`; the
/// other states are visible through [`WorkerHost::state`] while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed or the version was replaced.
    Redundant,
}

struct ActiveVersion {
    id: u64,
    handler: Arc<dyn LifecycleHandler>,
}

/// Hosts at most one active version at a time.
#[derive(Default)]
pub struct WorkerHost {
    active: RwLock<Option<ActiveVersion>>,
    /// Most recently registered version and its state.
    latest: RwLock<Option<(u64, WorkerState)>>,
    next_id: AtomicU64,
}

impl WorkerHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install and, on success, activate a new version.
    ///
    /// Returns the state the version ended in: `Activated`, or `Redundant` if
    /// install failed. Activation errors are logged but do not stop the
    /// version from going live. Fetches dispatched while the new version
    /// activates wait until activation settles.
    pub async fn register(&self, handler: Arc<dyn LifecycleHandler>) -> WorkerState {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;

        self.transition(id, WorkerState::Installing).await;
        if let Err(e) = handler.install().await {
            tracing::error!(version = id, error = %e, "install failed; keeping current version");
            self.transition(id, WorkerState::Redundant).await;
            return WorkerState::Redundant;
        }
        self.transition(id, WorkerState::Installed).await;

        let mut active = self.active.write().await;
        if let Some(previous) = active.take() {
            tracing::info!(version = previous.id, state = ?WorkerState::Redundant, "replacing worker");
        }

        self.transition(id, WorkerState::Activating).await;
        if let Err(e) = handler.activate().await {
            tracing::warn!(version = id, error = %e, "activation cleanup failed; stale caches may remain");
        }

        *active = Some(ActiveVersion { id, handler });
        self.transition(id, WorkerState::Activated).await;
        WorkerState::Activated
    }

    async fn transition(&self, id: u64, state: WorkerState) {
        tracing::info!(version = id, state = ?state, "worker state changed");
        *self.latest.write().await = Some((id, state));
    }

    /// State of the most recently registered version.
    pub async fn state(&self) -> Option<WorkerState> {
        self.latest.read().await.as_ref().map(|(_, state)| *state)
    }

    /// Route a request through the active version.
    ///
    /// `None` means no version is active and the request is not intercepted.
    pub async fn dispatch_fetch(&self, request: Request) -> Option<Response> {
        let handler = {
            let active = self.active.read().await;
            active.as_ref().map(|version| Arc::clone(&version.handler))?
        };
        Some(handler.fetch(request).await)
    }

    /// Id of the active version, counting registrations from 1.
    pub async fn active_version(&self) -> Option<u64> {
        self.active.read().await.as_ref().map(|version| version.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OfflineWorker;
    use crate::lifecycle::testing::*;

    fn site() -> Arc<StubTransport> {
        Arc::new(StubTransport::serving(&[
            ("/", basic("<app v1/>")),
            ("/index.html", basic("<app v1/>")),
            ("/offline.html", basic("<p>offline</p>")),
        ]))
    }

    #[tokio::test]
    async fn test_no_active_version_does_not_intercept() {
        let host = WorkerHost::new();
        assert!(host.dispatch_fetch(Request::get(url("/"))).await.is_none());
        assert_eq!(host.active_version().await, None);
    }

    #[tokio::test]
    async fn test_register_activates() {
        let host = WorkerHost::new();
        let worker = OfflineWorker::new(config("neurocalm-v1"), memory_storage().await, site());

        let state = host.register(Arc::new(worker)).await;

        assert_eq!(state, WorkerState::Activated);
        assert_eq!(host.active_version().await, Some(1));
        let response = host.dispatch_fetch(Request::navigate(url("/"))).await.unwrap();
        assert_eq!(response.text(), Some("<app v1/>"));
    }

    #[tokio::test]
    async fn test_failed_install_keeps_previous_version() {
        let host = WorkerHost::new();
        let db = memory_storage().await;
        let v1 = OfflineWorker::new(config("neurocalm-v1"), db.clone(), site());
        host.register(Arc::new(v1)).await;

        let broken = Arc::new(StubTransport::new());
        broken.set_offline(true);
        let v2 = OfflineWorker::new(config("neurocalm-v2"), db.clone(), broken);
        let state = host.register(Arc::new(v2)).await;

        assert_eq!(state, WorkerState::Redundant);
        assert_eq!(host.active_version().await, Some(1));
        assert!(db.cache_names().await.unwrap().contains(&"neurocalm-v1".to_string()));
    }

    #[tokio::test]
    async fn test_upgrade_removes_old_generation() {
        let host = WorkerHost::new();
        let db = memory_storage().await;
        let net = site();
        host.register(Arc::new(OfflineWorker::new(config("neurocalm-v1"), db.clone(), net.clone())))
            .await;

        net.route("/", basic("<app v2/>"));
        net.route("/index.html", basic("<app v2/>"));
        let state = host
            .register(Arc::new(OfflineWorker::new(config("neurocalm-v2"), db.clone(), net.clone())))
            .await;

        assert_eq!(state, WorkerState::Activated);
        assert_eq!(host.active_version().await, Some(2));
        assert_eq!(db.cache_names().await.unwrap(), vec!["neurocalm-v2"]);

        net.set_offline(true);
        let response = host.dispatch_fetch(Request::navigate(url("/"))).await.unwrap();
        assert_eq!(response.text(), Some("<app v2/>"));
    }

    /// Handler whose install and activate wait for the test to release them.
    struct GatedHandler {
        install_gate: tokio::sync::Notify,
        activate_gate: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl LifecycleHandler for GatedHandler {
        async fn install(&self) -> Result<(), crate::WorkerError> {
            self.install_gate.notified().await;
            Ok(())
        }

        async fn activate(&self) -> Result<(), crate::WorkerError> {
            self.activate_gate.notified().await;
            Ok(())
        }

        async fn fetch(&self, _request: Request) -> Response {
            Response::service_unavailable()
        }
    }

    async fn wait_for(host: &WorkerHost, expected: WorkerState) {
        while host.state().await != Some(expected) {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_state_walks_through_lifecycle() {
        let host = Arc::new(WorkerHost::new());
        let handler = Arc::new(GatedHandler {
            install_gate: tokio::sync::Notify::new(),
            activate_gate: tokio::sync::Notify::new(),
        });
        assert_eq!(host.state().await, None);

        let registering = tokio::spawn({
            let host = Arc::clone(&host);
            let handler = Arc::clone(&handler);
            async move { host.register(handler).await }
        });

        wait_for(&host, WorkerState::Installing).await;
        assert_eq!(host.active_version().await, None);
        handler.install_gate.notify_one();

        wait_for(&host, WorkerState::Activating).await;
        handler.activate_gate.notify_one();

        assert_eq!(registering.await.unwrap(), WorkerState::Activated);
        assert_eq!(host.state().await, Some(WorkerState::Activated));
        assert_eq!(host.active_version().await, Some(1));
    }

    #[tokio::test]
    async fn test_state_redundant_after_failed_install() {
        let host = WorkerHost::new();
        let broken = Arc::new(StubTransport::new());
        broken.set_offline(true);
        let worker = OfflineWorker::new(config("neurocalm-v1"), memory_storage().await, broken);

        host.register(Arc::new(worker)).await;

        assert_eq!(host.state().await, Some(WorkerState::Redundant));
        assert_eq!(host.active_version().await, None);
    }
}
