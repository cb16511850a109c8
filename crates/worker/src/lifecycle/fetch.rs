//! Fetch phase: cache-first request routing.
//!
//! ### Decision Procedure
//! 1. Look the request up in the current generation's store; a hit is served
//!    as-is with no network call and no revalidation.
//! 2. On a miss, fetch from the network. An ok, basic response is duplicated:
//!    the original goes back to the page, the copy is written to the store by
//!    a detached task.
//! 3. Any other response is passed through and never stored.
//! 4. If the network fails, navigations get the stored offline document (when
//!    it is in the manifest); everything else gets a plain-text 503.
//!
//! Cache lookup failures count as misses. Nothing here returns an error.

use std::sync::Arc;

use offcache_core::{CacheStorage, CacheStore, Request, Response, Transport};
use tokio::task::JoinHandle;

use crate::WorkerConfig;

/// Terminal state of one routed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    ServedFromCache,
    /// Network response passed through without being stored.
    ServedFromNetwork,
    /// Network response returned and a copy written back to the store.
    CachedAndServed,
    ServedOfflineFallback,
    /// Synthesized 503.
    ServedError,
}

impl RouteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteOutcome::ServedFromCache => "served-from-cache",
            RouteOutcome::ServedFromNetwork => "served-from-network",
            RouteOutcome::CachedAndServed => "cached-and-served",
            RouteOutcome::ServedOfflineFallback => "served-offline-fallback",
            RouteOutcome::ServedError => "served-error",
        }
    }
}

/// A routed response and how it was obtained.
#[derive(Debug)]
pub struct Routed {
    pub response: Response,
    pub outcome: RouteOutcome,
    /// Handle of the detached write-back, if one was started. Dropping it
    /// leaves the task running.
    pub write_back: Option<JoinHandle<()>>,
}

impl Routed {
    fn served(response: Response, outcome: RouteOutcome) -> Self {
        Self { response, outcome, write_back: None }
    }
}

/// Whether a network response may be written back for this request.
///
/// Only `GET`, only 2xx, only same-origin `basic` responses, and never a
/// `206` partial body.
pub fn is_cacheable(request: &Request, response: &Response) -> bool {
    request.is_get() && response.ok() && response.is_basic() && response.status != 206
}

/// Routes intercepted requests for one worker version.
#[derive(Clone)]
pub struct Router {
    config: Arc<WorkerConfig>,
    store: CacheStore,
    transport: Arc<dyn Transport>,
}

impl Router {
    pub fn new(config: Arc<WorkerConfig>, storage: Arc<dyn CacheStorage>, transport: Arc<dyn Transport>) -> Self {
        let store = CacheStore::new(storage, &config.generation);
        Self { config, store, transport }
    }

    /// Produce exactly one response for the request.
    pub async fn route(&self, request: Request) -> Routed {
        let navigation = request.is_navigation();

        if let Some(cached) = self.lookup(&request).await {
            tracing::debug!("cache hit for {} {}", request.method, request.url);
            return Routed::served(cached, RouteOutcome::ServedFromCache);
        }

        tracing::debug!("cache miss for {} {}", request.method, request.url);

        let fetched = self.transport.fetch(&request).await;
        match fetched {
            Ok(response) if is_cacheable(&request, &response) => {
                let copy = response.clone();
                let write_back = self.spawn_write_back(request, copy);
                Routed { response, outcome: RouteOutcome::CachedAndServed, write_back: Some(write_back) }
            }
            Ok(response) => {
                tracing::debug!(
                    "not caching {} (status {}, type {})",
                    request.url,
                    response.status,
                    response.kind
                );
                Routed::served(response, RouteOutcome::ServedFromNetwork)
            }
            Err(e) => {
                if e.is_network() {
                    tracing::debug!(url = %request.url, code = e.code(), error = %e, navigation, "network unavailable");
                } else {
                    tracing::warn!(url = %request.url, code = e.code(), error = %e, "transport rejected request");
                }
                self.offline(navigation).await
            }
        }
    }

    async fn lookup(&self, request: &Request) -> Option<Response> {
        if !request.is_get() {
            return None;
        }

        match self.store.match_request(request).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(url = %request.url, code = e.code(), error = %e, "cache lookup failed; treating as miss");
                None
            }
        }
    }

    fn spawn_write_back(&self, request: Request, response: Response) -> JoinHandle<()> {
        let store = self.store.clone();

        tokio::spawn(async move {
            match store.put(&request, &response).await {
                Ok(()) => tracing::debug!("cached {} in {}", request.url, store.name()),
                Err(e) => tracing::warn!(url = %request.url, code = e.code(), error = %e, "write-back failed"),
            }
        })
    }

    async fn offline(&self, navigation: bool) -> Routed {
        if navigation && self.config.fallback_enabled() {
            if let Some(fallback) = self.fallback().await {
                return Routed::served(fallback, RouteOutcome::ServedOfflineFallback);
            }
            tracing::warn!(fallback = %self.config.offline_fallback, "offline fallback is not cached");
        }

        Routed::served(Response::service_unavailable(), RouteOutcome::ServedError)
    }

    async fn fallback(&self) -> Option<Response> {
        let request = self.config.fallback_request().ok()?;
        self.lookup(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::testing::*;
    use offcache_core::{CacheDb, OFFLINE_BODY, RequestMode, ResponseType};
    use std::sync::atomic::Ordering;

    const GENERATION: &str = "neurocalm-v1";

    struct Fixture {
        router: Router,
        db: Arc<CacheDb>,
        net: Arc<StubTransport>,
    }

    impl Fixture {
        async fn new() -> Self {
            Self::with_config(config(GENERATION)).await
        }

        async fn with_config(config: crate::WorkerConfig) -> Self {
            let db = memory_storage().await;
            db.open_cache(GENERATION).await.unwrap();
            let net = Arc::new(StubTransport::new());
            let router = Router::new(Arc::new(config), db.clone(), net.clone());
            Self { router, db, net }
        }

        async fn seed(&self, path: &str, response: &Response) {
            self.db
                .put_entry(GENERATION, &Request::get(url(path)).key(), response)
                .await
                .unwrap();
        }

        async fn stored(&self, path: &str) -> Option<Response> {
            self.db
                .match_entry(GENERATION, &Request::get(url(path)).key())
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let fx = Fixture::new().await;
        let cached = basic("cached shell");
        fx.seed("/", &cached).await;
        fx.net.route("/", basic("fresh shell"));

        let routed = fx.router.route(Request::navigate(url("/"))).await;

        assert_eq!(routed.outcome, RouteOutcome::ServedFromCache);
        assert_eq!(routed.response, cached);
        assert!(routed.write_back.is_none());
        assert_eq!(fx.net.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_is_not_refreshed() {
        let fx = Fixture::new().await;
        fx.seed("/app.js", &basic("v1")).await;
        fx.net.route("/app.js", basic("v2"));

        fx.router.route(Request::get(url("/app.js"))).await;

        assert_eq!(fx.stored("/app.js").await.unwrap().text(), Some("v1"));
        assert_eq!(fx.net.calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_writes_back_basic_ok_response() {
        let fx = Fixture::new().await;
        let network = basic("body { color: teal }").with_url(url("/style.css").to_string());
        fx.net.route("/style.css", network.clone());

        let routed = fx.router.route(Request::get(url("/style.css"))).await;

        assert_eq!(routed.outcome, RouteOutcome::CachedAndServed);
        assert_eq!(routed.response, network);
        routed.write_back.unwrap().await.unwrap();
        assert_eq!(fx.stored("/style.css").await.unwrap(), network);
        assert_eq!(fx.net.calls(), 1);
    }

    #[tokio::test]
    async fn test_second_request_served_from_write_back() {
        let fx = Fixture::new().await;
        fx.net.route("/logo.svg", basic("<svg/>"));

        let first = fx.router.route(Request::get(url("/logo.svg"))).await;
        first.write_back.unwrap().await.unwrap();
        fx.net.set_offline(true);

        let second = fx.router.route(Request::get(url("/logo.svg"))).await;

        assert_eq!(second.outcome, RouteOutcome::ServedFromCache);
        assert_eq!(second.response.text(), Some("<svg/>"));
        assert_eq!(fx.net.calls(), 1);
    }

    #[tokio::test]
    async fn test_write_back_recreates_missing_store() {
        let fx = Fixture::new().await;
        fx.db.delete_cache(GENERATION).await.unwrap();
        fx.net.route("/style.css", basic("body{}"));

        let routed = fx.router.route(Request::get(url("/style.css"))).await;
        routed.write_back.unwrap().await.unwrap();

        assert_eq!(fx.db.cache_names().await.unwrap(), vec![GENERATION]);
        assert!(fx.stored("/style.css").await.is_some());
    }

    #[tokio::test]
    async fn test_error_status_not_cached() {
        let fx = Fixture::new().await;
        let not_found = Response::new(404, "Not Found", "missing").with_kind(ResponseType::Basic);
        fx.net.route("/missing.png", not_found.clone());

        let routed = fx.router.route(Request::get(url("/missing.png"))).await;

        assert_eq!(routed.outcome, RouteOutcome::ServedFromNetwork);
        assert_eq!(routed.response, not_found);
        assert!(routed.write_back.is_none());
        assert!(fx.db.entry_keys(GENERATION).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_basic_not_cached() {
        let fx = Fixture::new().await;
        fx.net.route("/cdn.js", basic("cors").with_kind(ResponseType::Cors));
        fx.net.route("/pixel.gif", Response::new(0, "", "").with_kind(ResponseType::Opaque));

        let cors = fx.router.route(Request::get(url("/cdn.js"))).await;
        let opaque = fx
            .router
            .route(Request::get(url("/pixel.gif")).with_mode(RequestMode::NoCors))
            .await;

        assert_eq!(cors.outcome, RouteOutcome::ServedFromNetwork);
        assert_eq!(opaque.outcome, RouteOutcome::ServedFromNetwork);
        assert_eq!(opaque.response.status, 0);
        assert!(fx.db.entry_keys(GENERATION).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_content_not_cached() {
        let fx = Fixture::new().await;
        fx.net.route("/video.mp4", Response::new(206, "Partial Content", "0123").with_kind(ResponseType::Basic));

        let routed = fx.router.route(Request::get(url("/video.mp4"))).await;

        assert_eq!(routed.outcome, RouteOutcome::ServedFromNetwork);
        assert!(fx.db.entry_keys(GENERATION).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_get_bypasses_cache() {
        let fx = Fixture::new().await;
        fx.seed("/api/data", &basic("stale")).await;
        fx.net.route("/api/data", basic("created"));

        let routed = fx.router.route(Request::new("POST", url("/api/data"))).await;

        assert_eq!(routed.outcome, RouteOutcome::ServedFromNetwork);
        assert_eq!(routed.response.text(), Some("created"));
        assert_eq!(fx.net.calls(), 1);
        assert_eq!(fx.stored("/api/data").await.unwrap().text(), Some("stale"));
    }

    #[tokio::test]
    async fn test_offline_navigation_serves_fallback() {
        let fx = Fixture::new().await;
        let offline_page = basic("<p>You are offline</p>");
        fx.seed("offline.html", &offline_page).await;
        fx.net.set_offline(true);

        let routed = fx.router.route(Request::navigate(url("/journal"))).await;

        assert_eq!(routed.outcome, RouteOutcome::ServedOfflineFallback);
        assert_eq!(routed.response, offline_page);
    }

    #[tokio::test]
    async fn test_offline_document_destination_serves_fallback() {
        let fx = Fixture::new().await;
        fx.seed("offline.html", &basic("offline")).await;
        fx.net.set_offline(true);

        let request = Request::get(url("/frame.html")).with_destination(offcache_core::Destination::Document);
        let routed = fx.router.route(request).await;

        assert_eq!(routed.outcome, RouteOutcome::ServedOfflineFallback);
    }

    #[tokio::test]
    async fn test_offline_navigation_without_fallback_in_manifest() {
        let fx = Fixture::with_config(config(GENERATION).with_manifest(["/", "index.html"])).await;
        fx.seed("offline.html", &basic("offline")).await;
        fx.net.set_offline(true);

        let routed = fx.router.route(Request::navigate(url("/journal"))).await;

        assert_eq!(routed.outcome, RouteOutcome::ServedError);
        assert_eq!(routed.response.status, 503);
    }

    #[tokio::test]
    async fn test_offline_navigation_with_fallback_not_cached() {
        let fx = Fixture::new().await;
        fx.net.set_offline(true);

        let routed = fx.router.route(Request::navigate(url("/journal"))).await;

        assert_eq!(routed.outcome, RouteOutcome::ServedError);
        assert_eq!(routed.response, Response::service_unavailable());
    }

    #[tokio::test]
    async fn test_offline_subresource_gets_503() {
        let fx = Fixture::new().await;
        fx.seed("offline.html", &basic("offline")).await;
        fx.net.set_offline(true);

        let routed = fx.router.route(Request::get(url("/api/data"))).await;

        assert_eq!(routed.outcome, RouteOutcome::ServedError);
        assert_eq!(routed.response.status, 503);
        assert_eq!(routed.response.status_text, "Service Unavailable");
        assert_eq!(routed.response.content_type(), Some("text/plain"));
        assert_eq!(routed.response.text(), Some(OFFLINE_BODY));
        assert_eq!(routed.response.text(), Some("Network unavailable / Item not cached"));
    }

    #[tokio::test]
    async fn test_lookup_failure_falls_through_to_network() {
        let flaky = FlakyStorage::new(CacheDb::open_in_memory().await.unwrap());
        flaky.fail_match.store(true, Ordering::SeqCst);
        let net = Arc::new(StubTransport::serving(&[("/data.json", basic("{}"))]));
        let router = Router::new(Arc::new(config(GENERATION)), Arc::new(flaky), net.clone());

        let routed = router.route(Request::get(url("/data.json"))).await;

        assert_eq!(routed.response.text(), Some("{}"));
        assert_eq!(net.calls(), 1);
    }

    #[tokio::test]
    async fn test_write_back_failure_does_not_affect_response() {
        let flaky = FlakyStorage::new(CacheDb::open_in_memory().await.unwrap());
        flaky.fail_put.store(true, Ordering::SeqCst);
        let net = Arc::new(StubTransport::serving(&[("/style.css", basic("body{}"))]));
        let router = Router::new(Arc::new(config(GENERATION)), Arc::new(flaky), net);

        let routed = router.route(Request::get(url("/style.css"))).await;

        assert_eq!(routed.outcome, RouteOutcome::CachedAndServed);
        assert_eq!(routed.response.text(), Some("body{}"));
        routed.write_back.unwrap().await.unwrap();
    }

    #[test]
    fn test_is_cacheable() {
        let get = Request::get(url("/a"));
        assert!(is_cacheable(&get, &basic("x")));
        assert!(!is_cacheable(&get, &basic("x").with_kind(ResponseType::Cors)));
        assert!(!is_cacheable(&get, &Response::new(500, "", "").with_kind(ResponseType::Basic)));
        assert!(!is_cacheable(&Request::new("PUT", url("/a")), &basic("x")));
    }

    #[test]
    fn test_outcome_names() {
        assert_eq!(RouteOutcome::CachedAndServed.as_str(), "cached-and-served");
        assert_eq!(RouteOutcome::ServedOfflineFallback.as_str(), "served-offline-fallback");
    }

    #[tokio::test]
    async fn test_large_response_over_real_transport_is_cached() {
        use offcache_client::{FetchClient, FetchConfig};
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let video = vec![b'x'; 6 * 1024 * 1024];
        Mock::given(method("GET"))
            .and(path("/media/intro.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(video.clone(), "video/mp4"))
            .mount(&server)
            .await;

        let scope = url::Url::parse(&format!("{}/", server.uri())).unwrap();
        let transport = Arc::new(FetchClient::new(&FetchConfig::default(), &scope).unwrap());
        let db = memory_storage().await;
        let router = Router::new(Arc::new(crate::WorkerConfig::new(GENERATION, scope.clone())), db.clone(), transport);

        let request = Request::get(scope.join("media/intro.mp4").unwrap());
        let routed = router.route(request.clone()).await;

        assert_eq!(routed.outcome, RouteOutcome::CachedAndServed);
        assert_eq!(routed.response.status, 200);
        assert_eq!(routed.response.body.len(), video.len());

        routed.write_back.unwrap().await.unwrap();
        let stored = db.match_entry(GENERATION, &request.key()).await.unwrap().unwrap();
        assert_eq!(stored.body.len(), video.len());
    }
}
