//! HTTP transport for intercepted requests.
//!
//! ### Response Classification
//! - Final URL same-origin with the scope: `basic`
//! - Cross-origin in `no-cors` mode: `opaque` (status 0, no headers, no body)
//! - Any other cross-origin response: `cors`
//!
//! ### Limits
//! - Redirects: followed up to `max_redirects` (default: 20)
//! - Timeout: none unless configured
//!
//! Every response that arrives is returned as-is whatever its status or
//! size; only transport failures become errors.

pub mod url;

use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, resolve};

use ::url::{Origin, Url};
use offcache_core::{AppConfig, Error, Request, RequestMode, Response, ResponseType, Transport};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "offcache/0.1")
    pub user_agent: String,

    /// Request timeout (default: none)
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 20)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "offcache/0.1".to_string(),
            timeout: None,
            max_redirects: 20,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        }
    }
}

/// Classify a response by where it finally came from.
fn classify(origin: &Origin, request: &Request, final_url: &Url) -> ResponseType {
    if &final_url.origin() == origin {
        ResponseType::Basic
    } else if request.mode == RequestMode::NoCors {
        ResponseType::Opaque
    } else {
        ResponseType::Cors
    }
}

/// HTTP transport backed by reqwest.
pub struct FetchClient {
    http: Client,
    origin: Origin,
}

impl FetchClient {
    /// Create a new fetch client for pages served under `scope`.
    pub fn new(config: &FetchConfig, scope: &Url) -> Result<Self, Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, origin: scope.origin() })
    }
}

#[async_trait]
impl Transport for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{}: {}", request.url, e))
            } else {
                Error::Network(format!("network error: {}", e))
            }
        })?;

        let final_url = response.url().clone();
        let kind = classify(&self.origin, request, &final_url);
        let redirected = final_url != request.url;

        if kind == ResponseType::Opaque {
            tracing::debug!("opaque response for {} ({}ms)", request.url, start.elapsed().as_millis());
            return Ok(Response {
                url: None,
                status: 0,
                status_text: String::new(),
                headers: Vec::new(),
                body: Default::default(),
                kind,
                redirected,
            });
        }

        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{}: {}", request.url, e))
            } else {
                Error::Network(format!("failed to read response: {}", e))
            }
        })?;

        tracing::debug!(
            "fetched {} {} -> {} {} in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response {
            url: Some(final_url.to_string()),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
            kind,
            redirected,
        })
    }
}
