//! Response model shared by the network transport, the cache and the router.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::Error;

/// Body of the response synthesized when neither cache nor network can answer.
pub const OFFLINE_BODY: &str = "Network unavailable / Item not cached";

/// Fetch response type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// Same-origin response.
    Basic,
    /// Cross-origin response readable under CORS.
    Cors,
    /// Locally constructed response.
    #[default]
    Default,
    /// Network error placeholder.
    Error,
    /// Cross-origin `no-cors` response with hidden status, headers and body.
    Opaque,
    OpaqueRedirect,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Default => "default",
            ResponseType::Error => "error",
            ResponseType::Opaque => "opaque",
            ResponseType::OpaqueRedirect => "opaqueredirect",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseType::Basic),
            "cors" => Ok(ResponseType::Cors),
            "default" => Ok(ResponseType::Default),
            "error" => Ok(ResponseType::Error),
            "opaque" => Ok(ResponseType::Opaque),
            "opaqueredirect" => Ok(ResponseType::OpaqueRedirect),
            other => Err(Error::CorruptEntry(format!("unknown response type: {other}"))),
        }
    }
}

/// A network, cached or synthesized response.
///
/// `Clone` is the explicit duplicate used before a response is both returned
/// and stored; the body is reference-counted, so the copy shares bytes but is
/// otherwise independent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Final URL after redirects; `None` for synthesized responses.
    pub url: Option<String>,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub kind: ResponseType,
    pub redirected: bool,
}

impl Response {
    /// Build a locally constructed response.
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            url: None,
            status,
            status_text: status_text.into(),
            headers: Vec::new(),
            body: body.into(),
            kind: ResponseType::Default,
            redirected: false,
        }
    }

    /// The plain-text 503 returned when a request can be answered neither
    /// from the network nor from the cache.
    pub fn service_unavailable() -> Self {
        Self::new(503, "Service Unavailable", OFFLINE_BODY).with_header("Content-Type", "text/plain")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_kind(mut self, kind: ResponseType) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Status in the 2xx range.
    pub fn ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn is_basic(&self) -> bool {
        self.kind == ResponseType::Basic
    }

    /// Case-insensitive header lookup; first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body as text, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}
