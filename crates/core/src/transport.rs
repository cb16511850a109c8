//! Network transport abstraction.
//!
//! The router and the installer never talk to the network directly; they go
//! through a [`Transport`] so the HTTP client can be swapped (or stubbed).

use async_trait::async_trait;

use crate::{Error, Request, Response};

/// Fetches a request from the network.
///
/// An `Err` means no response could be produced at all (offline, DNS, reset,
/// timeout). Any response that did arrive, whatever its status, is `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}
