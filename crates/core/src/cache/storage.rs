//! Cache storage abstraction and the named store handle.
//!
//! [`CacheStorage`] is the key-value persistence seam the lifecycle handlers
//! consume; [`CacheDb`] is the SQLite implementation. [`CacheStore`] binds a
//! storage to one cache name and adds the network-backed batch add.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use url::Url;

use super::connection::CacheDb;
use crate::{Error, Request, RequestKey, Response, Transport};

/// Persistent collection of named cache stores.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the named store if absent.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// All store names, oldest first.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Destroy a store and its entries. Returns false if it didn't exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    async fn match_entry(&self, name: &str, key: &RequestKey) -> Result<Option<Response>, Error>;

    async fn put(&self, name: &str, key: &RequestKey, response: &Response) -> Result<(), Error>;

    /// All-or-nothing batch write.
    async fn put_all(&self, name: &str, entries: Vec<(RequestKey, Response)>) -> Result<(), Error>;

}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.open_cache(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.cache_names().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.delete_cache(name).await
    }

    async fn match_entry(&self, name: &str, key: &RequestKey) -> Result<Option<Response>, Error> {
        CacheDb::match_entry(self, name, key).await
    }

    async fn put(&self, name: &str, key: &RequestKey, response: &Response) -> Result<(), Error> {
        self.put_entry(name, key, response).await
    }

    async fn put_all(&self, name: &str, entries: Vec<(RequestKey, Response)>) -> Result<(), Error> {
        self.put_entries(name, entries).await
    }
}

/// Handle on one named cache store.
#[derive(Clone)]
pub struct CacheStore {
    name: String,
    storage: Arc<dyn CacheStorage>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore").field("name", &self.name).finish_non_exhaustive()
    }
}

impl CacheStore {
    /// Handle on the named store without touching storage. Lookups against a
    /// store that does not exist yet simply miss.
    pub fn new(storage: Arc<dyn CacheStorage>, name: &str) -> Self {
        Self { name: name.to_string(), storage }
    }

    /// Open (create-if-absent) the named store.
    pub async fn open(storage: Arc<dyn CacheStorage>, name: &str) -> Result<Self, Error> {
        storage.open(name).await?;
        Ok(Self::new(storage, name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetch every URL and store all responses as one batch.
    ///
    /// All fetches run concurrently. A transport error or a non-ok status on
    /// any of them fails the whole batch and nothing is stored. Returns the
    /// number of entries written.
    pub async fn add_all(&self, transport: &dyn Transport, urls: &[Url]) -> Result<usize, Error> {
        let requests: Vec<Request> = urls.iter().cloned().map(Request::get).collect();

        let responses = try_join_all(requests.iter().map(|request| transport.fetch(request))).await?;

        let mut entries = Vec::with_capacity(requests.len());
        for (request, response) in requests.iter().zip(responses) {
            if !response.ok() {
                return Err(Error::HttpError(format!("{} returned status {}", request.url, response.status)));
            }
            entries.push((request.key(), response));
        }

        let count = entries.len();
        self.storage.put_all(&self.name, entries).await?;
        Ok(count)
    }

    /// Store one response under the request's key, recreating the store if
    /// it was deleted since the handle was made.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        self.storage.open(&self.name).await?;
        self.storage.put(&self.name, &request.key(), response).await
    }

    /// Stored response for the request, if any.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        self.storage.match_entry(&self.name, &request.key()).await
    }
}
