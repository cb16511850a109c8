//! Cached response CRUD operations.
//!
//! Entries are addressed by `(cache_name, request_key)` where the request key
//! is the SHA-256 of method and URL. Writes replace any existing entry for the
//! same key and move it to the end of the listing order.

use std::collections::HashSet;

use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use crate::{Error, RequestKey, Response, ResponseType};

const INSERT_ENTRY: &str = "INSERT OR REPLACE INTO cache_entries (
        cache_name, request_key, method, url,
        status, status_text, headers_json, body,
        response_type, response_url, redirected, stored_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)";

/// A response row ready to be written.
struct EncodedEntry {
    request_key: String,
    method: String,
    url: String,
    status: i64,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
    response_type: &'static str,
    response_url: Option<String>,
    redirected: bool,
}

impl EncodedEntry {
    fn new(key: &RequestKey, response: &Response) -> Result<Self, Error> {
        Ok(Self {
            request_key: key.hash(),
            method: key.method.clone(),
            url: key.url.clone(),
            status: i64::from(response.status),
            status_text: response.status_text.clone(),
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.to_vec(),
            response_type: response.kind.as_str(),
            response_url: response.url.clone(),
            redirected: response.redirected,
        })
    }

    fn insert(&self, conn: &rusqlite::Connection, cache_name: &str, stored_at: &str) -> Result<(), Error> {
        conn.execute(
            INSERT_ENTRY,
            params![
                cache_name,
                &self.request_key,
                &self.method,
                &self.url,
                self.status,
                &self.status_text,
                &self.headers_json,
                &self.body,
                self.response_type,
                &self.response_url,
                self.redirected as i32,
                stored_at,
            ],
        )?;
        Ok(())
    }
}

fn cache_exists(conn: &rusqlite::Connection, name: &str) -> Result<bool, Error> {
    let exists: bool =
        conn.query_row("SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)", params![name], |row| row.get(0))?;
    Ok(exists)
}

type RawRow = (i64, String, String, Vec<u8>, String, Option<String>, i32);

fn decode(raw: RawRow) -> Result<Response, Error> {
    let (status, status_text, headers_json, body, response_type, url, redirected) = raw;
    let status = u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status out of range: {status}")))?;
    Ok(Response {
        url,
        status,
        status_text,
        headers: serde_json::from_str(&headers_json)?,
        body: Bytes::from(body),
        kind: response_type.parse::<ResponseType>()?,
        redirected: redirected == 1,
    })
}

impl CacheDb {
    /// Store a response under a request key.
    ///
    /// Fails with `CacheNotFound` if the store was never opened or has been deleted.
    pub async fn put_entry(&self, cache_name: &str, key: &RequestKey, response: &Response) -> Result<(), Error> {
        let entry = EncodedEntry::new(key, response)?;
        let cache_name = cache_name.to_string();
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                if !cache_exists(conn, &cache_name)? {
                    return Err(Error::CacheNotFound(cache_name));
                }
                entry.insert(conn, &cache_name, &stored_at)
            })
            .await
            .map_err(Error::from)
    }

    /// Store a batch of responses in one transaction.
    ///
    /// Either every entry is written or none is. Duplicate keys within the
    /// batch are rejected before anything is written.
    pub async fn put_entries(&self, cache_name: &str, entries: Vec<(RequestKey, Response)>) -> Result<(), Error> {
        let mut seen = HashSet::new();
        let mut encoded = Vec::with_capacity(entries.len());
        for (key, response) in &entries {
            if !seen.insert(key.clone()) {
                return Err(Error::DuplicateRequest(key.to_string()));
            }
            encoded.push(EncodedEntry::new(key, response)?);
        }

        let cache_name = cache_name.to_string();
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                if !cache_exists(&tx, &cache_name)? {
                    return Err(Error::CacheNotFound(cache_name));
                }
                for entry in &encoded {
                    entry.insert(&tx, &cache_name, &stored_at)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the response stored for a request key.
    ///
    /// Returns None if the key or the store doesn't exist.
    pub async fn match_entry(&self, cache_name: &str, key: &RequestKey) -> Result<Option<Response>, Error> {
        let cache_name = cache_name.to_string();
        let request_key = key.hash();
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let result = conn.query_row(
                    "SELECT status, status_text, headers_json, body, response_type, response_url, redirected
                     FROM cache_entries WHERE cache_name = ?1 AND request_key = ?2",
                    params![cache_name, request_key],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, Vec<u8>>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, Option<String>>(5)?,
                            row.get::<_, i32>(6)?,
                        ))
                    },
                );

                match result {
                    Ok(raw) => decode(raw).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Request keys stored in a cache, in insertion order.
    pub async fn entry_keys(&self, cache_name: &str) -> Result<Vec<RequestKey>, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt =
                    conn.prepare("SELECT method, url FROM cache_entries WHERE cache_name = ?1 ORDER BY rowid ASC")?;
                let keys = stmt
                    .query_map(params![cache_name], |row| Ok(RequestKey { method: row.get(0)?, url: row.get(1)? }))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }
}
