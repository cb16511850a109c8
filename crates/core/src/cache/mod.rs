//! SQLite-backed cache storage for intercepted responses.
//!
//! Responses live in named cache stores, one per generation identifier.
//! Access goes through tokio-rusqlite so every operation is async. It provides:
//!
//! - Named stores that can be listed, opened and deleted as a whole
//! - Entries keyed by request identity (method + URL, SHA-256 addressed)
//! - An all-or-nothing batch write used by install
//! - Automatic schema migrations

pub mod caches;
pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use storage::{CacheStorage, CacheStore};
