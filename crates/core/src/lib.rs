//! Core types and shared functionality for offcache.
//!
//! This crate provides:
//! - Request/response model for intercepted fetches
//! - Cache storage with SQLite backend
//! - The network `Transport` seam
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod request;
pub mod response;
pub mod transport;

pub use cache::{CacheDb, CacheStorage, CacheStore};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use request::{Destination, Request, RequestKey, RequestMode};
pub use response::{OFFLINE_BODY, Response, ResponseType};
pub use transport::Transport;
