//! Client code for offcache.
//!
//! This crate provides the network transport used by the lifecycle handlers
//! and URL resolution against the worker scope.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, UrlError, resolve};
