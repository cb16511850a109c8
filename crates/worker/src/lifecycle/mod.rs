//! Lifecycle phase implementations.
//!
//! One module per entry point: install, activate, and the fetch router.

pub mod activate;
pub mod fetch;
pub mod install;

pub use activate::{ActivationReport, activate};
pub use fetch::{RouteOutcome, Routed, Router, is_cacheable};
pub use install::install;
