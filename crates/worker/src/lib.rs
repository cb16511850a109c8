//! The offline caching agent.
//!
//! Three lifecycle entry points share one [`WorkerConfig`]:
//!
//! - **install** precaches the manifest into the store named by the generation
//! - **activate** deletes every store left over from earlier generations
//! - **fetch** answers each intercepted request cache-first, falling back to
//!   the network and then to an offline response
//!
//! [`OfflineWorker`] bundles them behind the [`LifecycleHandler`] trait and
//! [`WorkerHost`] drives a handler through its lifecycle.

pub mod config;
pub mod error;
pub mod handler;
pub mod host;
pub mod lifecycle;

pub use config::WorkerConfig;
pub use error::WorkerError;
pub use handler::{LifecycleHandler, OfflineWorker};
pub use host::{WorkerHost, WorkerState};
pub use lifecycle::{ActivationReport, RouteOutcome, Routed, Router};
