//! offcache development host.
//!
//! Drives the worker lifecycle against a real SQLite cache file and the real
//! network. Command output is JSON on stdout; logs go to stderr.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use offcache_client::{FetchClient, FetchConfig};
use offcache_core::{AppConfig, CacheDb};
use offcache_worker::{OfflineWorker, WorkerConfig};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load().context("loading configuration")?;
    let worker_config = WorkerConfig::try_from(&config)?;

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?;

    tracing::debug!(generation = %config.generation, db = %config.db_path.display(), "starting offcache");

    match cli.command {
        Command::Caches => commands::caches(&db).await,
        command => {
            let transport = FetchClient::new(&FetchConfig::from(&config), &worker_config.scope)?;
            let worker = OfflineWorker::new(worker_config, Arc::new(db), Arc::new(transport));
            commands::run(&worker, command).await
        }
    }
}
