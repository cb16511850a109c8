//! Subcommands of the development host.

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use offcache_client::resolve;
use offcache_core::{CacheDb, Destination, Request, RequestMode};
use offcache_worker::{OfflineWorker, Routed, WorkerHost, WorkerState};
use serde::Serialize;

/// Run the offline cache worker lifecycle by hand.
#[derive(Debug, Parser)]
#[command(name = "offcache", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Precache the manifest into the current generation's store.
    Install,
    /// Delete stores left over from earlier generations.
    Activate,
    /// Route one request through the worker.
    Fetch(FetchArgs),
    /// Install, activate, then route each URL.
    Run {
        /// URLs or paths relative to the scope.
        #[arg(required = true)]
        urls: Vec<String>,
        /// Treat every request as a page navigation.
        #[arg(long)]
        navigate: bool,
    },
    /// List cache stores and their entry counts.
    Caches,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// URL or path relative to the scope.
    pub url: String,
    #[arg(long, default_value = "GET")]
    pub method: String,
    /// Send as a navigation (mode=navigate, destination=document).
    #[arg(long)]
    pub navigate: bool,
    #[arg(long)]
    pub mode: Option<RequestMode>,
    #[arg(long)]
    pub destination: Option<Destination>,
}

/// JSON summary of a routed response.
#[derive(Debug, Serialize)]
pub struct RouteOutput {
    pub url: String,
    pub outcome: &'static str,
    pub status: u16,
    pub status_text: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub content_type: Option<String>,
    pub body_bytes: usize,
    /// Body text, when it is UTF-8.
    pub body: Option<String>,
}

impl RouteOutput {
    fn new(url: &str, routed: &Routed) -> Self {
        let response = &routed.response;
        Self {
            url: url.to_string(),
            outcome: routed.outcome.as_str(),
            status: response.status,
            status_text: response.status_text.clone(),
            kind: response.kind.as_str(),
            content_type: response.content_type().map(str::to_string),
            body_bytes: response.body.len(),
            body: response.text().map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
struct CacheSummary {
    name: String,
    entries: usize,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

impl FetchArgs {
    fn to_request(&self, worker: &OfflineWorker) -> Result<Request> {
        let url = resolve(&worker.config().scope, &self.url)?;
        let mut request = Request::new(&self.method, url);
        if self.navigate {
            request = request.with_mode(RequestMode::Navigate).with_destination(Destination::Document);
        }
        if let Some(mode) = self.mode {
            request.mode = mode;
        }
        if let Some(destination) = self.destination {
            request.destination = destination;
        }
        Ok(request)
    }
}

async fn route_and_report(worker: &OfflineWorker, request: Request) -> Result<RouteOutput> {
    let url = request.url.to_string();
    let mut routed = worker.router().route(request).await;

    // The process exits right after; let the write-back land first.
    if let Some(write_back) = routed.write_back.take() {
        write_back.await?;
    }

    Ok(RouteOutput::new(&url, &routed))
}

/// Run a lifecycle command against the worker.
pub async fn run(worker: &OfflineWorker, command: Command) -> Result<()> {
    match command {
        Command::Install => {
            let cached = worker.precache().await?;
            print_json(&serde_json::json!({ "generation": worker.config().generation, "cached": cached }))
        }
        Command::Activate => {
            let report = worker.cleanup().await?;
            print_json(&serde_json::json!({
                "generation": worker.config().generation,
                "deleted": report.deleted,
                "failed": report.failed,
            }))
        }
        Command::Fetch(args) => {
            let request = args.to_request(worker)?;
            print_json(&route_and_report(worker, request).await?)
        }
        Command::Run { urls, navigate } => {
            let host = WorkerHost::new();
            if host.register(Arc::new(worker.clone())).await != WorkerState::Activated {
                bail!("install failed for {}; see logs", worker.config().generation);
            }

            let mut outputs = Vec::with_capacity(urls.len());
            for url in &urls {
                let args = FetchArgs { url: url.clone(), method: "GET".into(), navigate, mode: None, destination: None };
                outputs.push(route_and_report(worker, args.to_request(worker)?).await?);
            }
            print_json(&outputs)
        }
        Command::Caches => bail!("caches does not need a worker"),
    }
}

/// Print every cache store and its entry count.
pub async fn caches(db: &CacheDb) -> Result<()> {
    let mut summaries = Vec::new();
    for name in db.cache_names().await? {
        let entries = db.entry_keys(&name).await?.len();
        summaries.push(CacheSummary { name, entries });
    }
    print_json(&summaries)
}
