//! Dynamic HTTP router.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ router listener ──▶ dispatch handler ──▶ pinned DispatchTable
//!                                                             │
//!                                 redirect (307/308) ◀────────┤
//!                                 404 ◀───────────────────────┤
//!                                 forward ────────────────────┴──▶ upstream
//!
//!     Admin API ──▶ InMemoryStore ──▶ mutation callback ──▶ Router::reload
//!     Scheduler ────────────────────────────────────────────▶ Router::reload
//!     Config watcher (--watch) ──▶ InMemoryStore::replace_all
//! ```
//!
//! Every response carries `X-Router-Version`, the generation of the table
//! that served it.

use std::path::PathBuf;

use clap::Parser;

use dispatch_router::config::loader::load_config;
use dispatch_router::config::watcher::ConfigWatcher;
use dispatch_router::config::ServiceConfig;
use dispatch_router::lifecycle::{wait_for_shutdown_signal, Service};
use dispatch_router::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "dispatch-router")]
#[command(about = "HTTP router with hot-reloadable redirects and routes", long_about = None)]
struct Args {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Re-read the file's seed section on change and replace the store.
    #[arg(short, long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dispatch-router starting");
    tracing::info!(
        router_address = %config.listener.router_address,
        admin_address = %config.listener.admin_address,
        upstream_enabled = config.listener.upstream_enabled,
        scheduled_reload = config.reload.scheduled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let service = Service::start(config).await?;

    // Dropping the notify watcher stops it, so hold it until shutdown
    let _watcher = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let watcher = watcher.run()?;
            let store = service.store.clone();
            tokio::spawn(async move {
                while let Some(seed) = updates.recv().await {
                    match store.replace_all(seed.redirects, seed.routes) {
                        Ok(generation) => {
                            tracing::info!(generation = ?generation, "Store replaced from config file")
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Config file rejected, keeping current table")
                        }
                    }
                }
            });
            Some(watcher)
        }
        _ => None,
    };

    wait_for_shutdown_signal().await;
    service.shutdown().await;

    Ok(())
}
