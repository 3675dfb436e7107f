//! Service orchestration.
//!
//! # Responsibilities
//! - Seed the store and build the first dispatch table
//! - Bind the router, admin and (optionally) dummy upstream listeners
//! - Spawn the servers and the scheduled reload
//! - Tear everything down on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::admin::{self, AdminState};
use crate::config::ServiceConfig;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::routing::{ReloadScheduler, Router, RouterError};
use crate::store::InMemoryStore;
use crate::upstream;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("initial dispatch table: {0}")]
    Router(#[from] RouterError),

    #[error("upstream TLS setup: {0}")]
    Tls(#[from] rustls::Error),

    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

pub struct Service;

impl Service {
    /// Start every component described by `config`.
    ///
    /// When this returns, all listeners are bound and generation 1 is
    /// serving.
    pub async fn start(config: ServiceConfig) -> Result<RunningService, ServiceError> {
        let store = Arc::new(InMemoryStore::with_seed(
            config.seed.redirects.clone(),
            config.seed.routes.clone(),
        ));
        let router = Router::new(store.clone())?;

        let shutdown = Shutdown::new();
        let mut tasks = Vec::new();

        let upstream_addr = if config.listener.upstream_enabled {
            let listener = bind(&config.listener.upstream_address).await?;
            let addr = local_addr(&listener, &config.listener.upstream_address)?;
            let rx = shutdown.subscribe();
            tasks.push(tokio::spawn(async move {
                if let Err(e) = upstream::serve(listener, rx).await {
                    tracing::error!(error = %e, "Dummy upstream failed");
                }
            }));
            Some(addr)
        } else {
            None
        };

        let router_listener = bind(&config.listener.router_address).await?;
        let router_addr = local_addr(&router_listener, &config.listener.router_address)?;
        let admin_listener = bind(&config.listener.admin_address).await?;
        let admin_addr = local_addr(&admin_listener, &config.listener.admin_address)?;

        let server = HttpServer::new(router.clone(), &config)?;
        let rx = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = server.run(router_listener, rx).await {
                tracing::error!(error = %e, "Router server failed");
            }
        }));

        let state = AdminState {
            store: store.clone(),
            router: router.clone(),
        };
        let rx = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = admin::serve(admin_listener, state, rx).await {
                tracing::error!(error = %e, "Admin server failed");
            }
        }));

        let scheduler = ReloadScheduler::new(router.clone(), config.reload.clone());
        let rx = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            scheduler.run(rx).await;
        }));

        tracing::info!(
            router = %router_addr,
            admin = %admin_addr,
            upstream = ?upstream_addr,
            generation = router.generation(),
            "Service started"
        );

        Ok(RunningService {
            router_addr,
            admin_addr,
            upstream_addr,
            store,
            router,
            shutdown,
            tasks,
        })
    }
}

/// Handle to a started service.
pub struct RunningService {
    pub router_addr: SocketAddr,
    pub admin_addr: SocketAddr,
    pub upstream_addr: Option<SocketAddr>,
    pub store: Arc<InMemoryStore>,
    pub router: Arc<Router>,
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
}

impl RunningService {
    /// Signal every task and wait for them to finish draining.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down service");
        self.shutdown.trigger();

        let drain = join_tasks(self.tasks);
        if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
            tracing::warn!(grace = ?SHUTDOWN_GRACE, "Tasks still running after shutdown deadline");
        }
        tracing::info!("Shutdown complete");
    }
}

async fn join_tasks(tasks: Vec<JoinHandle<()>>) {
    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Task panicked during shutdown");
        }
    }
}

async fn bind(addr: &str) -> Result<TcpListener, ServiceError> {
    TcpListener::bind(addr).await.map_err(|source| ServiceError::Bind {
        addr: addr.to_string(),
        source,
    })
}

fn local_addr(listener: &TcpListener, addr: &str) -> Result<SocketAddr, ServiceError> {
    listener.local_addr().map_err(|source| ServiceError::Bind {
        addr: addr.to_string(),
        source,
    })
}
