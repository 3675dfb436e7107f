//! Admin API for mutating the configuration store.
//!
//! # Endpoints
//! - `POST /routes`, `POST /redirects`: upsert records, reload, 201
//! - `GET /routes`, `GET /redirects`: current store contents
//! - `GET /status`: crate version and serving generation
//!
//! # Design Decisions
//! - A mutation answers only after its reload finished, so a 201 means the
//!   new table is already serving
//! - A mutation whose reload fails is rolled back and answered 422

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::http::request;
use crate::lifecycle::shutdown::graceful;
use crate::routing::Router as DispatchRouter;
use crate::store::InMemoryStore;
use self::handlers::*;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub store: Arc<InMemoryStore>,
    pub router: Arc<DispatchRouter>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    request::instrument(
        Router::new()
            .route("/routes", get(list_routes).post(add_routes))
            .route("/redirects", get(list_redirects).post(add_redirects))
            .route("/status", get(get_status))
            .with_state(state),
    )
}

/// Serve the admin API on `listener` until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    state: AdminState,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    tracing::info!(address = %listener.local_addr()?, "Admin server starting");

    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(graceful(shutdown))
        .await?;

    tracing::info!("Admin server stopped");
    Ok(())
}
