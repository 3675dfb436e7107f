//! Built-in dummy upstream.
//!
//! Answers every request with an empty 200 so the router can be exercised
//! without a real backend. An `x-upstream-delay` header (milliseconds)
//! holds the response back, which is handy for watching in-flight requests
//! across a reload.

use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::lifecycle::shutdown::graceful;

pub const X_UPSTREAM_DELAY: &str = "x-upstream-delay";

pub fn app() -> Router {
    Router::new().fallback(handler)
}

async fn handler(request: Request<Body>) -> StatusCode {
    tracing::info!(path = %request.uri().path(), "Dummy upstream received request");

    if let Some(delay) = requested_delay(request.headers()) {
        tokio::time::sleep(delay).await;
    }
    StatusCode::OK
}

fn requested_delay(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(X_UPSTREAM_DELAY)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
        .map(Duration::from_millis)
}

/// Serve the dummy upstream on `listener` until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    tracing::info!(address = %listener.local_addr()?, "Dummy upstream starting");

    axum::serve(listener, app())
        .with_graceful_shutdown(graceful(shutdown))
        .await
}
