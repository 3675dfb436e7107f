//! Request instrumentation.
//!
//! # Responsibilities
//! - Attach a UUID v4 request ID (`x-request-id`) to every request
//! - Echo the request ID on the response
//! - Open one tracing span per request carrying method, path and ID
//!
//! # Design Decisions
//! - Request ID added as early as possible (outermost layer)
//! - An ID already sent by the client is kept, not replaced

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderName, Request},
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Accessors for values the middleware stack stores on a request.
pub trait RequestIdExt {
    /// The request ID, or `"unknown"` outside the instrumented stack.
    fn request_id(&self) -> &str;

    /// Peer address, when served with connect info.
    fn client_addr(&self) -> Option<SocketAddr>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> &str {
        self.extensions()
            .get::<RequestId>()
            .and_then(|id| id.header_value().to_str().ok())
            .unwrap_or("unknown")
    }

    fn client_addr(&self) -> Option<SocketAddr> {
        self.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr)
    }
}

/// Wrap an app with request ID and trace layers.
pub fn instrument(app: Router) -> Router {
    app.layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                path = %req.uri().path(),
                request_id = %req.request_id(),
            )
        }))
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
}
