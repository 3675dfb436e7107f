//! HTTP server for routed traffic.
//!
//! # Responsibilities
//! - Create the Axum app that sends every path to the dispatch handler
//! - Wire up middleware (tracing, request ID)
//! - Dispatch: pin the current table, then redirect, forward or 404
//! - Stamp the serving generation on every response
//! - Serve with graceful shutdown

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::ServiceConfig;
use crate::http::{
    forward::Forwarder,
    redirect,
    request::{self, RequestIdExt},
    response::{self as responses, stamp_generation},
};
use crate::observability::metrics;
use crate::lifecycle::shutdown::graceful;
use crate::routing::{Action, Router as DispatchRouter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<DispatchRouter>,
    pub forwarder: Forwarder,
}

/// HTTP server for routed traffic.
pub struct HttpServer {
    app: Router,
}

impl HttpServer {
    pub fn new(router: Arc<DispatchRouter>, config: &ServiceConfig) -> Result<Self, rustls::Error> {
        let state = AppState {
            router,
            forwarder: Forwarder::new(&config.timeouts)?,
        };

        Ok(Self {
            app: Self::build_app(state),
        })
    }

    /// Build the Axum app with all middleware layers.
    pub fn build_app(state: AppState) -> Router {
        // Every path goes through the dispatch table, so no axum routes
        request::instrument(Router::new().fallback(dispatch_handler).with_state(state))
    }

    /// The app, for serving on a custom listener or calling in tests.
    pub fn app(&self) -> Router {
        self.app.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Router server starting");

        let app = self
            .app
            .into_make_service_with_connect_info::<std::net::SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(graceful(shutdown))
            .await?;

        tracing::info!("Router server stopped");
        Ok(())
    }
}

/// Resolve the request against the current table and act on the entry.
///
/// The table is loaded exactly once; the generation stamped on the
/// response is the one the entry came from.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let resolution = state.router.resolve(request.uri().path());
    let generation = resolution.generation();

    let (outcome, mut response) = match resolution.entry().map(|entry| &entry.action) {
        None => {
            tracing::debug!(path = %request.uri().path(), generation, "No entry matched");
            ("not_found", responses::not_found())
        }
        Some(Action::Redirect {
            destination,
            status,
        }) => {
            tracing::debug!(
                from = %request.uri().path(),
                to = %destination,
                status = status.as_u16(),
                generation,
                "Redirecting request"
            );
            ("redirect", redirect::respond(destination, *status))
        }
        Some(Action::Route { upstream }) => {
            let request_id = request.request_id().to_string();
            let client_addr = request.client_addr();
            match state.forwarder.forward(upstream, request, client_addr).await {
                Ok(response) => ("route", response),
                Err(e) => {
                    tracing::error!(
                        request_id = %request_id,
                        upstream = %upstream.target(),
                        error = %e,
                        "Upstream error"
                    );
                    ("upstream_error", responses::gateway_error(e.status()))
                }
            }
        }
    };

    stamp_generation(&mut response, generation);
    metrics::record_dispatch(outcome, response.status().as_u16(), start_time);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::X_ROUTER_VERSION;
    use crate::store::{InMemoryStore, RedirectRecord, RouteRecord};
    use axum::http::{header::LOCATION, StatusCode};
    use tower::ServiceExt;

    fn app_with(store: Arc<InMemoryStore>) -> (Router, Arc<DispatchRouter>) {
        let router = DispatchRouter::new(store).unwrap();
        let server = HttpServer::new(router.clone(), &ServiceConfig::default()).unwrap();
        (server.app(), router)
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_carries_generation() {
        let (app, _) = app_with(Arc::new(InMemoryStore::new()));

        let response = app.oneshot(get("/z")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[X_ROUTER_VERSION], "1");
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_redirect_dispatch() {
        let store = Arc::new(InMemoryStore::new());
        let (app, _) = app_with(store.clone());
        store
            .add_redirects(vec![RedirectRecord {
                path: "/redir1".into(),
                destination: "http://localhost/redirected1".into(),
                kind: "temp".into(),
            }])
            .unwrap();

        let response = app.oneshot(get("/redir1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[LOCATION], "http://localhost/redirected1");
        assert_eq!(response.headers()[X_ROUTER_VERSION], "2");
    }

    #[tokio::test]
    async fn test_longest_prefix_dispatch() {
        let redirect = |path: &str, dest: &str| RedirectRecord {
            path: path.into(),
            destination: dest.into(),
            kind: "perm".into(),
        };
        let store = Arc::new(InMemoryStore::with_seed(
            vec![redirect("/a/", "http://subtree"), redirect("/a/b", "http://exact")],
            vec![],
        ));
        let (app, _) = app_with(store);

        let response = app.clone().oneshot(get("/a/b")).await.unwrap();
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(response.headers()[LOCATION], "http://exact");

        let response = app.clone().oneshot(get("/a/c")).await.unwrap();
        assert_eq!(response.headers()[LOCATION], "http://subtree");

        let response = app.oneshot(get("/z")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unreachable_route_is_bad_gateway() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = Arc::new(InMemoryStore::with_seed(
            vec![],
            vec![RouteRecord {
                path: "/route1".into(),
                upstream: format!("http://{}", addr),
            }],
        ));
        let (app, _) = app_with(store);

        let response = app.oneshot(get("/route1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(response.headers()[X_ROUTER_VERSION], "1");
        assert!(response.headers().get(LOCATION).is_none());
    }
}
