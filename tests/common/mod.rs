//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, Router};
use dispatch_router::config::{ListenerConfig, ServiceConfig};
use dispatch_router::{RunningService, Service};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Mock backend that counts arrivals and holds responses until released.
pub struct GatedBackend {
    pub addr: SocketAddr,
    arrivals: Arc<AtomicUsize>,
    gate: watch::Sender<bool>,
}

impl GatedBackend {
    pub fn arrivals(&self) -> usize {
        self.arrivals.load(Ordering::SeqCst)
    }

    /// Let every held and future request through.
    pub fn release(&self) {
        let _ = self.gate.send(true);
    }

    /// Poll until `count` requests have arrived.
    pub async fn wait_for_arrivals(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while self.arrivals() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("backend never saw the expected requests");
    }
}

/// Start a backend whose responses wait for [`GatedBackend::release`].
pub async fn start_gated_backend() -> GatedBackend {
    let arrivals = Arc::new(AtomicUsize::new(0));
    let (gate, gate_rx) = watch::channel(false);

    let counter = arrivals.clone();
    let app = Router::new().fallback(move || {
        let counter = counter.clone();
        let mut gate_rx = gate_rx.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = gate_rx.wait_for(|open| *open).await;
            (StatusCode::OK, "from backend")
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    GatedBackend {
        addr,
        arrivals,
        gate,
    }
}

/// Start a backend that answers immediately.
pub async fn start_open_backend() -> GatedBackend {
    let backend = start_gated_backend().await;
    backend.release();
    backend
}

/// Start the service on ephemeral ports with an empty store.
pub async fn start_service() -> RunningService {
    let mut config = ServiceConfig::default();
    config.listener = ListenerConfig {
        router_address: "127.0.0.1:0".into(),
        admin_address: "127.0.0.1:0".into(),
        upstream_address: "127.0.0.1:0".into(),
        upstream_enabled: false,
    };
    config.reload.scheduled = false;
    config.timeouts.upstream_secs = 5;
    config.seed.redirects.clear();
    config.seed.routes.clear();

    Service::start(config).await.expect("service failed to start")
}

/// Client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

pub async fn add_route(
    client: &reqwest::Client,
    service: &RunningService,
    path: &str,
    host: &str,
) -> reqwest::Response {
    client
        .post(format!("http://{}/routes", service.admin_addr))
        .json(&json!([{ "path": path, "host": host }]))
        .send()
        .await
        .expect("admin API unreachable")
}

pub async fn add_redirect(
    client: &reqwest::Client,
    service: &RunningService,
    path: &str,
    destination: &str,
    kind: &str,
) -> reqwest::Response {
    client
        .post(format!("http://{}/redirects", service.admin_addr))
        .json(&json!([{ "path": path, "redirect": destination, "type": kind }]))
        .send()
        .await
        .expect("admin API unreachable")
}

/// Generation stamped on a router response.
pub fn router_version(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get("x-router-version")
        .expect("response is missing x-router-version")
        .to_str()
        .unwrap()
        .parse()
        .unwrap()
}
