//! Proxy forwarder.
//!
//! # Responsibilities
//! - Rewrite the request URI and `Host` for the route's upstream
//! - Strip hop-by-hop headers in both directions
//! - Append the client address to `X-Forwarded-For`
//! - Stream request and response bodies through unbuffered
//!
//! # Design Decisions
//! - One shared pooled client for all upstreams, plain or TLS by scheme
//! - No retries: a failed forward is reported to the client once
//! - Connection failures map to 502, deadline overruns to 504

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    http::{
        header::{CONNECTION, HOST},
        HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode, Version,
    },
};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::config::TimeoutConfig;
use crate::routing::Upstream;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Headers that describe one connection and must not be forwarded.
const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(#[from] hyper_util::client::legacy::Error),

    #[error("upstream did not answer within {0:?}")]
    Timeout(Duration),

    #[error("cannot build upstream request: {0}")]
    InvalidRequest(#[from] axum::http::Error),
}

impl ForwardError {
    /// Status reported to the original client.
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ForwardError::UpstreamUnreachable(_) | ForwardError::InvalidRequest(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

/// Forwards routed requests to their upstream.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpsConnector<HttpConnector>, Body>,
    timeout: Duration,
}

impl Forwarder {
    /// Fails only if the TLS provider cannot be set up.
    pub fn new(config: &TimeoutConfig) -> Result<Self, rustls::Error> {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.connect_secs)));
        // The TLS wrapper decides per URI; the inner connector must not
        // refuse https
        connector.enforce_http(false);

        let connector = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
            .https_or_http()
            .enable_http1()
            .wrap_connector(connector);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            timeout: Duration::from_secs(config.upstream_secs),
        })
    }

    /// Forward `request` to `upstream` and return its response.
    pub async fn forward(
        &self,
        upstream: &Upstream,
        request: Request<Body>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<Body>, ForwardError> {
        let (mut parts, body) = request.into_parts();

        parts.uri = upstream.target_uri(&parts.uri)?;
        // The pooled client speaks HTTP/1.1 to upstreams whatever the
        // client used
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);
        parts.headers.insert(HOST, upstream.host_header().clone());
        if let Some(addr) = client_addr {
            append_forwarded_for(&mut parts.headers, addr);
        }

        tracing::debug!(uri = %parts.uri, method = %parts.method, "Forwarding to upstream");

        let upstream_request = Request::from_parts(parts, body);
        let response = match tokio::time::timeout(self.timeout, self.client.request(upstream_request)).await {
            Ok(result) => result?,
            Err(_) => return Err(ForwardError::Timeout(self.timeout)),
        };

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Remove hop-by-hop headers, including any listed in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, addr: SocketAddr) {
    let ip = addr.ip().to_string();
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, ip),
        None => ip,
    };

    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Request as AxumRequest, Router};
    use tokio::net::TcpListener;

    fn seen(headers: &HeaderMap, name: &str) -> String {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    }

    /// Upstream that echoes what it received in response headers.
    async fn echo_upstream() -> SocketAddr {
        let app = Router::new().fallback(|req: AxumRequest| async move {
            let headers = [
                ("x-seen-host", seen(req.headers(), "host")),
                ("x-seen-forwarded-for", seen(req.headers(), "x-forwarded-for")),
                ("x-seen-keep-alive", seen(req.headers(), "keep-alive")),
                ("x-seen-custom", seen(req.headers(), "x-custom")),
                ("x-seen-uri", req.uri().to_string()),
                ("connection", "x-upstream-secret".to_string()),
                ("x-upstream-secret", "leak".to_string()),
            ];
            let body = axum::body::to_bytes(req.into_body(), 1024)
                .await
                .unwrap_or_default();
            (StatusCode::CREATED, headers, body)
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn config() -> TimeoutConfig {
        TimeoutConfig {
            connect_secs: 1,
            upstream_secs: 2,
        }
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive, x-private"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-private", HeaderValue::from_static("1"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("x-kept", HeaderValue::from_static("1"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert_eq!(headers["x-kept"], "1");
    }

    #[test]
    fn test_forwarded_for_appends() {
        let addr: SocketAddr = "192.0.2.10:1234".parse().unwrap();
        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, addr);
        assert_eq!(headers[X_FORWARDED_FOR], "192.0.2.10");

        append_forwarded_for(&mut headers, "198.51.100.1:80".parse().unwrap());
        assert_eq!(headers[X_FORWARDED_FOR], "192.0.2.10, 198.51.100.1");
    }

    #[tokio::test]
    async fn test_forward_relays_request_and_response() {
        let addr = echo_upstream().await;
        let upstream = Upstream::parse(&format!("http://{}", addr)).unwrap();
        let forwarder = Forwarder::new(&config()).unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/route1?x=1")
            .header(HOST, "router.local")
            .header("keep-alive", "timeout=5")
            .header("x-custom", "yes")
            .body(Body::from("payload"))
            .unwrap();

        let response = forwarder
            .forward(&upstream, request, Some("203.0.113.5:4000".parse().unwrap()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let headers = response.headers();
        assert_eq!(headers["x-seen-host"], addr.to_string().as_str());
        assert_eq!(headers["x-seen-forwarded-for"], "203.0.113.5");
        assert_eq!(headers["x-seen-keep-alive"], "");
        assert_eq!(headers["x-seen-custom"], "yes");
        assert_eq!(headers["x-seen-uri"], "/route1?x=1");
        assert!(headers.get("x-upstream-secret").is_none());

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"payload");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let upstream = Upstream::parse(&format!("http://{}", addr)).unwrap();
        let forwarder = Forwarder::new(&config()).unwrap();
        let request = Request::builder().uri("/route1").body(Body::empty()).unwrap();

        let err = forwarder.forward(&upstream, request, None).await.unwrap_err();
        assert!(matches!(err, ForwardError::UpstreamUnreachable(_)));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let app = Router::new().fallback(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::OK
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let upstream = Upstream::parse(&format!("http://{}", addr)).unwrap();
        let forwarder = Forwarder::new(&TimeoutConfig {
            connect_secs: 1,
            upstream_secs: 1,
        })
        .unwrap();
        let request = Request::builder().uri("/slow").body(Body::empty()).unwrap();

        let err = forwarder.forward(&upstream, request, None).await.unwrap_err();
        assert!(matches!(err, ForwardError::Timeout(_)));
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_https_upstream_goes_through_tls_connector() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let upstream = Upstream::parse(&format!("https://{}", addr)).unwrap();
        let forwarder = Forwarder::new(&config()).unwrap();
        let request = Request::builder().uri("/secure").body(Body::empty()).unwrap();

        // Refused at TCP level, so the scheme was accepted all the way down
        let err = forwarder.forward(&upstream, request, None).await.unwrap_err();
        assert!(matches!(err, ForwardError::UpstreamUnreachable(_)));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
