//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files.
//! Every section has defaults, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::store::{RedirectRecord, RouteRecord};

/// Root configuration for the router service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener addresses for the router, admin API and dummy upstream.
    pub listener: ListenerConfig,

    /// Upstream forwarding deadlines.
    pub timeouts: TimeoutConfig,

    /// Scheduled reload settings.
    pub reload: ReloadConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,

    /// Records loaded into the store at startup.
    pub seed: SeedConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address for routed traffic.
    pub router_address: String,

    /// Bind address for the admin API.
    pub admin_address: String,

    /// Bind address for the built-in dummy upstream.
    pub upstream_address: String,

    /// Start the dummy upstream alongside the router.
    pub upstream_enabled: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            router_address: "127.0.0.1:30000".to_string(),
            upstream_address: "127.0.0.1:30001".to_string(),
            admin_address: "127.0.0.1:30002".to_string(),
            upstream_enabled: true,
        }
    }
}

/// Timeouts applied by the proxy forwarder.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total time allowed for the upstream to answer, in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
        }
    }
}

/// Scheduled background reload.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Run the scheduled reload task at startup.
    pub scheduled: bool,

    /// Delay before the first scheduled attempt, in seconds.
    pub initial_delay_secs: u64,

    /// Base delay for retry backoff in milliseconds.
    pub backoff_base_ms: u64,

    /// Maximum delay between retries in milliseconds.
    pub backoff_max_ms: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            scheduled: true,
            initial_delay_secs: 20,
            backoff_base_ms: 1000,
            backoff_max_ms: 30_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Initial store contents.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SeedConfig {
    pub redirects: Vec<RedirectRecord>,
    pub routes: Vec<RouteRecord>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            redirects: vec![RedirectRecord {
                path: "/ons".to_string(),
                destination: "https://www.ons.gov.uk/".to_string(),
                kind: "temp".to_string(),
            }],
            routes: vec![RouteRecord {
                path: "/moo".to_string(),
                upstream: "http://localhost:30001".to_string(),
            }],
        }
    }
}
