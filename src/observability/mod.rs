//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router, forwarder, admin API produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields, never formatted strings, for machine parsing
//! - Request ID (`x-request-id`) attached by tower-http on every request
//! - Metrics are cheap (atomic increments) and no-ops without a recorder

pub mod logging;
pub mod metrics;
