//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Reload (store mutation or scheduled task):
//!     ConfigStore snapshot (redirects + routes)
//!     → entry.rs (parse kinds, upstream targets)
//!     → matcher.rs (compile path patterns)
//!     → table.rs (immutable DispatchTable, generation N + 1)
//!     → router.rs (atomic publish via ArcSwap)
//!
//! Incoming Request (path)
//!     → router.rs (load current table once)
//!     → table.rs (exact lookup, then longest subtree prefix)
//!     → Return: Resolution { generation, entry or NoMatch }
//! ```
//!
//! # Design Decisions
//! - Tables are compiled once per reload and never mutated afterwards
//! - A failed build leaves the current table in place
//! - Reloads are serialized; request dispatch never waits on them
//! - Each request pins one table for its whole lifetime

pub mod entry;
pub mod matcher;
pub mod router;
pub mod scheduler;
pub mod table;

pub use entry::{Action, Entry, RedirectKind, Upstream};
pub use matcher::PathPattern;
pub use router::{Resolution, Router};
pub use scheduler::ReloadScheduler;
pub use table::DispatchTable;

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while building or installing a dispatch table.
///
/// Every variant aborts only the reload that produced it; the previously
/// installed table keeps serving.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The configuration store could not be read.
    #[error("configuration unavailable: {0}")]
    ConfigurationUnavailable(#[from] StoreError),

    /// A route's upstream host is not a usable forwarding target.
    #[error("invalid route configuration for {path:?}: upstream {host:?}: {source}")]
    InvalidRouteConfiguration {
        path: String,
        host: String,
        #[source]
        source: entry::UpstreamError,
    },

    /// A path pattern is empty or not rooted.
    #[error("invalid path pattern {0:?}: patterns must start with '/'")]
    InvalidPathPattern(String),

    /// The same pattern is configured both as a redirect and as a route.
    #[error("path pattern {0:?} is configured as both a redirect and a route")]
    ConflictingPattern(String),
}
