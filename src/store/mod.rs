//! Configuration store subsystem.
//!
//! # Data Flow
//! ```text
//! Admin API / config watcher
//!     → memory.rs (mutate redirects/routes keyed by path)
//!     → registered mutation callback (Router::reload)
//!     → on failure: mutation rolled back, error returned
//!
//! Router reload
//!     → ConfigStore::list_redirects / list_routes (point-in-time read)
//!
//! Scheduled reload
//!     → ConfigStore::refresh (waits for in-progress mutations)
//!     → registered mutation callback
//! ```
//!
//! # Design Decisions
//! - The router only sees the `ConfigStore` trait
//! - Records are keyed by path; inserting an existing path overwrites
//! - Redirect and route records keep their wire names (`redirect`, `type`,
//!   `host`) so the admin API and TOML seed share one schema

pub mod memory;

pub use memory::InMemoryStore;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routing::RouterError;

/// A stored redirect definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RedirectRecord {
    pub path: String,

    /// Redirect target, emitted verbatim as `Location`.
    #[serde(rename = "redirect")]
    pub destination: String,

    /// `"perm"` or `"temp"`; anything else is treated as temporary.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    "temp".to_string()
}

/// A stored route definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RouteRecord {
    pub path: String,

    /// Upstream URL, e.g. `http://localhost:30001`.
    #[serde(rename = "host")]
    pub upstream: String,
}

/// Error type for store reads.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Callback run after every successful store mutation.
///
/// Returns the generation installed by the resulting reload.
pub type MutationCallback = Arc<dyn Fn() -> Result<u64, RouterError> + Send + Sync>;

/// Read interface the router consumes.
pub trait ConfigStore: Send + Sync {
    /// All redirects currently stored. Order is irrelevant.
    fn list_redirects(&self) -> Result<Vec<RedirectRecord>, StoreError>;

    /// All routes currently stored. Order is irrelevant.
    fn list_routes(&self) -> Result<Vec<RouteRecord>, StoreError>;

    /// Register the callback invoked after each mutation.
    /// Replaces any previously registered callback.
    fn on_mutation(&self, callback: MutationCallback);

    /// Run the registered callback without changing any record.
    ///
    /// Ordered with mutations: never observes a batch half applied or one
    /// that is about to be rolled back. `None` when no callback is set.
    fn refresh(&self) -> Result<Option<u64>, RouterError>;
}
