//! Table ownership, reload and lookup.
//!
//! # Responsibilities
//! - Hold the current dispatch table
//! - Rebuild and publish tables on reload
//! - Resolve request paths against one pinned table
//!
//! # Design Decisions
//! - `ArcSwap` publish: readers never lock and never see a half-built table
//! - A mutex serializes reloads; generation N + 1 is derived from the
//!   installed table while holding it
//! - The store holds only a weak reference back to the router

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

use crate::observability::metrics;
use crate::routing::{entry::Entry, table::DispatchTable, RouterError};
use crate::store::ConfigStore;

/// Result of resolving one request path.
///
/// Keeps the table it was resolved against alive, so the entry and the
/// generation always belong together even if a reload lands mid-request.
#[derive(Debug, Clone)]
pub struct Resolution {
    table: Arc<DispatchTable>,
    entry: Option<usize>,
}

impl Resolution {
    pub fn generation(&self) -> u64 {
        self.table.generation()
    }

    /// The matched entry, or `None` for not-found.
    pub fn entry(&self) -> Option<&Entry> {
        self.entry.and_then(|idx| self.table.entry(idx))
    }
}

/// Owner of the active dispatch table.
pub struct Router {
    store: Arc<dyn ConfigStore>,
    current: ArcSwap<DispatchTable>,
    reload_lock: Mutex<()>,
}

impl Router {
    /// Build the first table from `store` and register for its mutations.
    ///
    /// Fails if the initial table cannot be built.
    pub fn new(store: Arc<dyn ConfigStore>) -> Result<Arc<Self>, RouterError> {
        tracing::info!("Building initial dispatch table");
        let table = Self::build_from(store.as_ref(), 1).inspect_err(|e| {
            metrics::record_reload(false);
            tracing::error!(error = %e, "Initial router load failed");
        })?;
        Self::installed(&table);

        let router = Arc::new(Self {
            store: store.clone(),
            current: ArcSwap::from_pointee(table),
            reload_lock: Mutex::new(()),
        });

        let weak = Arc::downgrade(&router);
        store.on_mutation(Arc::new(move || match weak.upgrade() {
            Some(router) => router.reload(),
            None => Err(RouterError::ConfigurationUnavailable(
                crate::store::StoreError::Unavailable("router has been dropped".into()),
            )),
        }));

        Ok(router)
    }

    /// Rebuild the table from the store and install it.
    ///
    /// Returns the new generation. On error the current table is untouched.
    pub fn reload(&self) -> Result<u64, RouterError> {
        let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let previous = self.current.load().generation();
        tracing::info!(generation = previous, "Starting router reload");

        match Self::build_from(self.store.as_ref(), previous + 1) {
            Ok(table) => {
                let generation = table.generation();
                Self::installed(&table);
                self.current.store(Arc::new(table));
                Ok(generation)
            }
            Err(e) => {
                metrics::record_reload(false);
                tracing::error!(
                    error = %e,
                    generation = previous,
                    "Router reload failed, keeping current table"
                );
                Err(e)
            }
        }
    }

    /// Reload on behalf of something other than a store mutation.
    ///
    /// Goes through the store so it queues behind any batch being applied,
    /// and never installs records that batch later rolls back.
    pub fn refresh(&self) -> Result<u64, RouterError> {
        match self.store.refresh()? {
            Some(generation) => Ok(generation),
            None => self.reload(),
        }
    }

    /// Pin the current table and resolve `path` against it.
    pub fn resolve(&self, path: &str) -> Resolution {
        let table = self.current.load_full();
        let entry = table.resolve_index(path);
        Resolution { table, entry }
    }

    /// The table currently serving requests.
    pub fn current(&self) -> Arc<DispatchTable> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation()
    }

    fn build_from(store: &dyn ConfigStore, generation: u64) -> Result<DispatchTable, RouterError> {
        let redirects = store.list_redirects()?;
        tracing::debug!(count = redirects.len(), "Redirects read from store");
        let routes = store.list_routes()?;
        tracing::debug!(count = routes.len(), "Routes read from store");

        DispatchTable::build(generation, &redirects, &routes)
    }

    fn installed(table: &DispatchTable) {
        metrics::record_reload(true);
        metrics::set_generation(table.generation());
        tracing::info!(
            generation = table.generation(),
            entries = table.len(),
            "Dispatch table installed"
        );
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}
