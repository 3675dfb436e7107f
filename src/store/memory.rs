//! In-memory configuration store.
//!
//! # Responsibilities
//! - Hold redirects and routes keyed by path
//! - Apply batched mutations and notify the registered callback
//! - Undo a batch whose callback (reload) failed
//!
//! # Design Decisions
//! - `DashMap` so reloads can read while the admin API writes
//! - Mutations are serialized so a rollback never undoes a newer batch
//! - No locks are held while the callback runs; it reads the maps back

use std::hash::Hash;
use std::sync::{Mutex, PoisonError, RwLock};

use dashmap::DashMap;

use crate::routing::RouterError;
use crate::store::{ConfigStore, MutationCallback, RedirectRecord, RouteRecord, StoreError};

/// Store backed by concurrent hash maps.
#[derive(Default)]
pub struct InMemoryStore {
    redirects: DashMap<String, RedirectRecord>,
    routes: DashMap<String, RouteRecord>,
    callback: RwLock<Option<MutationCallback>>,
    mutations: Mutex<()>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records. No callback is involved.
    pub fn with_seed(redirects: Vec<RedirectRecord>, routes: Vec<RouteRecord>) -> Self {
        let store = Self::new();
        for redirect in redirects {
            store.redirects.insert(redirect.path.clone(), redirect);
        }
        for route in routes {
            store.routes.insert(route.path.clone(), route);
        }
        store
    }

    /// Insert or overwrite redirects, then run the mutation callback.
    ///
    /// Returns the generation installed by the callback, or `None` when no
    /// callback is registered. If the callback fails the batch is undone.
    pub fn add_redirects(&self, records: Vec<RedirectRecord>) -> Result<Option<u64>, RouterError> {
        let _guard = self.mutations.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(count = records.len(), "Adding redirects");

        let undo = upsert(
            &self.redirects,
            records.into_iter().map(|r| (r.path.clone(), r)),
        );

        self.notify().inspect_err(|_| {
            tracing::warn!("Reload rejected redirects, rolling back");
            restore(&self.redirects, undo);
        })
    }

    /// Insert or overwrite routes, then run the mutation callback.
    ///
    /// Same contract as [`InMemoryStore::add_redirects`].
    pub fn add_routes(&self, records: Vec<RouteRecord>) -> Result<Option<u64>, RouterError> {
        let _guard = self.mutations.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(count = records.len(), "Adding routes");

        let undo = upsert(&self.routes, records.into_iter().map(|r| (r.path.clone(), r)));

        self.notify().inspect_err(|_| {
            tracing::warn!("Reload rejected routes, rolling back");
            restore(&self.routes, undo);
        })
    }

    /// Replace the whole contents of the store, then run the callback.
    pub fn replace_all(
        &self,
        redirects: Vec<RedirectRecord>,
        routes: Vec<RouteRecord>,
    ) -> Result<Option<u64>, RouterError> {
        let _guard = self.mutations.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(
            redirects = redirects.len(),
            routes = routes.len(),
            "Replacing store contents"
        );

        let previous_redirects = snapshot(&self.redirects);
        let previous_routes = snapshot(&self.routes);

        self.redirects.clear();
        self.routes.clear();
        upsert(&self.redirects, redirects.into_iter().map(|r| (r.path.clone(), r)));
        upsert(&self.routes, routes.into_iter().map(|r| (r.path.clone(), r)));

        self.notify().inspect_err(|_| {
            tracing::warn!("Reload rejected new store contents, rolling back");
            self.redirects.clear();
            self.routes.clear();
            upsert(&self.redirects, previous_redirects.into_iter());
            upsert(&self.routes, previous_routes.into_iter());
        })
    }

    fn notify(&self) -> Result<Option<u64>, RouterError> {
        let callback = self
            .callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match callback {
            Some(callback) => callback().map(Some),
            None => Ok(None),
        }
    }
}

impl ConfigStore for InMemoryStore {
    fn list_redirects(&self) -> Result<Vec<RedirectRecord>, StoreError> {
        Ok(self.redirects.iter().map(|e| e.value().clone()).collect())
    }

    fn list_routes(&self) -> Result<Vec<RouteRecord>, StoreError> {
        Ok(self.routes.iter().map(|e| e.value().clone()).collect())
    }

    fn on_mutation(&self, callback: MutationCallback) {
        *self.callback.write().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn refresh(&self) -> Result<Option<u64>, RouterError> {
        let _guard = self.mutations.lock().unwrap_or_else(PoisonError::into_inner);
        self.notify()
    }
}

/// Insert records, returning what each key held before.
fn upsert<K, V>(map: &DashMap<K, V>, records: impl Iterator<Item = (K, V)>) -> Vec<(K, Option<V>)>
where
    K: Eq + Hash + Clone,
{
    records
        .map(|(key, value)| {
            let previous = map.insert(key.clone(), value);
            (key, previous)
        })
        .collect()
}

/// Undo an [`upsert`], newest change first.
fn restore<K: Eq + Hash, V>(map: &DashMap<K, V>, undo: Vec<(K, Option<V>)>) {
    for (key, previous) in undo.into_iter().rev() {
        match previous {
            Some(value) => {
                map.insert(key, value);
            }
            None => {
                map.remove(&key);
            }
        }
    }
}

fn snapshot<V: Clone>(map: &DashMap<String, V>) -> Vec<(String, V)> {
    map.iter()
        .map(|e| (e.key().clone(), e.value().clone()))
        .collect()
}
