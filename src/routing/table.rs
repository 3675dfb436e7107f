//! Immutable dispatch tables.
//!
//! # Responsibilities
//! - Compile a store snapshot into entries
//! - Resolve a request path to at most one entry
//!
//! # Design Decisions
//! - Built in one pass; any bad record fails the whole table
//! - O(1) exact lookup via HashMap, then subtree patterns scanned
//!   longest-first so the first hit is the most specific one
//! - Duplicate paths of the same kind overwrite (store semantics);
//!   the same path as redirect and route is a conflict

use std::collections::HashMap;

use crate::routing::{entry::Entry, RouterError};
use crate::store::{RedirectRecord, RouteRecord};

/// A fully built, versioned routing table.
#[derive(Debug)]
pub struct DispatchTable {
    generation: u64,
    entries: Vec<Entry>,
    /// Exact pattern -> entry index.
    exact: HashMap<String, usize>,
    /// Subtree entry indices, longest pattern first.
    subtrees: Vec<usize>,
}

impl DispatchTable {
    /// Build a table from a snapshot of the configuration store.
    ///
    /// Pure: only reads its inputs.
    pub fn build(
        generation: u64,
        redirects: &[RedirectRecord],
        routes: &[RouteRecord],
    ) -> Result<Self, RouterError> {
        let mut entries: Vec<Entry> = Vec::with_capacity(redirects.len() + routes.len());
        let mut by_pattern: HashMap<String, usize> = HashMap::new();

        let compiled = redirects
            .iter()
            .map(|redirect| {
                tracing::trace!(path = %redirect.path, redirect = %redirect.destination, kind = %redirect.kind, "Adding redirect");
                Entry::redirect(redirect)
            })
            .chain(routes.iter().map(|route| {
                tracing::trace!(path = %route.path, host = %route.upstream, "Adding route");
                Entry::route(route)
            }));

        for entry in compiled {
            let entry = entry?;
            let key = entry.pattern.as_str().to_string();
            match by_pattern.get(&key) {
                Some(&idx) if entries[idx].is_redirect() != entry.is_redirect() => {
                    return Err(RouterError::ConflictingPattern(key));
                }
                Some(&idx) => entries[idx] = entry,
                None => {
                    by_pattern.insert(key, entries.len());
                    entries.push(entry);
                }
            }
        }

        let mut exact = HashMap::new();
        let mut subtrees = Vec::new();
        for (idx, entry) in entries.iter().enumerate() {
            if entry.pattern.is_subtree() {
                subtrees.push(idx);
            } else {
                exact.insert(entry.pattern.as_str().to_string(), idx);
            }
        }
        subtrees.sort_by_key(|&idx| std::cmp::Reverse(entries[idx].pattern.as_str().len()));

        Ok(Self {
            generation,
            entries,
            exact,
            subtrees,
        })
    }

    /// Index of the entry serving `path`, if any.
    pub fn resolve_index(&self, path: &str) -> Option<usize> {
        if let Some(&idx) = self.exact.get(path) {
            return Some(idx);
        }

        self.subtrees
            .iter()
            .copied()
            .find(|&idx| self.entries[idx].pattern.matches(path))
    }

    /// The entry serving `path`, if any.
    pub fn resolve(&self, path: &str) -> Option<&Entry> {
        self.resolve_index(path).map(|idx| &self.entries[idx])
    }

    pub fn entry(&self, idx: usize) -> Option<&Entry> {
        self.entries.get(idx)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
