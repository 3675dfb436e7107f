//! Path pattern matching.
//!
//! # Responsibilities
//! - Classify configured paths as exact or subtree patterns
//! - Match a request path against a single pattern
//!
//! # Design Decisions
//! - A trailing `/` makes a pattern a subtree: it matches itself and every
//!   path below it (`/` alone is a catch-all)
//! - Anything else matches only the identical path
//! - Matching is case-sensitive and byte-wise; no regex

use crate::routing::RouterError;

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathPattern {
    /// Matches only this exact path.
    Exact(String),
    /// Matches this path and every path it prefixes. Always ends with `/`.
    Subtree(String),
}

impl PathPattern {
    /// Compile a configured path.
    pub fn parse(pattern: &str) -> Result<Self, RouterError> {
        if !pattern.starts_with('/') {
            return Err(RouterError::InvalidPathPattern(pattern.to_string()));
        }

        if pattern.ends_with('/') {
            Ok(Self::Subtree(pattern.to_string()))
        } else {
            Ok(Self::Exact(pattern.to_string()))
        }
    }

    /// The pattern as configured.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(p) | Self::Subtree(p) => p,
        }
    }

    pub fn is_subtree(&self) -> bool {
        matches!(self, Self::Subtree(_))
    }

    /// Returns true if `path` is covered by this pattern.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(p) => path == p,
            Self::Subtree(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
