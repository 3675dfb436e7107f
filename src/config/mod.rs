//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → seed records loaded into the store
//!
//! With --watch:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → seed sent to the service
//!     → store contents replaced → router reload
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only the seed is hot-reloadable
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::ReloadConfig;
pub use schema::SeedConfig;
pub use schema::ServiceConfig;
pub use schema::TimeoutConfig;
