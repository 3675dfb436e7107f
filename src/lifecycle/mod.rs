//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (service.rs):
//!     Seed store → Build generation 1 → Bind listeners → Spawn servers
//!     → Spawn scheduled reload
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Servers drain → Tasks joined
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: an unbuildable seed or a busy address aborts startup
//! - Listeners bind before any task spawns, so a returned service is
//!   already accepting
//! - Shutdown has timeout: tasks still running after the deadline are
//!   abandoned

pub mod service;
pub mod shutdown;
pub mod signals;

pub use service::{RunningService, Service, ServiceError};
pub use shutdown::Shutdown;
pub use signals::wait_for_shutdown_signal;
