//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, dispatch handler)
//!     → request.rs (request ID, trace span)
//!     → routing::Router (pin table, resolve path)
//!     → redirect.rs (Location + status)  |  forward.rs (proxy to upstream)
//!     → response.rs (X-Router-Version, error bodies)
//!     → Send to client
//! ```

pub mod forward;
pub mod redirect;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{ForwardError, Forwarder};
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::X_ROUTER_VERSION;
pub use server::HttpServer;
