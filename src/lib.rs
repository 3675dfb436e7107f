//! Dynamic HTTP router library.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod store;
pub mod upstream;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::{RunningService, Service, Shutdown};
pub use routing::{Router, RouterError};
pub use store::{ConfigStore, InMemoryStore};
