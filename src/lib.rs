//! Signed-URL download proxy library.

pub mod admin;
pub mod backend;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod relay;
pub mod resilience;
pub mod security;
pub mod signature;

pub use config::schema::{ProxyConfig, ServerConfig};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use signature::Signer;
