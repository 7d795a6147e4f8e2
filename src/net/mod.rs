//! Network layer: optional TLS for the listener.
//!
//! Plain TCP listeners are bound directly with `tokio::net::TcpListener`;
//! TLS is terminated by `axum-server` with rustls.

pub mod tls;

pub use tls::load_tls_config;
