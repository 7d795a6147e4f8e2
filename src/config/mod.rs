//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (listener, deadlines, cache, observability)
//!
//! environment (ADDRESS, TOKEN, PAGES_ADDRESS, DISABLE_SIGN)
//!   layered over the file's [backend] section
//!     → loader.rs load_proxy_config (pure)
//!     → cache.rs ConfigCache (snapshot + checked_at, TTL)
//!     → Arc<ProxyConfig> per request
//!
//! On file change:
//!     watcher.rs detects change → ConfigCache::invalidate
//! ```

pub mod cache;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use cache::ConfigCache;
pub use loader::{load_config, load_proxy_config, ConfigError, ConfigSource};
pub use schema::{
    BackendDefaults, CacheConfig, ListenerConfig, ObservabilityConfig, ProxyConfig, ServerConfig,
    TimeoutConfig, TlsConfig,
};
