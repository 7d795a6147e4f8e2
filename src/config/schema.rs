//! Configuration schema definitions.
//!
//! Two layers live here:
//! - [`ServerConfig`] is the process configuration read from an optional TOML
//!   file (listener, deadlines, cache lifetimes, observability).
//! - [`ProxyConfig`] is the per-request snapshot derived from the environment
//!   (`ADDRESS`, `TOKEN`, `PAGES_ADDRESS`, `DISABLE_SIGN`).

use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration for the server process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Per-stage deadlines.
    pub timeouts: TimeoutConfig,

    /// Config snapshot and maintenance lifetimes.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// File-level defaults for the backend environment keys.
    pub backend: BackendDefaults,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Deadlines for the network stages of a download.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend link resolution deadline in seconds.
    pub resolve_secs: u64,

    /// Upstream fetch deadline (per hop, until response head) in seconds.
    pub upstream_secs: u64,

    /// Whole-request deadline applied by the HTTP layer, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            resolve_secs: 10,
            upstream_secs: 30,
            request_secs: 120,
        }
    }
}

/// Cache lifetimes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a [`ProxyConfig`] snapshot is trusted before re-validation.
    pub config_ttl_secs: u64,

    /// Interval between cache-maintenance passes.
    pub maintenance_interval_secs: u64,

    /// In-flight request traces older than this are dropped by maintenance.
    pub trace_max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            config_ttl_secs: 3 * 60 * 60,
            maintenance_interval_secs: 3 * 60 * 60,
            trace_max_age_secs: 600,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Defaults for the backend keys; the environment overrides each one.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BackendDefaults {
    pub address: Option<String>,
    pub token: Option<String>,
    pub pages_address: Option<String>,
    pub disable_sign: Option<bool>,
}

/// Validated snapshot of the backend-facing settings.
///
/// Produced by [`crate::config::loader::load_proxy_config`] and shared via
/// `Arc` through [`crate::config::ConfigCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Base URL of the file-storage backend.
    pub backend_address: Url,

    /// Shared secret: HMAC key for signatures and bearer credential for the backend.
    pub shared_secret: String,

    /// Public base URL of this proxy, used for self-loop detection.
    pub pages_address: Option<Url>,

    /// When set, signature verification is skipped entirely.
    pub signature_disabled: bool,
}

impl ProxyConfig {
    /// URL of the backend "resolve link" endpoint.
    pub fn link_endpoint(&self) -> String {
        format!("{}/api/fs/link", self.backend_address.as_str().trim_end_matches('/'))
    }
}
