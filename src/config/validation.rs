//! Configuration validation.
//!
//! Validation is a pure function returning every problem at once, not just the
//! first one. Server settings and environment keys are checked separately.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ServerConfig;

/// Environment keys that must be present for the proxy to serve downloads.
pub const REQUIRED_KEYS: [&str; 2] = ["ADDRESS", "TOKEN"];

/// A single semantic problem with the server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check value ranges and formats in the server configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address",
            message: format!("'{}' is not a socket address", config.listener.bind_address),
        });
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() || tls.key_path.trim().is_empty() {
            errors.push(ValidationError {
                field: "listener.tls",
                message: "cert_path and key_path must both be set".to_string(),
            });
        }
    }

    let timeouts = [
        ("timeouts.resolve_secs", config.timeouts.resolve_secs),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("cache.config_ttl_secs", config.cache.config_ttl_secs),
        ("cache.maintenance_interval_secs", config.cache.maintenance_interval_secs),
    ];
    for (field, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError {
                field,
                message: "must be greater than zero".to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Required environment keys that are absent, blank, or still the
/// `YOUR_<KEY>` placeholder.
pub fn missing_required(vars: &HashMap<String, String>) -> Vec<String> {
    REQUIRED_KEYS
        .iter()
        .filter(|key| match vars.get(**key) {
            None => true,
            Some(value) => {
                let value = value.trim();
                value.is_empty() || value == format!("YOUR_{}", key)
            }
        })
        .map(|key| key.to_string())
        .collect()
}
