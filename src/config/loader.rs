//! Configuration loading from disk and from the environment.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use url::Url;

use crate::config::schema::{ProxyConfig, ServerConfig};
use crate::config::validation::{missing_required, validate_config, ValidationError};

/// Environment keys that make up a [`ProxyConfig`].
pub const ENV_KEYS: [&str; 4] = ["ADDRESS", "TOKEN", "PAGES_ADDRESS", "DISABLE_SIGN"];

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("{key} is not a valid URL: {source}")]
    InvalidUrl {
        key: &'static str,
        #[source]
        source: url::ParseError,
    },
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate server configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ServerConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build a [`ProxyConfig`] from key/value pairs.
///
/// Pure: the same input always yields the same snapshot, so concurrent
/// refreshes of the cache are harmless.
pub fn load_proxy_config(vars: &HashMap<String, String>) -> Result<ProxyConfig, ConfigError> {
    let missing = missing_required(vars);
    if !missing.is_empty() {
        return Err(ConfigError::Missing(missing));
    }

    let backend_address = parse_url("ADDRESS", &vars["ADDRESS"])?;
    let shared_secret = vars["TOKEN"].trim().to_string();

    let pages_address = match vars.get("PAGES_ADDRESS").map(|v| v.trim()) {
        None | Some("") | Some("YOUR_PAGES_ADDRESS") => None,
        Some(raw) => Some(parse_url("PAGES_ADDRESS", raw)?),
    };

    let signature_disabled = vars
        .get("DISABLE_SIGN")
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    Ok(ProxyConfig {
        backend_address,
        shared_secret,
        pages_address,
        signature_disabled,
    })
}

fn parse_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim().trim_end_matches('/')).map_err(|source| ConfigError::InvalidUrl { key, source })
}

/// Where the backend keys come from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Process environment layered over the `[backend]` section of an
    /// optional TOML file.
    Process { file: Option<PathBuf> },
    /// Fixed key/value pairs.
    Fixed(HashMap<String, String>),
}

impl ConfigSource {
    /// Collect the current key/value pairs for [`load_proxy_config`].
    pub fn snapshot(&self) -> Result<HashMap<String, String>, ConfigError> {
        match self {
            ConfigSource::Fixed(vars) => Ok(vars.clone()),
            ConfigSource::Process { file } => {
                let mut vars = HashMap::new();

                if let Some(path) = file {
                    let defaults = load_config(path)?.backend;
                    let entries = [
                        ("ADDRESS", defaults.address),
                        ("TOKEN", defaults.token),
                        ("PAGES_ADDRESS", defaults.pages_address),
                        ("DISABLE_SIGN", defaults.disable_sign.map(|b| b.to_string())),
                    ];
                    for (key, value) in entries {
                        if let Some(value) = value {
                            vars.insert(key.to_string(), value);
                        }
                    }
                }

                for key in ENV_KEYS {
                    if let Ok(value) = std::env::var(key) {
                        vars.insert(key.to_string(), value);
                    }
                }

                Ok(vars)
            }
        }
    }

    /// The TOML file backing this source, if any.
    pub fn file(&self) -> Option<&Path> {
        match self {
            ConfigSource::Process { file } => file.as_deref(),
            ConfigSource::Fixed(_) => None,
        }
    }
}
