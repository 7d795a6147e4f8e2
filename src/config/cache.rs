//! Time-bounded cache of the [`ProxyConfig`] snapshot.
//!
//! The snapshot is rebuilt from its [`ConfigSource`] when it is older than the
//! configured TTL or after [`ConfigCache::invalidate`]. Rebuilding is a pure
//! function of the source, so two requests racing to refresh simply store
//! equal snapshots; no lock is taken on the read path.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;

use crate::config::loader::{load_proxy_config, ConfigError, ConfigSource};
use crate::config::schema::ProxyConfig;
use crate::lifecycle::maintenance::Purgeable;

#[derive(Debug)]
struct Snapshot {
    config: Arc<ProxyConfig>,
    checked_at: Instant,
}

/// Lazily refreshed configuration snapshot owned by the dispatcher.
#[derive(Debug)]
pub struct ConfigCache {
    source: ConfigSource,
    ttl: Duration,
    slot: ArcSwapOption<Snapshot>,
}

impl ConfigCache {
    pub fn new(source: ConfigSource, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            slot: ArcSwapOption::empty(),
        }
    }

    /// Current snapshot, refreshing it first if it has expired.
    ///
    /// Failures are not cached: a broken environment is re-checked on the
    /// next call.
    pub fn get(&self) -> Result<Arc<ProxyConfig>, ConfigError> {
        if let Some(snapshot) = self.slot.load().as_ref() {
            if snapshot.checked_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&snapshot.config));
            }
        }

        match self.source.snapshot().and_then(|vars| load_proxy_config(&vars)) {
            Ok(config) => {
                let config = Arc::new(config);
                self.slot.store(Some(Arc::new(Snapshot {
                    config: Arc::clone(&config),
                    checked_at: Instant::now(),
                })));
                tracing::debug!(
                    backend = %config.backend_address,
                    signature_disabled = config.signature_disabled,
                    "Configuration snapshot refreshed"
                );
                Ok(config)
            }
            Err(e) => {
                self.slot.store(None);
                tracing::error!(error = %e, "Configuration check failed");
                Err(e)
            }
        }
    }

    /// Drop the snapshot so the next [`get`](Self::get) reloads it.
    /// Returns whether a snapshot was held.
    pub fn invalidate(&self) -> bool {
        self.slot.swap(None).is_some()
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }
}

impl Purgeable for ConfigCache {
    fn name(&self) -> &'static str {
        "config_snapshot"
    }

    fn purge(&self) -> usize {
        usize::from(self.invalidate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(token: &str) -> ConfigSource {
        let mut vars = HashMap::new();
        vars.insert("ADDRESS".to_string(), "https://files.example.com".to_string());
        vars.insert("TOKEN".to_string(), token.to_string());
        ConfigSource::Fixed(vars)
    }

    #[test]
    fn reuses_snapshot_within_ttl() {
        let cache = ConfigCache::new(source("a"), Duration::from_secs(60));
        let first = cache.get().unwrap();
        let second = cache.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn refreshes_after_ttl() {
        let cache = ConfigCache::new(source("a"), Duration::ZERO);
        let first = cache.get().unwrap();
        let second = cache.get().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[test]
    fn invalidate_forces_reload() {
        let cache = ConfigCache::new(source("a"), Duration::from_secs(60));
        let first = cache.get().unwrap();
        assert_eq!(cache.purge(), 1);
        assert_eq!(cache.purge(), 0);
        let second = cache.get().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = ConfigCache::new(source(""), Duration::from_secs(60));
        assert!(matches!(cache.get(), Err(ConfigError::Missing(_))));
        assert!(!cache.invalidate());
    }
}
