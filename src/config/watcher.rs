//! Configuration file watcher for hot reload.
//!
//! Changes to the TOML file invalidate the [`ConfigCache`]; the next request
//! rebuilds the snapshot from the new `[backend]` section.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::cache::ConfigCache;
use crate::config::loader::load_config;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    cache: Arc<ConfigCache>,
}

impl ConfigWatcher {
    pub fn new(path: &Path, cache: Arc<ConfigCache>) -> Self {
        Self {
            path: path.to_path_buf(),
            cache,
        }
    }

    /// Start watching the file. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let cache = Arc::clone(&self.cache);
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        match load_config(&path) {
                            Ok(_) => {
                                cache.invalidate();
                                tracing::info!("Config file change detected, snapshot invalidated");
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Changed config file is invalid, keeping current snapshot");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
