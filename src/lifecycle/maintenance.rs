//! Periodic cache maintenance.
//!
//! Caches the process owns register here explicitly; a background task purges
//! each of them on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

/// A cache that can drop stale entries on demand.
pub trait Purgeable: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Drop stale entries, returning how many were removed.
    fn purge(&self) -> usize;
}

/// Registry of cache handles owned by the process.
#[derive(Default, Clone)]
pub struct CacheRegistry {
    caches: Vec<Arc<dyn Purgeable>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, cache: Arc<dyn Purgeable>) {
        self.caches.push(cache);
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    /// Purge every registered cache once. Returns the total entries removed.
    pub fn purge_all(&self) -> usize {
        self.caches
            .iter()
            .map(|cache| {
                let removed = cache.purge();
                if removed > 0 {
                    tracing::info!(cache = cache.name(), removed, "Cache purged");
                }
                removed
            })
            .sum()
    }

    /// Purge on every tick of `interval` until shutdown.
    pub async fn run(self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            caches = self.caches.len(),
            interval_secs = interval.as_secs(),
            "Cache maintenance starting"
        );

        let mut ticker = time::interval(interval);
        // The first tick completes immediately; nothing is stale at startup.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.purge_all();
                    tracing::debug!(removed, "Cache maintenance pass complete");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cache maintenance received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
    }

    impl Purgeable for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn purge(&self) -> usize {
            self.calls.fetch_add(1, Ordering::SeqCst) + 1
        }
    }

    #[test]
    fn purges_every_registered_cache() {
        let a = Arc::new(Counting { calls: AtomicUsize::new(0) });
        let b = Arc::new(Counting { calls: AtomicUsize::new(0) });

        let mut registry = CacheRegistry::new();
        registry.register(a.clone());
        registry.register(b.clone());

        assert_eq!(registry.purge_all(), 2);
        assert_eq!(registry.purge_all(), 4);
        assert_eq!(a.calls.load(Ordering::SeqCst), 2);
        assert_eq!(b.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let (tx, rx) = broadcast::channel(1);
        let task = tokio::spawn(CacheRegistry::new().run(Duration::from_secs(3600), rx));
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("maintenance loop should exit")
            .unwrap();
    }
}
