//! In-memory TTL-aware response cache: LRU + memory-bound eviction,
//! negative caching, and a periodic expiry sweep.

pub mod engine;
pub mod entry;
pub mod key;
pub mod stats;

pub use engine::{CacheConfig, CacheEngine, CacheStatsSnapshot, CachedResponse};
pub use entry::{CacheEntry, EntryKind};
pub use key::CacheKey;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

/// Spawns the long-lived sweep loop described in spec.md §4.2: wake every
/// `interval`, remove expired entries in one critical section, sleep again.
/// The one suspension point is the sleep, so shutdown can cancel it promptly.
pub fn spawn_sweep_task(cache: Arc<CacheEngine>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            ticker.tick().await;
            let removed = cache.sweep_expired().await;
            if removed > 0 {
                info!(removed, "periodic cache sweep");
            }
        }
    })
}
