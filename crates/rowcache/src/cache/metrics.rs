//! Cache metrics for monitoring cache behavior.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for cache activity.
///
/// All counters are process-local; the shared store keeps no statistics.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Reads served from the cache.
    hits: AtomicU64,
    /// Admitted reads that had to execute.
    misses: AtomicU64,
    /// Statements that were not admitted.
    bypasses: AtomicU64,
    /// Entries written after a miss.
    stores: AtomicU64,
    /// Tag memberships restored on a hit.
    heals: AtomicU64,
    /// Entries removed by invalidation passes.
    invalidations: AtomicU64,
    /// Store operations that failed and were degraded.
    store_errors: AtomicU64,
}

impl CacheMetrics {
    /// Create a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cache hit.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a statement that bypassed the cache.
    pub fn record_bypass(&self) {
        self.bypasses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a stored entry.
    pub fn record_store(&self) {
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    /// Record restored tag memberships.
    pub fn record_heals(&self, count: usize) {
        self.heals.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record entries removed by invalidation.
    pub fn record_invalidations(&self, count: usize) {
        self.invalidations.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a degraded store failure.
    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the number of cache hits.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get the number of cache misses.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get the number of bypassed statements.
    #[must_use]
    pub fn bypasses(&self) -> u64 {
        self.bypasses.load(Ordering::Relaxed)
    }

    /// Get the number of stored entries.
    #[must_use]
    pub fn stores(&self) -> u64 {
        self.stores.load(Ordering::Relaxed)
    }

    /// Get the number of restored tag memberships.
    #[must_use]
    pub fn heals(&self) -> u64 {
        self.heals.load(Ordering::Relaxed)
    }

    /// Get the number of invalidated entries.
    #[must_use]
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    /// Get the number of degraded store failures.
    #[must_use]
    pub fn store_errors(&self) -> u64 {
        self.store_errors.load(Ordering::Relaxed)
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.bypasses,
            &self.stores,
            &self.heals,
            &self.invalidations,
            &self.store_errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Get a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            bypasses: self.bypasses(),
            stores: self.stores(),
            heals: self.heals(),
            invalidations: self.invalidations(),
            store_errors: self.store_errors(),
        }
    }
}

/// A point-in-time snapshot of cache metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Reads served from the cache.
    pub hits: u64,
    /// Admitted reads that had to execute.
    pub misses: u64,
    /// Statements that were not admitted.
    pub bypasses: u64,
    /// Entries written after a miss.
    pub stores: u64,
    /// Tag memberships restored on a hit.
    pub heals: u64,
    /// Entries removed by invalidation passes.
    pub invalidations: u64,
    /// Store operations that failed and were degraded.
    pub store_errors: u64,
}

impl MetricsSnapshot {
    /// Get the total number of lookups.
    #[must_use]
    pub fn total_lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Get the hit rate as a percentage.
    ///
    /// Returns `None` if there have been no lookups.
    #[must_use]
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.total_lookups();
        if total == 0 {
            None
        } else {
            Some((self.hits as f64 / total as f64) * 100.0)
        }
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hit_rate =
            self.hit_rate().map(|r| format!("{r:.1}%")).unwrap_or_else(|| "N/A".to_string());
        write!(
            f,
            "Cache Stats: hits={}, misses={}, hit_rate={}, bypasses={}, stores={}, heals={}, invalidations={}, store_errors={}",
            self.hits,
            self.misses,
            hit_rate,
            self.bypasses,
            self.stores,
            self.heals,
            self.invalidations,
            self.store_errors
        )
    }
}
