//! TTL response cache for GET-class API calls
//!
//! Provides a thread-safe, TTL-based cache for backend responses, keyed by
//! `"<METHOD> <endpoint>"`. Entries expire after a fixed TTL and are evicted
//! lazily on read. Invalidation is coarse-grained: every key containing a
//! given substring is dropped, so a mutation under `/api/admin` can sweep
//! all admin reads in one call.
//!
//! The cache carries an epoch counter bumped by every invalidation. A
//! request snapshots the epoch before it suspends and completes its write
//! through [`ResponseCache::insert_if_current`]; a clear that lands while
//! the request is in flight advances the epoch and the stale write is
//! discarded instead of silently re-populating invalidated data.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

/// Thread-safe response cache with TTL expiry and substring invalidation
pub struct ResponseCache {
    /// Cache entries keyed by `"<METHOD> <endpoint>"`
    entries: DashMap<String, CachedResponse>,
    /// Time-to-live applied to every entry
    ttl: Duration,
    /// Invalidation epoch; writes from before the latest invalidation lose
    epoch: AtomicU64,
    /// Cache statistics
    stats: CacheStats,
}

/// A cached response with its creation time
struct CachedResponse {
    /// The cached JSON value
    value: Value,
    /// When this entry was cached
    cached_at: Instant,
}

impl CachedResponse {
    /// Check if this entry has outlived `ttl`
    fn is_expired(&self, ttl: Duration) -> bool {
        Instant::now().duration_since(self.cached_at) > ttl
    }
}

/// Cache statistics tracked atomically
#[derive(Debug)]
pub struct CacheStats {
    /// Total cache hits (entries served from cache)
    pub hits: AtomicU64,
    /// Total cache misses (entries not found or expired)
    pub misses: AtomicU64,
    /// Total evictions (expired or invalidated entries removed)
    pub evictions: AtomicU64,
}

impl CacheStats {
    fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Get current cache hit count
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get current cache miss count
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get current eviction count
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Calculate hit rate as a fraction (0.0-1.0)
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

impl ResponseCache {
    /// Create a new empty cache whose entries live for `ttl`
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            epoch: AtomicU64::new(0),
            stats: CacheStats::new(),
        }
    }

    /// Build a cache key from an HTTP method and endpoint path
    #[must_use]
    pub fn build_key(method: &str, endpoint: &str) -> String {
        format!("{method} {endpoint}")
    }

    /// Get a cached response if it exists and hasn't expired
    ///
    /// Returns `None` if the key doesn't exist or the entry has expired.
    /// Expired entries are evicted on the spot.
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired(self.ttl) {
                // Entry expired - evict it
                drop(entry);
                self.entries.remove(key);
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            } else {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Current invalidation epoch
    ///
    /// Snapshot this before starting a request whose response will be
    /// cached, and pass it back to [`Self::insert_if_current`].
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Store `value` under `key`, overwriting any prior entry
    pub fn insert(&self, key: &str, value: Value) {
        self.entries.insert(
            key.to_string(),
            CachedResponse {
                value,
                cached_at: Instant::now(),
            },
        );
    }

    /// Store `value` under `key` only if no invalidation happened since
    /// `epoch` was snapshotted
    ///
    /// Returns `true` when the write was applied. A `false` return means an
    /// invalidation or clear raced the in-flight request; the stale result
    /// must not re-populate the cache.
    pub fn insert_if_current(&self, key: &str, value: Value, epoch: u64) -> bool {
        if self.epoch.load(Ordering::Acquire) == epoch {
            self.insert(key, value);
            true
        } else {
            debug!(key, "Discarding cache write from a stale epoch");
            false
        }
    }

    /// Remove every entry whose key contains `pattern`, returning the count
    ///
    /// This is the coarse-grained invalidation used after mutations, e.g.
    /// `invalidate("/api/admin")` after a write to an admin resource.
    pub fn invalidate(&self, pattern: &str) -> usize {
        let matching: Vec<String> = self
            .entries
            .iter()
            .filter_map(|entry| entry.key().contains(pattern).then(|| entry.key().clone()))
            .collect();

        let count = matching.len();
        for key in matching {
            self.entries.remove(&key);
        }

        self.epoch.fetch_add(1, Ordering::AcqRel);
        if count > 0 {
            self.stats
                .evictions
                .fetch_add(count as u64, Ordering::Relaxed);
            debug!(pattern, count, "Invalidated cache entries");
        }
        count
    }

    /// Clear all cached entries unconditionally
    pub fn clear(&self) {
        let count = self.entries.len();
        self.entries.clear();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if count > 0 {
            self.stats
                .evictions
                .fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits(),
            misses: self.stats.misses(),
            evictions: self.stats.evictions(),
            size: self.entries.len(),
            hit_rate: self.stats.hit_rate(),
        }
    }
}

/// Snapshot of cache statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStatsSnapshot {
    /// Total cache hits
    pub hits: u64,
    /// Total cache misses
    pub misses: u64,
    /// Total evictions
    pub evictions: u64,
    /// Current number of entries
    pub size: usize,
    /// Hit rate (0.0-1.0)
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache() -> ResponseCache {
        ResponseCache::new(Duration::from_secs(60))
    }

    #[test]
    fn test_cache_hit() {
        let cache = cache();
        let value = json!({"jobs": [{"id": "job-1"}]});

        cache.insert("GET /api/jobs", value.clone());
        let retrieved = cache.get("GET /api/jobs");

        assert_eq!(retrieved, Some(value));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn test_cache_miss() {
        let cache = cache();
        let retrieved = cache.get("GET /api/nonexistent");

        assert_eq!(retrieved, None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_cache_expiry() {
        let cache = ResponseCache::new(Duration::from_millis(1));
        cache.insert("GET /api/jobs", json!({"result": "expired"}));

        std::thread::sleep(Duration::from_millis(5));

        // Should be expired and evicted
        assert_eq!(cache.get("GET /api/jobs"), None);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_build_key() {
        assert_eq!(
            ResponseCache::build_key("GET", "/api/jobs?location=Ashanti"),
            "GET /api/jobs?location=Ashanti"
        );
        // Same endpoint, different methods must not collide
        assert_ne!(
            ResponseCache::build_key("GET", "/api/jobs"),
            ResponseCache::build_key("DELETE", "/api/jobs")
        );
    }

    #[test]
    fn test_overwrite_supersedes_prior_entry() {
        let cache = cache();
        cache.insert("GET /api/jobs", json!({"page": 1}));
        cache.insert("GET /api/jobs", json!({"page": 2}));
        assert_eq!(cache.get("GET /api/jobs"), Some(json!({"page": 2})));
    }

    #[test]
    fn test_invalidate_substring_leaves_unrelated_entries() {
        let cache = cache();
        cache.insert("GET /api/admin/users", json!(1));
        cache.insert("GET /api/admin/stats", json!(2));
        cache.insert("GET /api/jobs", json!(3));

        let removed = cache.invalidate("/api/admin");

        assert_eq!(removed, 2);
        assert_eq!(cache.get("GET /api/admin/users"), None);
        assert_eq!(cache.get("GET /api/admin/stats"), None);
        assert_eq!(cache.get("GET /api/jobs"), Some(json!(3)));
    }

    #[test]
    fn test_clear_removes_everything() {
        let cache = cache();
        cache.insert("GET /api/jobs", json!(1));
        cache.insert("GET /api/profiles/me", json!(2));

        cache.clear();

        assert_eq!(cache.stats().size, 0);
        assert_eq!(cache.get("GET /api/jobs"), None);
    }

    #[test]
    fn test_invalidate_bumps_epoch() {
        let cache = cache();
        let before = cache.epoch();
        cache.invalidate("/api/jobs");
        assert!(cache.epoch() > before);
    }

    #[test]
    fn test_clear_bumps_epoch_even_when_empty() {
        let cache = cache();
        let before = cache.epoch();
        cache.clear();
        assert!(cache.epoch() > before);
    }

    #[test]
    fn test_insert_if_current_applies_on_matching_epoch() {
        let cache = cache();
        let epoch = cache.epoch();
        assert!(cache.insert_if_current("GET /api/jobs", json!(1), epoch));
        assert_eq!(cache.get("GET /api/jobs"), Some(json!(1)));
    }

    #[test]
    fn test_insert_if_current_discards_stale_write() {
        // GIVEN: an epoch snapshot taken before a clear
        // WHEN: the write from that epoch arrives late
        // THEN: it is discarded — invalidated data must not reappear
        let cache = cache();
        let epoch = cache.epoch();
        cache.clear();
        assert!(!cache.insert_if_current("GET /api/jobs", json!(1), epoch));
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_hit_rate() {
        let cache = cache();
        cache.insert("GET /api/jobs", json!(1));
        cache.insert("GET /api/profiles/me", json!(2));

        cache.get("GET /api/jobs");
        cache.get("GET /api/profiles/me");
        cache.get("GET /api/missing");

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_invalidation_counts_as_evictions() {
        let cache = cache();
        cache.insert("GET /api/admin/users", json!(1));
        cache.invalidate("/api/admin");
        assert_eq!(cache.stats().evictions, 1);
    }
}
