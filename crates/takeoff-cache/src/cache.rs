//! The public cache facade: a two-tier store with single-flight fills.
//!
//! Lookups check the memory tier first, then the disk tier, promoting disk
//! hits into memory. Disk failures degrade to memory-only behavior with a
//! warning; they never fail a request. All stored values are opaque
//! serialized bytes keyed by [`Fingerprint`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};

use takeoff_core::Fingerprint;

use crate::disk::DiskTier;
use crate::memory::MemoryTier;
use crate::singleflight::{FlightGroup, Join};

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// CacheOptions
// ---------------------------------------------------------------------------

/// Construction-time cache settings.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// When false the cache stores nothing and every lookup misses.
    pub enabled: bool,
    pub memory_budget_bytes: u64,
    pub disk_budget_bytes: u64,
    /// Directory for the disk tier. `None` disables the disk tier.
    pub dir: Option<PathBuf>,
    /// Optional entry lifetime. `None` means entries never expire.
    pub ttl: Option<Duration>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            memory_budget_bytes: 100 * 1024 * 1024,
            disk_budget_bytes: 500 * 1024 * 1024,
            dir: None,
            ttl: None,
        }
    }
}

// ---------------------------------------------------------------------------
// CacheMetrics
// ---------------------------------------------------------------------------

/// Point-in-time counters, readable without blocking writers for long.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub memory_entries: usize,
    pub memory_bytes_used: u64,
    pub disk_bytes_used: u64,
}

impl CacheMetrics {
    /// Hit ratio in `[0.0, 1.0]`; zero when no lookups have happened.
    #[must_use]
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// ---------------------------------------------------------------------------
// ComputeError
// ---------------------------------------------------------------------------

/// Error from [`ResultCache::get_or_compute`].
#[derive(Debug, thiserror::Error)]
pub enum ComputeError<E: std::error::Error> {
    /// This caller ran the computation and it failed.
    #[error(transparent)]
    Compute(E),

    /// Another caller ran the computation for the same key and it failed;
    /// only the failure message is shareable across threads.
    #[error("concurrent computation failed: {0}")]
    Shared(String),
}

// ---------------------------------------------------------------------------
// ResultCache
// ---------------------------------------------------------------------------

/// Two-tier result cache with single-flight computation de-duplication.
///
/// Thread-safe; share it behind an `Arc`. Tier locks are scoped so disk I/O
/// never happens while the memory tier is locked.
pub struct ResultCache {
    enabled: bool,
    ttl: Option<Duration>,
    memory: Mutex<MemoryTier>,
    disk: Option<Mutex<DiskTier>>,
    flights: FlightGroup,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ResultCache {
    /// Builds a cache from options. An unusable disk directory degrades the
    /// cache to memory-only with a warning instead of failing construction.
    #[must_use]
    pub fn new(options: CacheOptions) -> Self {
        let disk = match (&options.dir, options.enabled) {
            (Some(dir), true) => {
                match DiskTier::open(dir.clone(), options.disk_budget_bytes) {
                    Ok(tier) => Some(Mutex::new(tier)),
                    Err(e) => {
                        warn!(dir = %dir.display(), error = %e,
                              "disk cache tier unavailable; continuing memory-only");
                        None
                    }
                }
            }
            _ => None,
        };

        Self {
            enabled: options.enabled,
            ttl: options.ttl,
            memory: Mutex::new(MemoryTier::new(options.memory_budget_bytes)),
            disk,
            flights: FlightGroup::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Looks up a fingerprint across both tiers, promoting a disk hit into
    /// memory. Never blocks on an in-flight computation.
    pub fn get(&self, key: &Fingerprint) -> Option<Arc<Vec<u8>>> {
        if !self.enabled {
            return None;
        }
        match self.lookup(key.as_str()) {
            Some(data) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "cache hit");
                Some(data)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "cache miss");
                None
            }
        }
    }

    /// Stores a value in both tiers.
    pub fn put(&self, key: &Fingerprint, value: Vec<u8>) {
        if !self.enabled {
            return;
        }
        self.store(key.as_str(), Arc::new(value));
    }

    /// Returns the cached value for `key`, or runs `compute` to produce it.
    ///
    /// Concurrent callers for the same absent key are de-duplicated: one
    /// runs `compute`, the rest block and share its outcome. A successful
    /// computation is stored before followers are released, so they observe
    /// the cached value. A failed computation caches nothing.
    ///
    /// # Errors
    ///
    /// [`ComputeError::Compute`] when this caller's `compute` failed;
    /// [`ComputeError::Shared`] when another caller's did.
    pub fn get_or_compute<F, E>(
        &self,
        key: &Fingerprint,
        compute: F,
    ) -> Result<Arc<Vec<u8>>, ComputeError<E>>
    where
        F: FnOnce() -> Result<Vec<u8>, E>,
        E: std::error::Error,
    {
        if !self.enabled {
            return compute().map(Arc::new).map_err(ComputeError::Compute);
        }

        if let Some(data) = self.get(key) {
            return Ok(data);
        }

        match self.flights.join(key.as_str()) {
            Join::Leader(guard) => {
                // Another leader may have filled the key between our miss
                // and winning the flight.
                if let Some(data) = self.lookup(key.as_str()) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    guard.complete(Ok(Arc::clone(&data)));
                    return Ok(data);
                }

                match compute() {
                    Ok(value) => {
                        let data = Arc::new(value);
                        self.store(key.as_str(), Arc::clone(&data));
                        guard.complete(Ok(Arc::clone(&data)));
                        Ok(data)
                    }
                    Err(e) => {
                        debug!(key = %key, error = %e, "computation failed; nothing cached");
                        guard.complete(Err(e.to_string()));
                        Err(ComputeError::Compute(e))
                    }
                }
            }
            Join::Follower(outcome) => {
                match outcome {
                    Ok(data) => {
                        self.hits.fetch_add(1, Ordering::Relaxed);
                        debug!(key = %key, "joined in-flight computation");
                        Ok(data)
                    }
                    Err(message) => Err(ComputeError::Shared(message)),
                }
            }
        }
    }

    /// Drops every entry from both tiers.
    pub fn clear(&self) {
        lock_unpoisoned(&self.memory).clear();
        if let Some(disk) = &self.disk {
            if let Err(e) = lock_unpoisoned(disk).clear() {
                warn!(error = %e, "failed to clear disk cache tier");
            }
        }
        debug!("cache cleared");
    }

    /// Snapshot of the cache counters and tier sizes.
    pub fn metrics(&self) -> CacheMetrics {
        let (memory_entries, memory_bytes_used) = {
            let memory = lock_unpoisoned(&self.memory);
            (memory.len(), memory.bytes_used())
        };
        let disk_bytes_used = match &self.disk {
            Some(disk) => lock_unpoisoned(disk).bytes_used().unwrap_or(0),
            None => 0,
        };
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            memory_entries,
            memory_bytes_used,
            disk_bytes_used,
        }
    }

    fn lookup(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        if let Some(data) = lock_unpoisoned(&self.memory).get(key, self.ttl) {
            return Some(data);
        }

        let disk = self.disk.as_ref()?;
        let read = lock_unpoisoned(disk).read(key, self.ttl);
        match read {
            Ok(Some(payload)) => {
                let data = Arc::new(payload);
                let evicted = lock_unpoisoned(&self.memory).insert(key, Arc::clone(&data));
                self.evictions.fetch_add(evicted, Ordering::Relaxed);
                debug!(key, "promoted disk entry into memory");
                Some(data)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "disk cache read failed; treating as miss");
                None
            }
        }
    }

    fn store(&self, key: &str, data: Arc<Vec<u8>>) {
        let evicted = lock_unpoisoned(&self.memory).insert(key, Arc::clone(&data));
        self.evictions.fetch_add(evicted, Ordering::Relaxed);

        if let Some(disk) = &self.disk {
            if let Err(e) = lock_unpoisoned(disk).write(key, &data) {
                warn!(key, error = %e, "disk cache write failed; entry is memory-only");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::io;

    fn fingerprint(tag: &str) -> Fingerprint {
        Fingerprint::compute(
            tag.as_bytes(),
            &[takeoff_core::Industry::Plumbing],
            &[takeoff_core::Region::Australia],
            takeoff_core::AnalysisMode::Balanced,
        )
    }

    fn memory_only() -> ResultCache {
        ResultCache::new(CacheOptions {
            dir: None,
            ..CacheOptions::default()
        })
    }

    #[test]
    fn put_then_get() {
        let cache = memory_only();
        let key = fingerprint("a");
        cache.put(&key, vec![1, 2, 3]);
        assert_eq!(cache.get(&key).as_deref(), Some(&vec![1, 2, 3]));
    }

    #[test]
    fn miss_on_absent_key() {
        let cache = memory_only();
        assert!(cache.get(&fingerprint("absent")).is_none());
        assert_eq!(cache.metrics().misses, 1);
    }

    #[test]
    fn get_or_compute_fills_on_miss() {
        let cache = memory_only();
        let key = fingerprint("a");
        let data = cache
            .get_or_compute(&key, || Ok::<_, Infallible>(vec![7, 8]))
            .unwrap();
        assert_eq!(*data, vec![7, 8]);
        // The second call hits without recomputing.
        let again = cache
            .get_or_compute(&key, || -> Result<Vec<u8>, Infallible> {
                panic!("must not recompute a cached key")
            })
            .unwrap();
        assert_eq!(*again, vec![7, 8]);
    }

    #[test]
    fn failed_compute_caches_nothing() {
        let cache = memory_only();
        let key = fingerprint("a");
        let err = cache
            .get_or_compute(&key, || {
                Err::<Vec<u8>, _>(io::Error::new(io::ErrorKind::Other, "boom"))
            })
            .unwrap_err();
        assert!(matches!(err, ComputeError::Compute(_)));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn disabled_cache_always_computes() {
        let cache = ResultCache::new(CacheOptions {
            enabled: false,
            ..CacheOptions::default()
        });
        let key = fingerprint("a");
        cache.put(&key, vec![1]);
        assert!(cache.get(&key).is_none());

        let mut runs = 0;
        for _ in 0..2 {
            cache
                .get_or_compute(&key, || {
                    runs += 1;
                    Ok::<_, Infallible>(vec![9])
                })
                .unwrap();
        }
        assert_eq!(runs, 2);
    }

    #[test]
    fn disk_tier_survives_memory_eviction() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(CacheOptions {
            memory_budget_bytes: 200,
            disk_budget_bytes: 10_000,
            dir: Some(tmp.path().join("cache")),
            ..CacheOptions::default()
        });

        let a = fingerprint("a");
        let b = fingerprint("b");
        let c = fingerprint("c");
        cache.put(&a, vec![0; 80]);
        cache.put(&b, vec![0; 80]);
        cache.put(&c, vec![0; 80]);

        // `a` was evicted from memory but promotes back from disk.
        assert!(cache.get(&a).is_some());
        assert!(cache.metrics().evictions >= 1);
    }

    #[test]
    fn unusable_disk_dir_degrades_to_memory_only() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocked");
        std::fs::write(&blocker, b"file").unwrap();

        let cache = ResultCache::new(CacheOptions {
            dir: Some(blocker),
            ..CacheOptions::default()
        });
        let key = fingerprint("a");
        cache.put(&key, vec![1]);
        assert!(cache.get(&key).is_some());
        assert_eq!(cache.metrics().disk_bytes_used, 0);
    }

    #[test]
    fn clear_empties_both_tiers() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(CacheOptions {
            dir: Some(tmp.path().join("cache")),
            ..CacheOptions::default()
        });
        let key = fingerprint("a");
        cache.put(&key, vec![1, 2]);
        cache.clear();

        assert!(cache.get(&key).is_none());
        let metrics = cache.metrics();
        assert_eq!(metrics.memory_bytes_used, 0);
        assert_eq!(metrics.disk_bytes_used, 0);
    }

    #[test]
    fn metrics_track_hits_and_misses() {
        let cache = memory_only();
        let key = fingerprint("a");
        cache.get(&key);
        cache.put(&key, vec![1]);
        cache.get(&key);
        cache.get(&key);

        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 2);
        assert_eq!(metrics.misses, 1);
        assert!((metrics.hit_ratio() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn hit_ratio_zero_when_untouched() {
        let cache = memory_only();
        assert_eq!(cache.metrics().hit_ratio(), 0.0);
    }
}
