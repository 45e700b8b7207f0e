//! The in-memory cache tier: a byte-bounded map with LRU eviction.
//!
//! Recency is tracked with a logical access clock rather than wall-clock
//! timestamps, so two accesses in the same instant still have a total
//! order. The tier itself is not synchronized; [`crate::ResultCache`] wraps
//! it in a mutex scoped to this tier only.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// One cached entry. Immutable once written; replacement is whole-entry.
struct Entry {
    data: Arc<Vec<u8>>,
    created_at: SystemTime,
    last_access: u64,
    access_count: u64,
}

impl Entry {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn expired(&self, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => self
                .created_at
                .elapsed()
                .map(|age| age >= ttl)
                .unwrap_or(false),
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryTier
// ---------------------------------------------------------------------------

/// Byte-bounded LRU map of serialized results.
pub(crate) struct MemoryTier {
    entries: HashMap<String, Entry>,
    budget: u64,
    used: u64,
    clock: u64,
}

impl MemoryTier {
    pub(crate) fn new(budget: u64) -> Self {
        Self {
            entries: HashMap::new(),
            budget,
            used: 0,
            clock: 0,
        }
    }

    /// Looks up an entry, refreshing its recency on hit. Expired entries
    /// are dropped and reported as misses.
    pub(crate) fn get(&mut self, key: &str, ttl: Option<Duration>) -> Option<Arc<Vec<u8>>> {
        if self.entries.get(key).is_some_and(|e| e.expired(ttl)) {
            self.remove(key);
            return None;
        }
        self.clock += 1;
        let clock = self.clock;
        let entry = self.entries.get_mut(key)?;
        entry.last_access = clock;
        entry.access_count += 1;
        Some(Arc::clone(&entry.data))
    }

    /// Inserts or replaces an entry, evicting least-recently-used entries
    /// until the new entry fits within the byte budget.
    ///
    /// Entries larger than the whole budget are not admitted (the caller's
    /// disk tier still receives them). Returns the number of evictions.
    pub(crate) fn insert(&mut self, key: &str, data: Arc<Vec<u8>>) -> u64 {
        let size = data.len() as u64;

        // Whole-entry replacement: drop any previous entry first.
        self.remove(key);

        if size > self.budget {
            return 0;
        }

        let mut evicted = 0;
        while self.used + size > self.budget {
            let Some(victim) = self.least_recently_used() else {
                break;
            };
            self.remove(&victim);
            evicted += 1;
        }

        self.clock += 1;
        self.used += size;
        self.entries.insert(
            key.to_string(),
            Entry {
                data,
                created_at: SystemTime::now(),
                last_access: self.clock,
                access_count: 0,
            },
        );
        evicted
    }

    /// Removes an entry if present.
    pub(crate) fn remove(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            self.used -= entry.size();
        }
    }

    /// Drops all entries.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.used = 0;
    }

    pub(crate) fn bytes_used(&self) -> u64 {
        self.used
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn least_recently_used(&self) -> Option<String> {
        self.entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
