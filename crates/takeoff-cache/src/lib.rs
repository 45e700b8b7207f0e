//! Takeoff Cache -- two-tier result caching keyed by content fingerprint.
//!
//! The memory tier is a byte-bounded LRU map; the disk tier is a filesystem
//! directory of self-describing entries with its own larger budget. Repeated
//! requests for the same (content, option-set) fingerprint are served from
//! the cache, and concurrent requests for an absent fingerprint are
//! de-duplicated so the expensive computation runs at most once.

mod disk;
mod memory;
mod singleflight;

pub mod cache;

pub use cache::{CacheMetrics, CacheOptions, ComputeError, ResultCache};

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Error type for cache operations.
///
/// Disk tier failures are degraded to memory-only operation by
/// [`ResultCache`] and never surface on the request path; this type mostly
/// appears in logs and in the disk tier's internal plumbing.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("cache entry corrupt: {0}")]
    Corrupt(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
