//! The on-disk cache tier: one self-describing file per fingerprint.
//!
//! Entry format: a JSON header line (fingerprint, creation time, payload
//! size) followed by the raw payload bytes, so an entry can be loaded
//! without any external schema lookup. Writes go to a temporary file in the
//! same directory and are published with an atomic rename, so a concurrent
//! reader sees either the old complete entry or the new complete entry,
//! never a partial write.
//!
//! Eviction is LRU by file modification time, approximating insertion
//! order; promoted entries are served from memory afterwards, so read
//! recency does not need to touch the file.

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::CacheError;

const ENTRY_SUFFIX: &str = ".entry";
const TMP_SUFFIX: &str = ".tmp";

// ---------------------------------------------------------------------------
// EntryHeader
// ---------------------------------------------------------------------------

/// Metadata line written ahead of each payload.
#[derive(Debug, Serialize, Deserialize)]
struct EntryHeader {
    fingerprint: String,
    /// Unix seconds at write time.
    created_at: u64,
    payload_size: u64,
}

// ---------------------------------------------------------------------------
// DiskTier
// ---------------------------------------------------------------------------

/// Filesystem-directory cache tier with its own byte budget.
pub(crate) struct DiskTier {
    dir: PathBuf,
    budget: u64,
}

impl DiskTier {
    /// Opens the tier, creating the cache directory if needed.
    pub(crate) fn open(dir: PathBuf, budget: u64) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&dir)
            .map_err(|e| CacheError::Io(format!("creating cache dir '{}': {e}", dir.display())))?;
        Ok(Self { dir, budget })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}{ENTRY_SUFFIX}"))
    }

    /// Reads an entry's payload. Corrupt or expired entries are removed and
    /// reported as misses rather than errors, mirroring the memory tier.
    pub(crate) fn read(
        &self,
        key: &str,
        ttl: Option<Duration>,
    ) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.entry_path(key);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::Io(format!("reading '{}': {e}", path.display()))),
        };

        match parse_entry(key, &raw) {
            Ok((header, payload)) => {
                if is_expired(header.created_at, ttl) {
                    debug!(key, "disk entry expired; removing");
                    self.remove(key)?;
                    return Ok(None);
                }
                Ok(Some(payload))
            }
            Err(e) => {
                warn!(key, error = %e, "corrupt disk cache entry; removing");
                self.remove(key)?;
                Ok(None)
            }
        }
    }

    /// Writes an entry atomically, then evicts oldest entries if the tier
    /// exceeds its byte budget.
    pub(crate) fn write(&self, key: &str, payload: &[u8]) -> Result<(), CacheError> {
        let header = EntryHeader {
            fingerprint: key.to_string(),
            created_at: unix_now(),
            payload_size: payload.len() as u64,
        };
        let mut blob = serde_json::to_vec(&header)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        blob.push(b'\n');
        blob.extend_from_slice(payload);

        let path = self.entry_path(key);
        let tmp = self.dir.join(format!("{key}{ENTRY_SUFFIX}{TMP_SUFFIX}"));
        std::fs::write(&tmp, &blob)
            .map_err(|e| CacheError::Io(format!("writing '{}': {e}", tmp.display())))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| CacheError::Io(format!("publishing '{}': {e}", path.display())))?;

        let evicted = self.evict_if_needed()?;
        if evicted > 0 {
            debug!(evicted, "disk tier LRU eviction");
        }
        Ok(())
    }

    /// Removes an entry if present.
    pub(crate) fn remove(&self, key: &str) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io(format!("removing '{}': {e}", path.display()))),
        }
    }

    /// Drops all entries, including any stale temporary files.
    pub(crate) fn clear(&self) -> Result<(), CacheError> {
        for path in self.list_files(true)? {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(CacheError::Io(format!(
                        "removing '{}': {e}",
                        path.display()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Total bytes used by entry files.
    pub(crate) fn bytes_used(&self) -> Result<u64, CacheError> {
        let mut total = 0;
        for path in self.list_files(false)? {
            if let Ok(meta) = std::fs::metadata(&path) {
                total += meta.len();
            }
        }
        Ok(total)
    }

    /// Evicts oldest-modified entries until the tier fits its budget.
    fn evict_if_needed(&self) -> Result<u64, CacheError> {
        let mut files: Vec<(PathBuf, SystemTime, u64)> = Vec::new();
        let mut total = 0;
        for path in self.list_files(false)? {
            let Ok(meta) = std::fs::metadata(&path) else {
                continue;
            };
            let mtime = meta.modified().unwrap_or(UNIX_EPOCH);
            total += meta.len();
            files.push((path, mtime, meta.len()));
        }

        if total <= self.budget {
            return Ok(0);
        }

        files.sort_by_key(|(_, mtime, _)| *mtime);

        let mut evicted = 0;
        for (path, _, size) in files {
            if total <= self.budget {
                break;
            }
            if std::fs::remove_file(&path).is_ok() {
                total -= size;
                evicted += 1;
            }
        }
        Ok(evicted)
    }

    fn list_files(&self, include_tmp: bool) -> Result<Vec<PathBuf>, CacheError> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| CacheError::Io(format!("listing '{}': {e}", self.dir.display())))?;

        let mut files = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let is_tmp = name.ends_with(TMP_SUFFIX);
            let is_entry = name.ends_with(ENTRY_SUFFIX);
            if is_entry || (include_tmp && is_tmp) {
                files.push(path);
            }
        }
        Ok(files)
    }
}

// ---------------------------------------------------------------------------
// Entry parsing helpers
// ---------------------------------------------------------------------------

fn parse_entry(key: &str, raw: &[u8]) -> Result<(EntryHeader, Vec<u8>), CacheError> {
    let newline = raw
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| CacheError::Corrupt("missing header line".to_string()))?;

    let header: EntryHeader = serde_json::from_slice(&raw[..newline])
        .map_err(|e| CacheError::Corrupt(format!("bad header: {e}")))?;

    let payload = &raw[newline + 1..];
    if header.payload_size != payload.len() as u64 {
        return Err(CacheError::Corrupt(format!(
            "payload size mismatch: header says {}, file has {}",
            header.payload_size,
            payload.len()
        )));
    }
    if header.fingerprint != key {
        return Err(CacheError::Corrupt(format!(
            "fingerprint mismatch: entry belongs to {}",
            header.fingerprint
        )));
    }
    Ok((header, payload.to_vec()))
}

fn is_expired(created_at: u64, ttl: Option<Duration>) -> bool {
    match ttl {
        Some(ttl) => unix_now().saturating_sub(created_at) >= ttl.as_secs().max(1),
        None => false,
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
