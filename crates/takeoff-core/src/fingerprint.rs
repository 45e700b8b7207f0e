//! Content + option-set fingerprinting.
//!
//! The fingerprint is the cache key: SHA-256 over the original file content
//! and a canonical (sorted, deduplicated) encoding of the requested
//! industries, regions, and mode. CAD inputs are keyed by their original
//! uploaded bytes; conversion output never influences the key, so distinct
//! CAD files can never alias through identically-sized conversions.
//!
//! Hash collisions are treated as cache hits and content is not re-verified
//! on hit. This is an accepted probabilistic trade-off, not a bug.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::request::AnalysisRequest;
use crate::types::{AnalysisMode, Industry, Region};

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// A fixed-length opaque cache key (64 lowercase hex characters).
///
/// Two requests with the same fingerprint are treated as interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint for the given content and option set.
    ///
    /// Deterministic and order-independent over `industries` and `regions`:
    /// both are sorted and deduplicated before hashing. Any difference in
    /// content bytes, industry set, region set, or mode produces a
    /// different fingerprint. No I/O is performed.
    #[must_use]
    pub fn compute(
        content: &[u8],
        industries: &[Industry],
        regions: &[Region],
        mode: AnalysisMode,
    ) -> Fingerprint {
        let industries: BTreeSet<Industry> = industries.iter().copied().collect();
        let regions: BTreeSet<Region> = regions.iter().copied().collect();

        let mut hasher = Sha256::new();
        // Length-prefix every field so adjacent fields can never alias.
        hasher.update((content.len() as u64).to_be_bytes());
        hasher.update(content);
        hasher.update((industries.len() as u64).to_be_bytes());
        for industry in &industries {
            hasher.update(industry.name().as_bytes());
            hasher.update([0u8]);
        }
        hasher.update((regions.len() as u64).to_be_bytes());
        for region in &regions {
            hasher.update(region.name().as_bytes());
            hasher.update([0u8]);
        }
        hasher.update(mode.name().as_bytes());

        Fingerprint(hex::encode(hasher.finalize()))
    }

    /// Computes the fingerprint of a request's content and normalized
    /// option set.
    #[must_use]
    pub fn of_request(request: &AnalysisRequest) -> Fingerprint {
        let industries: Vec<Industry> = request.industries.iter().copied().collect();
        let regions: Vec<Region> = request.regions.iter().copied().collect();
        Self::compute(&request.content, &industries, &regions, request.mode)
    }

    /// Returns the hex-encoded key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &[u8] = b"%PDF-1.4 sample drawing";

    #[test]
    fn fingerprint_is_sha256_hex() {
        let fp = Fingerprint::compute(CONTENT, &[Industry::Plumbing], &[], AnalysisMode::Balanced);
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_deterministic() {
        let a = Fingerprint::compute(CONTENT, &[Industry::Plumbing], &[], AnalysisMode::Balanced);
        let b = Fingerprint::compute(CONTENT, &[Industry::Plumbing], &[], AnalysisMode::Balanced);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_order_independent_over_sets() {
        let a = Fingerprint::compute(
            CONTENT,
            &[Industry::Plumbing, Industry::Electrical, Industry::Hvac],
            &[Region::Australia, Region::Global],
            AnalysisMode::Balanced,
        );
        let b = Fingerprint::compute(
            CONTENT,
            &[Industry::Hvac, Industry::Plumbing, Industry::Electrical],
            &[Region::Global, Region::Australia],
            AnalysisMode::Balanced,
        );
        assert_eq!(a, b, "set iteration order must not change the fingerprint");
    }

    #[test]
    fn fingerprint_deduplicates_sets() {
        let a = Fingerprint::compute(
            CONTENT,
            &[Industry::Plumbing, Industry::Plumbing],
            &[],
            AnalysisMode::Balanced,
        );
        let b = Fingerprint::compute(CONTENT, &[Industry::Plumbing], &[], AnalysisMode::Balanced);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let a = Fingerprint::compute(b"drawing-a", &[Industry::Plumbing], &[], AnalysisMode::Balanced);
        let b = Fingerprint::compute(b"drawing-b", &[Industry::Plumbing], &[], AnalysisMode::Balanced);
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_changes_with_industries() {
        let a = Fingerprint::compute(CONTENT, &[Industry::Plumbing], &[], AnalysisMode::Balanced);
        let b = Fingerprint::compute(
            CONTENT,
            &[Industry::Plumbing, Industry::Electrical],
            &[],
            AnalysisMode::Balanced,
        );
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_changes_with_regions() {
        let a = Fingerprint::compute(CONTENT, &[Industry::Plumbing], &[], AnalysisMode::Balanced);
        let b = Fingerprint::compute(
            CONTENT,
            &[Industry::Plumbing],
            &[Region::Australia],
            AnalysisMode::Balanced,
        );
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_changes_with_mode() {
        let a = Fingerprint::compute(CONTENT, &[Industry::Plumbing], &[], AnalysisMode::Balanced);
        let b = Fingerprint::compute(CONTENT, &[Industry::Plumbing], &[], AnalysisMode::Accuracy);
        assert_ne!(a, b);
    }

    #[test]
    fn field_boundaries_do_not_alias() {
        // An industry name must not be confusable with trailing content
        // bytes. These two inputs differ only in where the boundary falls.
        let a = Fingerprint::compute(b"abc", &[Industry::Plumbing], &[], AnalysisMode::Balanced);
        let b = Fingerprint::compute(b"abcplumbing", &[Industry::Plumbing], &[], AnalysisMode::Balanced);
        assert_ne!(a, b);
    }

    #[test]
    fn request_fingerprint_matches_compute() {
        let request = AnalysisRequest::new(
            CONTENT.to_vec(),
            "pdf",
            [Industry::Electrical, Industry::Plumbing],
            [Region::Global],
            AnalysisMode::Accuracy,
        );
        let direct = Fingerprint::compute(
            CONTENT,
            &[Industry::Plumbing, Industry::Electrical],
            &[Region::Global],
            AnalysisMode::Accuracy,
        );
        assert_eq!(Fingerprint::of_request(&request), direct);
    }
}
