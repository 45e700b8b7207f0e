//! The immutable analysis request value.
//!
//! Option handling is typed at the boundary: industries and regions are
//! enum sets, the mode is an enum, and validation happens before any cache
//! interaction.

use std::collections::BTreeSet;

use crate::types::{AnalysisMode, Industry, Region};
use crate::CoreError;

// ---------------------------------------------------------------------------
// AnalysisRequest
// ---------------------------------------------------------------------------

/// An immutable request to analyze one drawing file.
///
/// Two requests with the same content bytes and the same normalized option
/// set fingerprint identically regardless of the order the options were
/// supplied in; the `BTreeSet` fields keep the option sets sorted and
/// deduplicated.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Raw file content as uploaded. CAD inputs are fingerprinted by these
    /// original bytes, never by post-conversion artifacts.
    pub content: Vec<u8>,
    /// Original file name, when known. Informational only.
    pub file_name: Option<String>,
    /// Declared file extension, lowercase, without a leading dot.
    pub extension: String,
    /// Industries to detect. Must be non-empty.
    pub industries: BTreeSet<Industry>,
    /// Compliance regions to check. May be empty (compliance skipped).
    pub regions: BTreeSet<Region>,
    /// Tuning preset for the detection run.
    pub mode: AnalysisMode,
}

impl AnalysisRequest {
    /// Creates a request with a normalized extension and option sets.
    pub fn new(
        content: Vec<u8>,
        extension: &str,
        industries: impl IntoIterator<Item = Industry>,
        regions: impl IntoIterator<Item = Region>,
        mode: AnalysisMode,
    ) -> Self {
        Self {
            content,
            file_name: None,
            extension: extension.trim_start_matches('.').to_lowercase(),
            industries: industries.into_iter().collect(),
            regions: regions.into_iter().collect(),
            mode,
        }
    }

    /// Attaches the original file name.
    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Validates the request at the boundary.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] if the content is empty, the
    /// extension is missing, or no industries were requested.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.content.is_empty() {
            return Err(CoreError::InvalidInput("file content is empty".to_string()));
        }
        if self.extension.is_empty() {
            return Err(CoreError::InvalidInput(
                "file extension is missing".to_string(),
            ));
        }
        if self.industries.is_empty() {
            return Err(CoreError::InvalidInput(
                "at least one industry must be requested".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_request() -> AnalysisRequest {
        AnalysisRequest::new(
            b"%PDF-1.4 drawing".to_vec(),
            "pdf",
            [Industry::Plumbing],
            [],
            AnalysisMode::Balanced,
        )
    }

    #[test]
    fn valid_request_passes_validation() {
        assert!(minimal_request().validate().is_ok());
    }

    #[test]
    fn empty_content_rejected() {
        let mut request = minimal_request();
        request.content.clear();
        assert!(matches!(
            request.validate(),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn empty_industries_rejected() {
        let mut request = minimal_request();
        request.industries.clear();
        assert!(matches!(
            request.validate(),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn extension_is_normalized() {
        let request = AnalysisRequest::new(
            b"data".to_vec(),
            ".DWG",
            [Industry::Plumbing],
            [],
            AnalysisMode::Balanced,
        );
        assert_eq!(request.extension, "dwg");
    }

    #[test]
    fn option_sets_deduplicate() {
        let request = AnalysisRequest::new(
            b"data".to_vec(),
            "pdf",
            [Industry::Plumbing, Industry::Plumbing, Industry::Electrical],
            [Region::Global, Region::Global],
            AnalysisMode::Balanced,
        );
        assert_eq!(request.industries.len(), 2);
        assert_eq!(request.regions.len(), 1);
    }

    #[test]
    fn empty_regions_are_allowed() {
        let request = minimal_request();
        assert!(request.regions.is_empty());
        assert!(request.validate().is_ok());
    }
}
