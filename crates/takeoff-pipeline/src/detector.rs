//! The detection seam: resolved run configuration and the [`Detector`]
//! trait the orchestrator drives.

use std::collections::BTreeSet;

use tracing::debug;

use takeoff_core::result::DetectionOutput;
use takeoff_core::{AnalysisMode, Industry};
use takeoff_convert::Analyzable;

use crate::PipelineError;

// ---------------------------------------------------------------------------
// DetectorConfig
// ---------------------------------------------------------------------------

/// Per-run detection configuration, resolved from the globally enabled
/// industry set, the request, and the analysis mode.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Industries to analyze, in catalog order.
    pub industries: Vec<Industry>,
    /// Confidence threshold after mode tuning.
    pub threshold: f64,
    pub mode: AnalysisMode,
}

impl DetectorConfig {
    /// Intersects the requested industries with the enabled set and applies
    /// mode tuning.
    ///
    /// Performance mode raises the threshold to at least 0.85 and narrows
    /// the run to plumbing when plumbing was requested; accuracy mode
    /// lowers the threshold to at most 0.65; balanced keeps the base.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] when the intersection is
    /// empty: nothing the caller asked for is enabled.
    pub fn resolve(
        enabled: &[Industry],
        requested: &BTreeSet<Industry>,
        base_threshold: f64,
        mode: AnalysisMode,
    ) -> Result<DetectorConfig, PipelineError> {
        let enabled: BTreeSet<Industry> = enabled.iter().copied().collect();
        let mut industries: Vec<Industry> = requested
            .iter()
            .copied()
            .filter(|i| enabled.contains(i))
            .collect();

        if industries.is_empty() {
            return Err(PipelineError::InvalidInput(format!(
                "no requested industry is enabled: requested {requested:?}"
            )));
        }

        let threshold = match mode {
            AnalysisMode::Performance => base_threshold.max(0.85),
            AnalysisMode::Accuracy => base_threshold.min(0.65),
            AnalysisMode::Balanced => base_threshold,
        };

        if mode == AnalysisMode::Performance && industries.contains(&Industry::Plumbing) {
            industries = vec![Industry::Plumbing];
        }

        debug!(
            ?industries,
            threshold,
            mode = %mode,
            "resolved detector configuration"
        );
        Ok(DetectorConfig {
            industries,
            threshold,
            mode,
        })
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Detects industry elements in a normalized drawing. Implementations must
/// be shareable across worker threads and deterministic for a given input,
/// since their output is cached by content fingerprint.
pub trait Detector: Send + Sync {
    /// Runs detection over the normalized input.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Detection`] when the input cannot be
    /// processed; the analysis fails and nothing is cached.
    fn detect_elements(
        &self,
        input: &Analyzable,
        config: &DetectorConfig,
    ) -> Result<DetectionOutput, PipelineError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
