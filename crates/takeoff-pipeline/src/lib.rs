//! Takeoff Pipeline -- the analysis orchestrator and its supporting stages.
//!
//! [`AnalysisPipeline`] ties the pieces together: it fingerprints the
//! request, consults the result cache, and on a miss runs normalization,
//! detection, and compliance, merging the stage outputs into one
//! [`takeoff_core::AnalysisResult`]. Detection itself sits behind the
//! [`Detector`] trait; the built-in [`BaselineDetector`] is deterministic
//! over the input bytes. Model metadata and correction feedback live in the
//! training module.

mod baseline;
mod detector;
mod feedback;
mod orchestrator;
mod training;

pub use baseline::BaselineDetector;
pub use detector::{Detector, DetectorConfig};
pub use feedback::{FeedbackCategory, FeedbackRecord, FeedbackSink};
pub use orchestrator::{AnalysisPipeline, PipelineSettings};
pub use training::{LocalTrainingStore, ModelInfo, TrainingPipeline};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Error type for the analysis pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The request is malformed or references an unsupported file type.
    /// Raised at the boundary, before any cache interaction.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// CAD conversion failed; the whole analysis fails and nothing is
    /// cached for the request.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// The detector could not process the normalized input.
    #[error("detection failed: {0}")]
    Detection(String),

    /// A concurrent computation for the same fingerprint failed; this
    /// caller never ran the stages itself.
    #[error("concurrent analysis failed: {0}")]
    Concurrent(String),

    /// A cached or freshly produced result could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The training store or feedback sink hit an I/O problem.
    #[error("training store error: {0}")]
    Training(String),

    /// A feedback record failed validation.
    #[error("invalid feedback: {0}")]
    InvalidFeedback(String),
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
