//! The analysis orchestrator: fingerprint, cache, and the stage sequence.
//!
//! Stage order on a cache miss: normalize, detect, compliance, merge. The
//! fingerprint is always computed over the bytes the caller uploaded, never
//! over a conversion artifact, so re-uploading the same DWG hits the cache
//! even though conversion output is not byte-stable.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use takeoff_cache::{ComputeError, ResultCache};
use takeoff_compliance::GlobalCompliance;
use takeoff_core::result::{ComplianceOutcome, FileMetadata, RunMetadata};
use takeoff_core::{AnalysisRequest, AnalysisResult, CoreError, Fingerprint, Industry, Region};
use takeoff_convert::{normalize, CadConverter, CadFormat, ConvertError};

use crate::detector::{Detector, DetectorConfig};
use crate::training::TrainingPipeline;
use crate::PipelineError;

// ---------------------------------------------------------------------------
// PipelineSettings
// ---------------------------------------------------------------------------

/// Static pipeline configuration, resolved once at wiring time.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Industries the deployment is licensed to analyze.
    pub enabled_industries: Vec<Industry>,
    /// Base confidence threshold before mode tuning.
    pub base_threshold: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            enabled_industries: Industry::all().to_vec(),
            base_threshold: 0.75,
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisPipeline
// ---------------------------------------------------------------------------

/// The fully wired pipeline. All collaborators are injected, so tests swap
/// in their own detectors, converters, and training stores.
pub struct AnalysisPipeline {
    cache: Arc<ResultCache>,
    detector: Arc<dyn Detector>,
    converter: Arc<dyn CadConverter>,
    compliance: GlobalCompliance,
    training: Arc<dyn TrainingPipeline>,
    settings: PipelineSettings,
}

impl AnalysisPipeline {
    #[must_use]
    pub fn new(
        cache: Arc<ResultCache>,
        detector: Arc<dyn Detector>,
        converter: Arc<dyn CadConverter>,
        compliance: GlobalCompliance,
        training: Arc<dyn TrainingPipeline>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            cache,
            detector,
            converter,
            compliance,
            training,
            settings,
        }
    }

    /// The result cache backing this pipeline.
    #[must_use]
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Analyzes one drawing, served from the cache when possible.
    ///
    /// Identical concurrent requests are de-duplicated down to one stage
    /// run. Failed runs cache nothing; partial results (detection ok,
    /// compliance failed) are cached like complete ones.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] for malformed requests and
    /// unsupported file types, both rejected before any cache interaction,
    /// plus whatever the stages raise on a cache miss.
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, PipelineError> {
        request.validate().map_err(|e| match e {
            CoreError::InvalidInput(msg) => PipelineError::InvalidInput(msg),
            other => PipelineError::InvalidInput(other.to_string()),
        })?;
        if request.extension != "pdf" && CadFormat::from_extension(&request.extension).is_none() {
            return Err(PipelineError::InvalidInput(format!(
                "unsupported file format: .{}",
                request.extension
            )));
        }

        let key = Fingerprint::of_request(request);
        debug!(key = %key, "analysis request fingerprinted");

        let payload = self
            .cache
            .get_or_compute(&key, || {
                let result = self.run(request)?;
                serde_json::to_vec(&result).map_err(PipelineError::from)
            })
            .map_err(|e| match e {
                ComputeError::Compute(e) => e,
                ComputeError::Shared(msg) => PipelineError::Concurrent(msg),
            })?;

        serde_json::from_slice(&payload).map_err(PipelineError::from)
    }

    /// Runs the stage sequence for one cache miss.
    fn run(&self, request: &AnalysisRequest) -> Result<AnalysisResult, PipelineError> {
        let started = Instant::now();

        let input = normalize(&request.content, &request.extension, self.converter.as_ref())
            .map_err(|e| match e {
                ConvertError::Unsupported { extension } => PipelineError::InvalidInput(format!(
                    "unsupported file format: .{extension}"
                )),
                other => PipelineError::Conversion(other.to_string()),
            })?;

        let config = DetectorConfig::resolve(
            &self.settings.enabled_industries,
            &request.industries,
            self.settings.base_threshold,
            request.mode,
        )?;
        let detection = self.detector.detect_elements(&input, &config)?;

        let regions: Vec<Region> = request.regions.iter().copied().collect();
        let compliance = if regions.is_empty() {
            None
        } else {
            match self.compliance.check(&detection, &regions) {
                Ok(report) => Some(ComplianceOutcome::Report(report)),
                Err(e) => {
                    // Detection stands on its own; a failed compliance stage
                    // degrades the result to a partial one.
                    warn!(error = %e, "compliance stage failed; result is partial");
                    Some(ComplianceOutcome::Failed {
                        message: e.to_string(),
                    })
                }
            }
        };

        let model_version = match self.training.model_info() {
            Ok(info) => info.version,
            Err(e) => {
                warn!(error = %e, "model metadata unavailable");
                "unknown".to_string()
            }
        };

        let result = AnalysisResult {
            file: FileMetadata {
                name: request.file_name.clone(),
                extension: request.extension.clone(),
                kind: input.kind.file_kind(),
                size_bytes: request.content.len() as u64,
            },
            conversion: input.conversion,
            run: RunMetadata {
                duration_ms: started.elapsed().as_millis() as u64,
                mode: config.mode,
                industries_analyzed: config.industries.clone(),
                regions_checked: regions,
                model_version,
            },
            detection,
            compliance,
        };

        info!(
            elements = result.detection.total_elements(),
            partial = result.is_partial(),
            duration_ms = result.run.duration_ms,
            "analysis complete"
        );
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use takeoff_cache::CacheOptions;
    use takeoff_core::AnalysisMode;
    use takeoff_convert::PlaceholderConverter;

    use crate::baseline::BaselineDetector;
    use crate::training::LocalTrainingStore;

    fn pipeline(tmp: &tempfile::TempDir) -> AnalysisPipeline {
        let cache = Arc::new(ResultCache::new(CacheOptions {
            dir: Some(tmp.path().join("cache")),
            ..CacheOptions::default()
        }));
        let training: Arc<dyn TrainingPipeline> =
            Arc::new(LocalTrainingStore::open(tmp.path().join("training")).unwrap());
        AnalysisPipeline::new(
            cache,
            Arc::new(BaselineDetector),
            Arc::new(PlaceholderConverter),
            GlobalCompliance::new(&[Region::Australia, Region::Global]),
            training,
            PipelineSettings::default(),
        )
    }

    fn request(content: &[u8], extension: &str) -> AnalysisRequest {
        AnalysisRequest::new(
            content.to_vec(),
            extension,
            [Industry::Plumbing],
            [Region::Australia],
            AnalysisMode::Balanced,
        )
    }

    #[test]
    fn pdf_analysis_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&tmp);
        let result = pipeline.analyze(&request(b"%PDF drawing", "pdf")).unwrap();

        assert!(result.detection.total_elements() > 0);
        assert_eq!(result.run.industries_analyzed, vec![Industry::Plumbing]);
        assert_eq!(result.run.model_version, "0.1.0");
        assert!(result.compliance.is_some());
        assert!(result.conversion.is_none());
    }

    #[test]
    fn repeated_request_served_from_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&tmp);
        let req = request(b"%PDF drawing", "pdf");

        let first = pipeline.analyze(&req).unwrap();
        let second = pipeline.analyze(&req).unwrap();
        assert_eq!(first, second);
        assert_eq!(pipeline.cache().metrics().hits, 1);
    }

    #[test]
    fn dwg_analysis_carries_conversion_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&tmp);

        let result = pipeline.analyze(&request(b"binary dwg", "dwg")).unwrap();
        let meta = result.conversion.expect("conversion metadata");
        assert_eq!(meta.source_format, "DWG");
        assert_eq!(meta.target_format, "DXF");

        // Re-uploading the same original bytes hits the cache even though
        // the conversion artifact is not byte-stable.
        pipeline.analyze(&request(b"binary dwg", "dwg")).unwrap();
        assert_eq!(pipeline.cache().metrics().hits, 1);
    }

    #[test]
    fn unsupported_extension_rejected_without_touching_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&tmp);
        let err = pipeline
            .analyze(&request(b"spreadsheet", "xlsx"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));

        let metrics = pipeline.cache().metrics();
        assert_eq!(metrics.hits + metrics.misses, 0);
    }

    #[test]
    fn empty_content_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&tmp);
        let err = pipeline.analyze(&request(b"", "pdf")).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn disabled_region_degrades_to_partial_result() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&tmp);

        let req = AnalysisRequest::new(
            b"%PDF drawing".to_vec(),
            "pdf",
            [Industry::Plumbing],
            [Region::Uk],
            AnalysisMode::Balanced,
        );
        let result = pipeline.analyze(&req).unwrap();
        assert!(result.is_partial());
        assert!(result.detection.total_elements() > 0);
    }

    #[test]
    fn no_regions_skips_compliance() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&tmp);

        let req = AnalysisRequest::new(
            b"%PDF drawing".to_vec(),
            "pdf",
            [Industry::Plumbing],
            [],
            AnalysisMode::Balanced,
        );
        let result = pipeline.analyze(&req).unwrap();
        assert!(result.compliance.is_none());
        assert!(!result.is_partial());
    }

    #[test]
    fn performance_mode_narrows_to_plumbing() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&tmp);

        let req = AnalysisRequest::new(
            b"%PDF drawing".to_vec(),
            "pdf",
            [Industry::Plumbing, Industry::Electrical],
            [],
            AnalysisMode::Performance,
        );
        let result = pipeline.analyze(&req).unwrap();
        assert_eq!(result.run.industries_analyzed, vec![Industry::Plumbing]);
        assert_eq!(result.detection.threshold, 0.85);
    }
}
