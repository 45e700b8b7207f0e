//! CLI subcommands and the shared wiring between configuration and the
//! pipeline's collaborators.

pub mod analyze;
pub mod cache;
pub mod config;
pub mod feedback;
pub mod model;
pub mod regions;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use takeoff_cache::{CacheOptions, ResultCache};
use takeoff_compliance::GlobalCompliance;
use takeoff_core::config::TakeoffConfig;
use takeoff_core::{Industry, Region};
use takeoff_convert::PlaceholderConverter;
use takeoff_pipeline::{
    AnalysisPipeline, BaselineDetector, FeedbackSink, LocalTrainingStore, PipelineSettings,
    TrainingPipeline,
};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Default cache directory when the configuration names none.
const DEFAULT_CACHE_DIR: &str = ".takeoff/cache";

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub(crate) fn cache_options(config: &TakeoffConfig) -> CacheOptions {
    CacheOptions {
        enabled: config.cache.enabled,
        memory_budget_bytes: config.cache.memory_budget_mb * BYTES_PER_MB,
        disk_budget_bytes: config.cache.disk_budget_mb * BYTES_PER_MB,
        dir: Some(PathBuf::from(
            config.cache.path.as_deref().unwrap_or(DEFAULT_CACHE_DIR),
        )),
        ttl: config.cache.ttl_seconds.map(Duration::from_secs),
    }
}

/// Model metadata lives under the feedback directory, so one configured
/// root covers the whole training side channel.
pub(crate) fn open_training_store(
    config: &TakeoffConfig,
) -> Result<Arc<dyn TrainingPipeline>, anyhow::Error> {
    let dir = PathBuf::from(&config.training.feedback_dir).join("model");
    let store = LocalTrainingStore::open(dir)?;
    Ok(Arc::new(store))
}

pub(crate) fn open_feedback_sink(
    config: &TakeoffConfig,
    training: Arc<dyn TrainingPipeline>,
) -> Result<FeedbackSink, anyhow::Error> {
    let sink = FeedbackSink::open(
        PathBuf::from(&config.training.feedback_dir),
        u64::from(config.training.min_feedback_samples),
        config.training.auto_retrain,
        training,
    )?;
    Ok(sink)
}

/// Builds the fully wired analysis pipeline from configuration.
pub(crate) fn build_pipeline(
    config: &TakeoffConfig,
    no_cache: bool,
) -> Result<AnalysisPipeline, anyhow::Error> {
    let mut options = cache_options(config);
    if no_cache {
        options.enabled = false;
    }

    Ok(AnalysisPipeline::new(
        Arc::new(ResultCache::new(options)),
        Arc::new(BaselineDetector),
        Arc::new(PlaceholderConverter),
        GlobalCompliance::new(&config.compliance.regions),
        open_training_store(config)?,
        PipelineSettings {
            enabled_industries: config.detection.industries.clone(),
            base_threshold: config.detection.threshold,
        },
    ))
}

// ---------------------------------------------------------------------------
// Option parsing helpers
// ---------------------------------------------------------------------------

/// Parses a comma-separated industry list. Unknown names are logged as
/// warnings and skipped.
pub(crate) fn parse_industry_list(arg: &str) -> Vec<Industry> {
    arg.split(',')
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            match Industry::from_name(s) {
                Some(industry) => Some(industry),
                None => {
                    tracing::warn!(industry = s, "unknown industry; skipping");
                    None
                }
            }
        })
        .collect()
}

/// Parses a comma-separated region list. Unknown names are logged as
/// warnings and skipped.
pub(crate) fn parse_region_list(arg: &str) -> Vec<Region> {
    arg.split(',')
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            match Region::from_name(s) {
                Some(region) => Some(region),
                None => {
                    tracing::warn!(region = s, "unknown region; skipping");
                    None
                }
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
