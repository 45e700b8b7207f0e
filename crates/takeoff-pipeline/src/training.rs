//! Local model metadata store and the retraining seam.
//!
//! The store keeps a single `model_info.json` document under its
//! directory. Retraining is a metadata operation here: the version gets a
//! patch bump and the sample count is rolled in. A deployment with a real
//! training loop implements [`TrainingPipeline`] over its own
//! infrastructure.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::PipelineError;

const MODEL_INFO_FILE: &str = "model_info.json";

// ---------------------------------------------------------------------------
// ModelInfo
// ---------------------------------------------------------------------------

/// Metadata about the detection model currently in effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Semantic version; retraining bumps the patch component.
    pub version: String,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Total feedback samples incorporated across all retrains.
    pub training_samples: u64,
    /// Unix seconds of the last retrain, absent for the factory model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_trained_unix: Option<u64>,
}

impl Default for ModelInfo {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            accuracy: 0.95,
            precision: 0.94,
            recall: 0.93,
            f1_score: 0.935,
            training_samples: 0,
            last_trained_unix: None,
        }
    }
}

// ---------------------------------------------------------------------------
// TrainingPipeline
// ---------------------------------------------------------------------------

/// Access to model metadata and retraining.
pub trait TrainingPipeline: Send + Sync {
    /// Returns the current model metadata.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Training`] when the backing store is
    /// unreadable.
    fn model_info(&self) -> Result<ModelInfo, PipelineError>;

    /// Incorporates `samples` feedback samples and publishes new model
    /// metadata with a patch-bumped version.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Training`] when the store cannot be
    /// updated or the stored version is unparseable.
    fn retrain(&self, samples: u64) -> Result<ModelInfo, PipelineError>;
}

// ---------------------------------------------------------------------------
// LocalTrainingStore
// ---------------------------------------------------------------------------

/// Filesystem-backed [`TrainingPipeline`].
pub struct LocalTrainingStore {
    dir: PathBuf,
}

impl LocalTrainingStore {
    /// Opens the store, creating its directory if needed. A store without a
    /// `model_info.json` reports the factory model.
    pub fn open(dir: PathBuf) -> Result<Self, PipelineError> {
        std::fs::create_dir_all(&dir).map_err(|e| {
            PipelineError::Training(format!("creating '{}': {e}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    fn info_path(&self) -> PathBuf {
        self.dir.join(MODEL_INFO_FILE)
    }

    fn write_info(&self, info: &ModelInfo) -> Result<(), PipelineError> {
        let json = serde_json::to_vec_pretty(info)?;
        let tmp = self.dir.join(format!("{MODEL_INFO_FILE}.tmp"));
        std::fs::write(&tmp, json)
            .map_err(|e| PipelineError::Training(format!("writing '{}': {e}", tmp.display())))?;
        std::fs::rename(&tmp, self.info_path()).map_err(|e| {
            PipelineError::Training(format!("publishing '{}': {e}", self.info_path().display()))
        })?;
        Ok(())
    }
}

impl TrainingPipeline for LocalTrainingStore {
    fn model_info(&self) -> Result<ModelInfo, PipelineError> {
        match std::fs::read(self.info_path()) {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ModelInfo::default()),
            Err(e) => Err(PipelineError::Training(format!(
                "reading '{}': {e}",
                self.info_path().display()
            ))),
        }
    }

    fn retrain(&self, samples: u64) -> Result<ModelInfo, PipelineError> {
        let current = self.model_info()?;
        let info = ModelInfo {
            version: bump_patch(&current.version)?,
            training_samples: current.training_samples + samples,
            last_trained_unix: Some(unix_now()),
            ..current
        };
        self.write_info(&info)?;
        info!(
            version = %info.version,
            samples,
            total_samples = info.training_samples,
            "model retrained"
        );
        Ok(info)
    }
}

fn bump_patch(version: &str) -> Result<String, PipelineError> {
    let mut parts = version.splitn(3, '.');
    let (Some(major), Some(minor), Some(patch)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(PipelineError::Training(format!(
            "model version '{version}' is not semver"
        )));
    };
    let patch: u64 = patch.parse().map_err(|_| {
        PipelineError::Training(format!("model version '{version}' is not semver"))
    })?;
    Ok(format!("{major}.{minor}.{}", patch + 1))
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
