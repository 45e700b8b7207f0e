//! Configuration loading and merging for Takeoff.
//!
//! Configuration resolves from multiple sources with project > home >
//! defaults precedence, loaded from `.takeoff.yaml` files. CLI flags are
//! applied on top by the caller.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::{AnalysisMode, Industry, Region};
use crate::CoreError;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Top-level Takeoff configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TakeoffConfig {
    /// Detection settings.
    pub detection: DetectionConfig,
    /// Compliance settings.
    pub compliance: ComplianceConfig,
    /// Cache settings.
    pub cache: CacheConfig,
    /// Training and feedback settings.
    pub training: TrainingConfig,
}

// ---------------------------------------------------------------------------
// DetectionConfig
// ---------------------------------------------------------------------------

/// Detection-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Globally enabled industries. Requests are intersected with this set.
    pub industries: Vec<Industry>,
    /// Base confidence threshold for detection, tuned further by mode.
    pub threshold: f64,
    /// Mode used when a request does not specify one.
    pub default_mode: AnalysisMode,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            industries: Industry::all().to_vec(),
            threshold: 0.75,
            default_mode: AnalysisMode::Balanced,
        }
    }
}

// ---------------------------------------------------------------------------
// ComplianceConfig
// ---------------------------------------------------------------------------

/// Compliance-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    /// Globally enabled compliance regions. Requests are intersected with
    /// this set.
    pub regions: Vec<Region>,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            regions: vec![Region::Australia, Region::Global],
        }
    }
}

// ---------------------------------------------------------------------------
// CacheConfig
// ---------------------------------------------------------------------------

/// Result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether result caching is enabled.
    pub enabled: bool,
    /// Memory tier byte budget in MiB.
    pub memory_budget_mb: u64,
    /// Disk tier byte budget in MiB.
    pub disk_budget_mb: u64,
    /// Entry time-to-live in seconds. `None` disables expiry.
    pub ttl_seconds: Option<u64>,
    /// Path to the disk cache directory. `None` selects a default under
    /// the working directory.
    pub path: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            memory_budget_mb: 100,
            disk_budget_mb: 500,
            ttl_seconds: None,
            path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// TrainingConfig
// ---------------------------------------------------------------------------

/// Feedback collection and retraining settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Whether feedback collection is enabled.
    pub collect_feedback: bool,
    /// Directory where feedback records and model info are stored.
    pub feedback_dir: String,
    /// Whether feedback may trigger automatic retraining.
    pub auto_retrain: bool,
    /// Minimum days between automatic retraining runs.
    pub training_interval_days: u32,
    /// Minimum feedback samples before retraining is considered.
    pub min_feedback_samples: u32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            collect_feedback: true,
            feedback_dir: "feedback_data".to_string(),
            auto_retrain: false,
            training_interval_days: 7,
            min_feedback_samples: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load and merge configuration from multiple sources.
///
/// Resolution order (highest priority first):
/// 1. CLI overrides (applied by the caller after loading)
/// 2. `.takeoff.yaml` in the project directory
/// 3. `.takeoff.yaml` in the user home directory
/// 4. Built-in defaults
///
/// # Errors
///
/// Returns [`CoreError::Config`] if a config file exists but is malformed.
pub fn load_config(project_dir: Option<&Path>) -> Result<TakeoffConfig, CoreError> {
    let mut config = TakeoffConfig::default();

    // Layer 1: Home directory config.
    if let Some(home) = home_dir() {
        let home_config = home.join(".takeoff.yaml");
        if home_config.is_file() {
            debug!(path = %home_config.display(), "loading home config");
            let layer = load_config_file(&home_config)?;
            config = merge_config(config, layer);
        }
    }

    // Layer 2: Project directory config.
    if let Some(dir) = project_dir {
        let project_config = dir.join(".takeoff.yaml");
        if project_config.is_file() {
            debug!(path = %project_config.display(), "loading project config");
            let layer = load_config_file(&project_config)?;
            config = merge_config(config, layer);
        }
    }

    info!("configuration loaded");
    Ok(config)
}

/// Load a single config file and deserialize it.
fn load_config_file(path: &Path) -> Result<TakeoffConfig, CoreError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CoreError::Config(format!(
            "failed to read config file '{}': {e}",
            path.display()
        ))
    })?;

    serde_yml::from_str(&content).map_err(|e| {
        CoreError::Config(format!(
            "failed to parse config file '{}': {e}",
            path.display()
        ))
    })
}

/// Merge `overlay` on top of `base`. Non-default values in `overlay` win.
///
/// List-valued fields fall back to the base when the overlay leaves them
/// empty; scalar fields take the overlay value.
fn merge_config(base: TakeoffConfig, overlay: TakeoffConfig) -> TakeoffConfig {
    TakeoffConfig {
        detection: merge_detection(base.detection, overlay.detection),
        compliance: merge_compliance(base.compliance, overlay.compliance),
        cache: merge_cache(base.cache, overlay.cache),
        training: merge_training(base.training, overlay.training),
    }
}

fn merge_detection(base: DetectionConfig, overlay: DetectionConfig) -> DetectionConfig {
    DetectionConfig {
        industries: if overlay.industries.is_empty() {
            base.industries
        } else {
            overlay.industries
        },
        threshold: overlay.threshold,
        default_mode: overlay.default_mode,
    }
}

fn merge_compliance(base: ComplianceConfig, overlay: ComplianceConfig) -> ComplianceConfig {
    ComplianceConfig {
        regions: if overlay.regions.is_empty() {
            base.regions
        } else {
            overlay.regions
        },
    }
}

fn merge_cache(base: CacheConfig, overlay: CacheConfig) -> CacheConfig {
    CacheConfig {
        enabled: overlay.enabled,
        memory_budget_mb: overlay.memory_budget_mb,
        disk_budget_mb: overlay.disk_budget_mb,
        ttl_seconds: overlay.ttl_seconds.or(base.ttl_seconds),
        path: overlay.path.or(base.path),
    }
}

fn merge_training(base: TrainingConfig, overlay: TrainingConfig) -> TrainingConfig {
    let _ = base;
    overlay
}

/// Get the user home directory.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
