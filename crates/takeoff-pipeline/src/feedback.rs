//! The feedback sink: validated correction records persisted for the next
//! retraining round.
//!
//! Records are single JSON documents appended to the feedback directory.
//! Validation is purely syntactic; the sink does not check that the element
//! exists in any stored result, since results expire from the cache
//! independently of feedback. With auto-retrain enabled a background worker
//! watches the pending count and retrains once enough samples accumulate.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use takeoff_core::Industry;

use crate::training::{ModelInfo, TrainingPipeline};
use crate::PipelineError;

// ---------------------------------------------------------------------------
// FeedbackRecord
// ---------------------------------------------------------------------------

/// What kind of detection mistake the correction describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackCategory {
    /// The element is not actually present in the drawing.
    FalsePositive,
    /// A present element was not detected.
    FalseNegative,
    /// The element exists but its type is wrong.
    WrongType,
    /// The element exists but an attribute (diameter, voltage) is wrong.
    WrongAttribute,
}

/// One user correction to a detection result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Caller-side identifier of the analyzed file.
    pub file_id: String,
    /// Identifier of the corrected element, e.g. `plumbing-12` or `clash-3`.
    pub element_id: String,
    /// The detector's original value.
    pub original: String,
    /// The user's corrected value.
    pub corrected: String,
    pub category: FeedbackCategory,
}

/// Checks that an element identifier has the `<catalog-name>-<n>` shape
/// produced by detection.
fn validate_element_id(element_id: &str) -> Result<(), PipelineError> {
    let Some((prefix, number)) = element_id.rsplit_once('-') else {
        return Err(PipelineError::InvalidFeedback(format!(
            "element id '{element_id}' is not of the form <type>-<n>"
        )));
    };
    let prefix_known = prefix == "clash" || Industry::from_name(prefix).is_some();
    let number_ok = !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit());
    if !prefix_known || !number_ok {
        return Err(PipelineError::InvalidFeedback(format!(
            "element id '{element_id}' does not name a known element kind"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// FeedbackSink
// ---------------------------------------------------------------------------

struct SinkInner {
    dir: PathBuf,
    min_samples: u64,
    training: Arc<dyn TrainingPipeline>,
}

impl SinkInner {
    /// Counts feedback records not yet incorporated into a retrain.
    fn pending_count(&self) -> Result<u64, PipelineError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            PipelineError::Training(format!("listing '{}': {e}", self.dir.display()))
        })?;
        let count = entries
            .flatten()
            .filter(|e| {
                e.path().is_file()
                    && e.path().extension().is_some_and(|ext| ext == "json")
            })
            .count();
        Ok(count as u64)
    }

    /// Moves pending records into `processed/` so they are counted once.
    fn archive_pending(&self) -> Result<u64, PipelineError> {
        let processed = self.dir.join("processed");
        std::fs::create_dir_all(&processed).map_err(|e| {
            PipelineError::Training(format!("creating '{}': {e}", processed.display()))
        })?;

        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            PipelineError::Training(format!("listing '{}': {e}", self.dir.display()))
        })?;
        let mut moved = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let target = processed.join(entry.file_name());
            std::fs::rename(&path, &target).map_err(|e| {
                PipelineError::Training(format!("archiving '{}': {e}", path.display()))
            })?;
            moved += 1;
        }
        Ok(moved)
    }

    /// Retrains from the pending records and archives them.
    fn retrain(&self) -> Result<ModelInfo, PipelineError> {
        let pending = self.pending_count()?;
        if pending < self.min_samples {
            return Err(PipelineError::Training(format!(
                "only {pending} feedback samples pending, {} required",
                self.min_samples
            )));
        }
        let info = self.training.retrain(pending)?;
        self.archive_pending()?;
        Ok(info)
    }

    fn maybe_retrain(&self) {
        match self.pending_count() {
            Ok(pending) if pending >= self.min_samples => {
                if let Err(e) = self.retrain() {
                    warn!(error = %e, "automatic retrain failed");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "could not count pending feedback"),
        }
    }
}

/// Collects correction feedback and optionally drives automatic retrains.
pub struct FeedbackSink {
    inner: Arc<SinkInner>,
    sequence: AtomicU64,
    notify: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl FeedbackSink {
    /// Opens the sink, creating the feedback directory if needed. With
    /// `auto_retrain` a background worker retrains as soon as
    /// `min_samples` records are pending.
    pub fn open(
        dir: PathBuf,
        min_samples: u64,
        auto_retrain: bool,
        training: Arc<dyn TrainingPipeline>,
    ) -> Result<Self, PipelineError> {
        std::fs::create_dir_all(&dir).map_err(|e| {
            PipelineError::Training(format!("creating '{}': {e}", dir.display()))
        })?;
        let inner = Arc::new(SinkInner {
            dir,
            min_samples,
            training,
        });

        let (notify, worker) = if auto_retrain {
            let (tx, rx) = mpsc::channel::<()>();
            let worker_inner = Arc::clone(&inner);
            let handle = std::thread::spawn(move || {
                while rx.recv().is_ok() {
                    worker_inner.maybe_retrain();
                }
            });
            (Some(tx), Some(handle))
        } else {
            (None, None)
        };

        Ok(Self {
            inner,
            sequence: AtomicU64::new(0),
            notify,
            worker,
        })
    }

    /// Validates and persists one correction record.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidFeedback`] for malformed element
    /// identifiers and [`PipelineError::Training`] for storage failures.
    pub fn submit(&self, record: &FeedbackRecord) -> Result<(), PipelineError> {
        validate_element_id(&record.element_id)?;
        if record.file_id.trim().is_empty() {
            return Err(PipelineError::InvalidFeedback(
                "file id must not be empty".to_string(),
            ));
        }

        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let path = self
            .inner
            .dir
            .join(format!("feedback_{stamp}_{seq}.json"));

        let json = serde_json::to_vec_pretty(record)?;
        std::fs::write(&path, json).map_err(|e| {
            PipelineError::Training(format!("writing '{}': {e}", path.display()))
        })?;
        debug!(element = %record.element_id, category = ?record.category, "feedback recorded");

        if let Some(notify) = &self.notify {
            // The worker exiting early only disables auto-retrain; the
            // record itself is already durable.
            let _ = notify.send(());
        }
        Ok(())
    }

    /// Number of records awaiting the next retrain.
    pub fn pending_samples(&self) -> Result<u64, PipelineError> {
        self.inner.pending_count()
    }

    /// Retrains immediately from the pending records.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Training`] when fewer than the configured
    /// minimum samples are pending or the store update fails.
    pub fn retrain_now(&self) -> Result<ModelInfo, PipelineError> {
        let info = self.inner.retrain()?;
        info!(version = %info.version, "manual retrain complete");
        Ok(info)
    }
}

impl Drop for FeedbackSink {
    fn drop(&mut self) {
        // Closing the channel stops the worker loop.
        drop(self.notify.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
