//! The `feedback` CLI subcommand -- submits one detection correction.

use anyhow::Context;
use tracing::info;

use takeoff_pipeline::{FeedbackCategory, FeedbackRecord, PipelineError};

use crate::commands::{open_feedback_sink, open_training_store};
use crate::ExitCode;

// ---------------------------------------------------------------------------
// FeedbackArgs
// ---------------------------------------------------------------------------

/// Submit a correction to a detection result.
#[derive(Debug, clap::Args)]
pub struct FeedbackArgs {
    /// Identifier of the analyzed file the correction refers to.
    #[arg(long)]
    pub file_id: String,

    /// Identifier of the corrected element, e.g. "plumbing-12" or "clash-3".
    #[arg(long)]
    pub element_id: String,

    /// The value the detector originally reported.
    #[arg(long)]
    pub original: String,

    /// The corrected value.
    #[arg(long)]
    pub corrected: String,

    /// Correction category: false_positive, false_negative, wrong_type,
    /// or wrong_attribute.
    #[arg(long)]
    pub category: String,
}

fn parse_category(name: &str) -> Option<FeedbackCategory> {
    match name.trim().to_lowercase().as_str() {
        "false_positive" => Some(FeedbackCategory::FalsePositive),
        "false_negative" => Some(FeedbackCategory::FalseNegative),
        "wrong_type" => Some(FeedbackCategory::WrongType),
        "wrong_attribute" => Some(FeedbackCategory::WrongAttribute),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// execute
// ---------------------------------------------------------------------------

/// Executes the `feedback` subcommand.
pub fn execute(args: FeedbackArgs) -> Result<ExitCode, anyhow::Error> {
    let config = takeoff_core::config::load_config(Some(std::path::Path::new(".")))
        .context("failed to load configuration")?;
    if !config.training.collect_feedback {
        eprintln!("takeoff: feedback collection is disabled in configuration");
        return Ok(ExitCode::ConfigError);
    }

    let Some(category) = parse_category(&args.category) else {
        eprintln!("takeoff: unknown feedback category '{}'", args.category);
        return Ok(ExitCode::InvalidInput);
    };

    let record = FeedbackRecord {
        file_id: args.file_id,
        element_id: args.element_id,
        original: args.original,
        corrected: args.corrected,
        category,
    };

    let sink = open_feedback_sink(&config, open_training_store(&config)?)?;
    match sink.submit(&record) {
        Ok(()) => {
            let pending = sink.pending_samples().unwrap_or(0);
            info!(element = %record.element_id, pending, "feedback recorded");
            println!("Feedback recorded ({pending} pending samples).");
            Ok(ExitCode::Pass)
        }
        Err(PipelineError::InvalidFeedback(msg)) => {
            eprintln!("takeoff: invalid feedback: {msg}");
            Ok(ExitCode::InvalidInput)
        }
        Err(e) => Err(e).context("failed to record feedback"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_category_known_names() {
        assert_eq!(
            parse_category("false_positive"),
            Some(FeedbackCategory::FalsePositive)
        );
        assert_eq!(
            parse_category("WRONG_TYPE"),
            Some(FeedbackCategory::WrongType)
        );
    }

    #[test]
    fn parse_category_unknown() {
        assert_eq!(parse_category("typo"), None);
        assert_eq!(parse_category(""), None);
    }

    #[test]
    fn unknown_category_is_invalid_input() {
        let code = execute(FeedbackArgs {
            file_id: "drawing-1".to_string(),
            element_id: "plumbing-1".to_string(),
            original: "pipe".to_string(),
            corrected: "valve".to_string(),
            category: "bogus".to_string(),
        })
        .unwrap();
        assert_eq!(code, ExitCode::InvalidInput);
    }
}
