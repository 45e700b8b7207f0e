//! The `model` CLI subcommand -- model metadata and manual retraining.

use anyhow::Context;
use tracing::info;

use crate::commands::{open_feedback_sink, open_training_store};
use crate::ExitCode;

// ---------------------------------------------------------------------------
// ModelArgs
// ---------------------------------------------------------------------------

/// Show model metadata or retrain from collected feedback.
#[derive(Debug, clap::Args)]
pub struct ModelArgs {
    /// Retrain the model from pending feedback records.
    #[arg(long)]
    pub retrain: bool,
}

// ---------------------------------------------------------------------------
// execute
// ---------------------------------------------------------------------------

/// Executes the `model` subcommand.
pub fn execute(args: ModelArgs) -> Result<ExitCode, anyhow::Error> {
    let config = takeoff_core::config::load_config(Some(std::path::Path::new(".")))
        .context("failed to load configuration")?;
    let training = open_training_store(&config)?;

    if args.retrain {
        let sink = open_feedback_sink(&config, training)?;
        match sink.retrain_now() {
            Ok(info) => {
                info!(version = %info.version, "retrain complete");
                println!("{}", serde_json::to_string_pretty(&info)?);
                Ok(ExitCode::Pass)
            }
            Err(e) => {
                eprintln!("takeoff: retrain failed: {e}");
                Ok(ExitCode::AnalysisFailed)
            }
        }
    } else {
        let info = training.model_info().context("failed to read model info")?;
        println!("{}", serde_json::to_string_pretty(&info)?);
        Ok(ExitCode::Pass)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_model_info_succeeds() {
        let code = execute(ModelArgs { retrain: false }).unwrap();
        assert_eq!(code, ExitCode::Pass);
    }

    #[test]
    fn retrain_without_samples_fails_cleanly() {
        let code = execute(ModelArgs { retrain: true }).unwrap();
        assert_eq!(code, ExitCode::AnalysisFailed);
    }
}
