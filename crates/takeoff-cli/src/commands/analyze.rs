//! The `analyze` CLI subcommand -- runs one drawing through the pipeline.

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use takeoff_core::{AnalysisMode, AnalysisRequest};
use takeoff_pipeline::PipelineError;

use crate::commands::{build_pipeline, parse_industry_list, parse_region_list};
use crate::ExitCode;

// ---------------------------------------------------------------------------
// AnalyzeArgs
// ---------------------------------------------------------------------------

/// Analyze a drawing file for industry elements and compliance.
#[derive(Debug, clap::Args)]
pub struct AnalyzeArgs {
    /// Drawing file to analyze (.pdf, .dwg, .dxf, .stl, .stp, .step, .dgn).
    pub file: PathBuf,

    /// Industries to detect (comma-separated, e.g. "plumbing,electrical").
    #[arg(long, default_value = "plumbing")]
    pub industries: String,

    /// Compliance regions to check (comma-separated, e.g. "au,global").
    /// Omit to skip compliance checking.
    #[arg(long)]
    pub regions: Option<String>,

    /// Analysis mode: performance, accuracy, or balanced.
    #[arg(long)]
    pub mode: Option<String>,

    /// Output file path; omit to print to stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Disable result caching for this run.
    #[arg(long)]
    pub no_cache: bool,

    /// Enable verbose output.
    #[arg(long, short)]
    pub verbose: bool,

    /// Suppress all non-essential output.
    #[arg(long, short)]
    pub quiet: bool,
}

// ---------------------------------------------------------------------------
// execute
// ---------------------------------------------------------------------------

/// Executes the `analyze` subcommand.
pub fn execute(args: AnalyzeArgs) -> Result<ExitCode, anyhow::Error> {
    // Ignore the error if the subscriber is already set (e.g. in tests).
    let _ = takeoff_core::init_tracing(args.verbose, args.quiet, false);

    let config = takeoff_core::config::load_config(Some(std::path::Path::new(".")))
        .context("failed to load configuration")?;

    let industries = parse_industry_list(&args.industries);
    if industries.is_empty() {
        eprintln!("takeoff: no valid industries requested");
        return Ok(ExitCode::InvalidInput);
    }
    let regions = args.regions.as_deref().map(parse_region_list).unwrap_or_default();

    let mode = match &args.mode {
        Some(name) => match AnalysisMode::from_name(name) {
            Some(mode) => mode,
            None => {
                eprintln!("takeoff: unknown mode '{name}'");
                return Ok(ExitCode::InvalidInput);
            }
        },
        None => config.detection.default_mode,
    };

    let Some(extension) = args.file.extension().map(|e| e.to_string_lossy().to_string())
    else {
        eprintln!("takeoff: '{}' has no file extension", args.file.display());
        return Ok(ExitCode::InvalidInput);
    };
    let content = std::fs::read(&args.file)
        .with_context(|| format!("failed to read '{}'", args.file.display()))?;

    let mut request = AnalysisRequest::new(content, &extension, industries, regions, mode);
    if let Some(name) = args.file.file_name() {
        request = request.with_file_name(name.to_string_lossy());
    }

    let pipeline = build_pipeline(&config, args.no_cache)?;
    let result = match pipeline.analyze(&request) {
        Ok(result) => result,
        Err(PipelineError::InvalidInput(msg)) => {
            eprintln!("takeoff: invalid input: {msg}");
            return Ok(ExitCode::InvalidInput);
        }
        Err(e) => {
            eprintln!("takeoff: analysis failed: {e}");
            return Ok(ExitCode::AnalysisFailed);
        }
    };

    info!(
        elements = result.detection.total_elements(),
        partial = result.is_partial(),
        "analysis finished"
    );

    let json = serde_json::to_string_pretty(&result).context("failed to serialize result")?;
    if let Some(output_path) = &args.output {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create output directory '{}'", parent.display())
                })?;
            }
        }
        std::fs::write(output_path, &json)
            .with_context(|| format!("failed to write output to '{}'", output_path.display()))?;
        info!(path = %output_path.display(), "wrote analysis result");
    } else {
        println!("{json}");
    }

    Ok(ExitCode::Pass)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
