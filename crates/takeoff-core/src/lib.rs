//! Takeoff Core -- shared types, fingerprinting, configuration, and the
//! error taxonomy for the Takeoff drawing-analysis pipeline.
//!
//! This crate defines the value types exchanged between the cache, the
//! format normalizer, the detection orchestrator, and the feedback sink:
//! industries, compliance regions, analysis modes, requests, results, and
//! the content fingerprint used as the cache key.

pub mod config;
pub mod fingerprint;
pub mod request;
pub mod result;
pub mod types;

pub use fingerprint::Fingerprint;
pub use request::AnalysisRequest;
pub use result::AnalysisResult;
pub use types::{AnalysisMode, Industry, Region, Severity};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Top-level error type for the takeoff-core crate.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An I/O error occurred during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The request is malformed or references an unsupported file type.
    /// Rejected at the boundary, before any cache interaction.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Tracing/logging initialization failed.
    #[error("tracing initialization error: {0}")]
    TracingInit(String),
}

/// Convenience alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

// ---------------------------------------------------------------------------
// Tracing / Logging
// ---------------------------------------------------------------------------

/// Initialize structured tracing with the given verbosity level.
///
/// # Behaviour
///
/// | `verbose` | `quiet` | `json_output` | Effect                            |
/// |-----------|---------|---------------|-----------------------------------|
/// | `true`    | _       | _             | TRACE level (most verbose)        |
/// | _         | `true`  | _             | ERROR level only                  |
/// | `false`   | `false` | _             | INFO level (default)              |
/// | _         | _       | `true`        | JSON-formatted log lines (CI/CD)  |
/// | _         | _       | `false`       | Human-readable, compact log lines |
///
/// The `RUST_LOG` environment variable, when set, takes precedence over the
/// programmatic level selection so that operators can fine-tune per-module
/// verbosity without recompiling.
///
/// # Errors
///
/// Returns [`CoreError::TracingInit`] if the global subscriber has already
/// been set (i.e. this function was called more than once in the same
/// process).
pub fn init_tracing(verbose: bool, quiet: bool, json_output: bool) -> Result<(), CoreError> {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose {
        "trace"
    } else if quiet {
        "error"
    } else {
        "info"
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_output {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .try_init()
            .map_err(|e| CoreError::TracingInit(e.to_string()))
    } else {
        fmt()
            .compact()
            .with_env_filter(env_filter)
            .with_target(true)
            .try_init()
            .map_err(|e| CoreError::TracingInit(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
