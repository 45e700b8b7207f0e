//! Takeoff CLI -- command-line interface for the drawing-analysis pipeline.
//!
//! This crate provides the CLI entry point, argument parsing, exit code
//! definitions, and the wiring that ties together the cache, the format
//! normalizer, the detection orchestrator, compliance checking, and the
//! feedback sink.

use std::fmt;

pub mod commands;

// ---------------------------------------------------------------------------
// Exit Codes
// ---------------------------------------------------------------------------

/// Takeoff process exit codes.
///
/// These exit codes allow scripts and CI jobs to distinguish termination
/// reasons without parsing output.
///
/// | Code | Meaning                                        |
/// |------|------------------------------------------------|
/// | 0    | Command completed successfully                 |
/// | 1    | Analysis or pipeline operation failed          |
/// | 2    | Invalid input (bad file, options, or feedback) |
/// | 3    | Configuration error                            |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExitCode {
    /// Command completed successfully.
    Pass = 0,
    /// Analysis or pipeline operation failed.
    AnalysisFailed = 1,
    /// Invalid input (bad file, options, or feedback).
    InvalidInput = 2,
    /// Configuration error (missing config, invalid YAML).
    ConfigError = 3,
}

impl ExitCode {
    /// Returns the numeric exit code as a `u8`.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns all exit code variants.
    #[must_use]
    pub const fn all() -> &'static [ExitCode] {
        &[
            Self::Pass,
            Self::AnalysisFailed,
            Self::InvalidInput,
            Self::ConfigError,
        ]
    }

    /// Returns a human-readable description of this exit code.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Pass => "command completed successfully",
            Self::AnalysisFailed => "analysis or pipeline operation failed",
            Self::InvalidInput => "invalid input (bad file, options, or feedback)",
            Self::ConfigError => "configuration error (missing config, invalid YAML)",
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exit code {} ({})", self.as_u8(), self.description())
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_u8())
    }
}

/// Terminate the process with the given [`ExitCode`].
///
/// Logs the exit reason (info for [`ExitCode::Pass`], error otherwise) and
/// returns the corresponding [`std::process::ExitCode`] suitable for use as
/// a `main` return value.
pub fn terminate(code: ExitCode) -> std::process::ExitCode {
    match code {
        ExitCode::Pass => {
            tracing::info!(%code, "takeoff exiting");
        }
        _ => {
            tracing::error!(%code, "takeoff exiting with error");
        }
    }
    code.into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_numeric_values() {
        assert_eq!(ExitCode::Pass.as_u8(), 0);
        assert_eq!(ExitCode::AnalysisFailed.as_u8(), 1);
        assert_eq!(ExitCode::InvalidInput.as_u8(), 2);
        assert_eq!(ExitCode::ConfigError.as_u8(), 3);
    }

    #[test]
    fn exit_code_display() {
        let display = ExitCode::Pass.to_string();
        assert!(display.contains("0"));
        assert!(display.contains("successfully"));

        let display = ExitCode::InvalidInput.to_string();
        assert!(display.contains("2"));
        assert!(display.contains("invalid input"));
    }

    #[test]
    fn exit_code_all_variants() {
        let all = ExitCode::all();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0], ExitCode::Pass);
        assert_eq!(all[3], ExitCode::ConfigError);
    }

    #[test]
    fn exit_code_descriptions_non_empty() {
        for code in ExitCode::all() {
            assert!(!code.description().is_empty());
        }
    }

    #[test]
    fn terminate_returns_process_exit_code() {
        let _ = terminate(ExitCode::Pass);
        let _ = terminate(ExitCode::AnalysisFailed);
    }
}
