//! Exit codes and structured error output.

use serde::Serialize;

/// Exit codes for the dupwalk binary.
///
/// - 0: Success (report printed, or run cancelled with Ctrl+C)
/// - 1: General error (a stage failed or the setup was invalid)
///
/// Cancellation is a clean quit: everything logged so far is kept and the
/// next run resumes from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// The run finished or was cancelled cleanly.
    Success = 0,
    /// An error stopped the run.
    GeneralError = 1,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DW000",
            Self::GeneralError => "DW001",
        }
    }
}

/// Error information for `--output json`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DW001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
}

impl StructuredError {
    /// Build from an anyhow error and the exit code it maps to.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::GeneralError.as_i32(), 1);
        assert_eq!(ExitCode::GeneralError.code_prefix(), "DW001");
    }

    #[test]
    fn test_structured_error_includes_context() {
        let err = anyhow::anyhow!("disk gone").context("hashing failed");
        let structured = StructuredError::new(&err, ExitCode::GeneralError);
        assert_eq!(structured.code, "DW001");
        assert_eq!(structured.message, "hashing failed: disk gone");
    }
}
