//! CLI errors and exit codes.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Bad input (unreadable files, malformed tables, invalid configuration,
//!   missing metadata)
//! - 2: Numerical failure (solver breakdown, degenerate geometry)

use headkin_core::types::ErrorKind;
use headkin_core::{ConfigError, PreprocessError};
use std::process::ExitCode;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write output: {0}")]
    Output(String),

    #[error("{failed} of {total} files failed; first error: {first}")]
    Batch {
        failed: usize,
        total: usize,
        first: PreprocessError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CliExitCode {
    Success = 0,
    InputError = 1,
    NumericalError = 2,
}

impl From<CliExitCode> for ExitCode {
    fn from(code: CliExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<&PreprocessError> for CliExitCode {
    fn from(err: &PreprocessError) -> Self {
        match err.kind() {
            ErrorKind::Numerical | ErrorKind::DegenerateGeometry => CliExitCode::NumericalError,
            ErrorKind::Validation | ErrorKind::Io => CliExitCode::InputError,
        }
    }
}

impl From<&CliError> for CliExitCode {
    fn from(err: &CliError) -> Self {
        match err {
            CliError::Preprocess(e) => CliExitCode::from(e),
            CliError::Batch { first, .. } => CliExitCode::from(first),
            CliError::Config(_) | CliError::Output(_) => CliExitCode::InputError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let solver = CliError::from(PreprocessError::SolverFailure("step underflow".into()));
        assert_eq!(CliExitCode::from(&solver), CliExitCode::NumericalError);

        let zero = CliError::from(PreprocessError::ZeroNorm("peak".into()));
        assert_eq!(CliExitCode::from(&zero), CliExitCode::NumericalError);

        let parse = CliError::from(PreprocessError::Parse("bad row".into()));
        assert_eq!(CliExitCode::from(&parse), CliExitCode::InputError);

        let config = CliError::from(ConfigError::ValidationError("x".into()));
        assert_eq!(CliExitCode::from(&config), CliExitCode::InputError);

        let batch = CliError::Batch {
            failed: 1,
            total: 3,
            first: PreprocessError::SolverFailure("x".into()),
        };
        assert_eq!(CliExitCode::from(&batch), CliExitCode::NumericalError);
        assert!(batch.to_string().starts_with("1 of 3 files failed"));
    }
}
