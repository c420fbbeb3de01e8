//! CLI error types.

use hive_alerts::AlertError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// An input file could not be read or parsed.
    #[error("input error: {0}")]
    Input(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Command execution failed.
    #[error("command error: {0}")]
    Command(String),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// The alert engine rejected an operation.
    #[error(transparent)]
    Engine(#[from] AlertError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
