//! CLI error types.

use parley_agent::AgentError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Scenario file could not be loaded or is inconsistent.
    #[error("scenario error: {0}")]
    Scenario(String),
    /// A negotiation session failed.
    #[error("negotiation error: {0}")]
    Negotiation(#[from] AgentError),
    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A session worker panicked or was cancelled.
    #[error("session worker failed: {0}")]
    Worker(String),
    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        Self::Scenario(format!("{err:#}"))
    }
}
