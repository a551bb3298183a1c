//! Error types for parley-agent.

use thiserror::Error;

use crate::config::ConfigError;
use crate::opponent::ModelError;
use crate::session::SessionPhase;

/// Errors that can occur while negotiating.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    /// The opponent model rejected a proposal or estimate request.
    #[error("opponent model: {0}")]
    Model(#[from] ModelError),

    /// The strategy configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The bid sampler has no maximum-utility bid to offer.
    #[error("bid space has no maximum-utility bid")]
    EmptyBidSpace,

    /// A turn was requested after the session ended.
    #[error("session is closed ({phase:?})")]
    SessionClosed {
        /// Terminal phase the session is in.
        phase: SessionPhase,
    },

    /// A turn was requested while the session waits for the opponent.
    #[error("no opponent proposal to respond to ({phase:?})")]
    InvalidTransition {
        /// Phase the session is in.
        phase: SessionPhase,
    },

    /// Progress is not a number in `[0, 1]` or went backwards.
    #[error("invalid progress {progress}")]
    InvalidProgress {
        /// Rejected progress value.
        progress: f64,
    },
}
