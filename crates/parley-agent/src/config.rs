//! Strategy and opponent-model configuration.
//!
//! Every field has a default so partial JSON documents deserialize:
//!
//! ```rust
//! use parley_agent::config::{StrategyConfig, NicenessSchedule};
//!
//! let config: StrategyConfig =
//!     serde_json::from_str(r#"{"concession_rate": 0.9, "niceness_schedule": "tightening"}"#).unwrap();
//! assert!((config.concession_rate - 0.9).abs() < f64::EPSILON);
//! assert_eq!(config.exploration_attempts, 100);
//! assert_eq!(config.niceness_schedule, NicenessSchedule::Tightening);
//! ```

use serde::{Deserialize, Serialize};

/// Which proposal the opponent model compares new proposals against when
/// adjusting issue weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum ReferencePolicy {
    /// Always the first proposal observed in the session.
    #[default]
    FixedFirst,
    /// The proposal observed just before the current one.
    MostRecent,
}

/// How the niceness margin evolves over a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum NicenessSchedule {
    /// The configured margin is used unchanged on every turn.
    #[default]
    Fixed,
    /// The margin shrinks linearly to zero at the deadline.
    Tightening,
}

impl NicenessSchedule {
    /// Own utility the search may give up at `progress`.
    #[must_use]
    pub fn margin_at(&self, margin: f64, progress: f64) -> f64 {
        match self {
            Self::Fixed => margin,
            Self::Tightening => margin * (1.0 - progress.clamp(0.0, 1.0)),
        }
    }
}

/// Opponent model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Weight moved onto an issue whose value did not change.
    pub increment: f64,
    /// Proposal used for the "did not change" comparison.
    pub reference_policy: ReferencePolicy,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            increment: 0.1,
            reference_policy: ReferencePolicy::FixedFirst,
        }
    }
}

/// Bidding and acceptance parameters, fixed for a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Utility below which no agreement is accepted. Overridden by the
    /// profile's reservation bid when it has one.
    pub reservation_utility: f64,
    /// Scales the acceptance threshold: below 1 concedes sooner, above 1 later.
    pub concession_rate: f64,
    /// Random draws per opponent-aware bid search.
    pub exploration_attempts: u32,
    /// Progress before which only maximum-utility bids are offered.
    pub early_phase_threshold: f64,
    /// Own utility the search may trade for opponent utility.
    pub niceness_margin: f64,
    /// How the niceness margin changes over the session.
    pub niceness_schedule: NicenessSchedule,
    /// Opponent model parameters.
    pub model: ModelConfig,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            reservation_utility: 0.0,
            concession_rate: 1.2,
            exploration_attempts: 100,
            early_phase_threshold: 0.1,
            niceness_margin: 0.05,
            niceness_schedule: NicenessSchedule::Fixed,
            model: ModelConfig::default(),
        }
    }
}

impl StrategyConfig {
    /// Checks that every parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns the first parameter found out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("reservation_utility", self.reservation_utility)?;
        check_unit("early_phase_threshold", self.early_phase_threshold)?;
        check_unit("niceness_margin", self.niceness_margin)?;
        if !self.concession_rate.is_finite() || self.concession_rate < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "concession_rate",
                value: self.concession_rate,
            });
        }
        if !self.model.increment.is_finite() || self.model.increment < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "model.increment",
                value: self.model.increment,
            });
        }
        Ok(())
    }
}

fn check_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}

/// Invalid configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A parameter is outside its admissible range.
    #[error("{field} = {value} is out of range")]
    OutOfRange {
        /// Parameter name.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },
}
