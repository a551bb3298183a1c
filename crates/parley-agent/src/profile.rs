//! Own-utility profiles.
//!
//! The strategy only talks to [`UtilityProfile`]. [`LinearAdditiveProfile`]
//! is the concrete profile the harness and tests use.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Bid, Domain, DomainError, Value};

/// Tolerance used when checking that issue weights sum to one.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// This agent's private preferences over a domain.
pub trait UtilityProfile {
    /// The domain the profile is defined over.
    fn domain(&self) -> &Domain;

    /// Own utility of a bid, in `[0, 1]`.
    fn utility(&self, bid: &Bid) -> f64;

    /// The bid whose utility is the walk-away point, if any.
    fn reservation_bid(&self) -> Option<&Bid>;
}

/// Utility as a weighted sum of per-issue value utilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearAdditiveProfile {
    /// Domain the profile applies to.
    pub domain: Domain,
    /// Weight of each issue; weights sum to one.
    pub issue_weights: BTreeMap<String, f64>,
    /// Per issue, utility of each value in `[0, 1]`.
    pub value_utilities: BTreeMap<String, BTreeMap<Value, f64>>,
    /// Optional reservation bid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_bid: Option<Bid>,
}

impl LinearAdditiveProfile {
    /// Builds and validates a profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile is inconsistent with its domain.
    pub fn new(
        domain: Domain,
        issue_weights: BTreeMap<String, f64>,
        value_utilities: BTreeMap<String, BTreeMap<Value, f64>>,
        reservation_bid: Option<Bid>,
    ) -> Result<Self, ProfileError> {
        let profile = Self {
            domain,
            issue_weights,
            value_utilities,
            reservation_bid,
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Checks the profile against its domain.
    ///
    /// # Errors
    ///
    /// Returns an error if an issue is missing a weight or value utility,
    /// a number is out of range, weights do not sum to one, or the
    /// reservation bid is not a complete bid of the domain.
    pub fn validate(&self) -> Result<(), ProfileError> {
        self.domain.validate()?;

        let mut total = 0.0;
        for issue in &self.domain.issues {
            let weight = *self
                .issue_weights
                .get(&issue.name)
                .ok_or_else(|| ProfileError::MissingWeight(issue.name.clone()))?;
            if !(0.0..=1.0).contains(&weight) {
                return Err(ProfileError::OutOfRange {
                    what: format!("weight of '{}'", issue.name),
                    value: weight,
                });
            }
            total += weight;

            let utilities = self.value_utilities.get(&issue.name);
            for value in &issue.values {
                let utility = utilities.and_then(|u| u.get(value)).ok_or_else(|| {
                    ProfileError::MissingValueUtility {
                        issue: issue.name.clone(),
                        value: value.clone(),
                    }
                })?;
                if !(0.0..=1.0).contains(utility) {
                    return Err(ProfileError::OutOfRange {
                        what: format!("utility of '{}' = '{value}'", issue.name),
                        value: *utility,
                    });
                }
            }
        }
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ProfileError::WeightSum(total));
        }

        if let Some(bid) = &self.reservation_bid {
            if !self.domain.is_complete(bid) {
                return Err(ProfileError::InvalidReservation(bid.to_string()));
            }
        }
        Ok(())
    }

    /// Utility contributed by one issue/value pair, weight included.
    #[must_use]
    pub fn weighted_value_utility(&self, issue: &str, value: &Value) -> f64 {
        let weight = self.issue_weights.get(issue).copied().unwrap_or(0.0);
        let utility = self
            .value_utilities
            .get(issue)
            .and_then(|u| u.get(value))
            .copied()
            .unwrap_or(0.0);
        weight * utility
    }
}

impl UtilityProfile for LinearAdditiveProfile {
    fn domain(&self) -> &Domain {
        &self.domain
    }

    fn utility(&self, bid: &Bid) -> f64 {
        bid.iter()
            .map(|(issue, value)| self.weighted_value_utility(issue, value))
            .sum()
    }

    fn reservation_bid(&self) -> Option<&Bid> {
        self.reservation_bid.as_ref()
    }
}

/// Errors in a profile description.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
    /// The underlying domain is malformed.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// An issue has no weight.
    #[error("issue '{0}' has no weight")]
    MissingWeight(String),
    /// A value has no utility.
    #[error("value '{value}' of issue '{issue}' has no utility")]
    MissingValueUtility {
        /// Issue name.
        issue: String,
        /// Value without utility.
        value: Value,
    },
    /// A weight or utility lies outside `[0, 1]`.
    #[error("{what} is {value}, expected a number in [0, 1]")]
    OutOfRange {
        /// Description of the number.
        what: String,
        /// The offending number.
        value: f64,
    },
    /// Issue weights do not sum to one.
    #[error("issue weights sum to {0}, expected 1")]
    WeightSum(f64),
    /// Reservation bid is not a complete bid of the domain.
    #[error("reservation bid {0} is not a complete bid")]
    InvalidReservation(String),
}
