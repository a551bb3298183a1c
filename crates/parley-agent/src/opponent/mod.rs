//! Frequency-based opponent preference model.
//!
//! The model learns two things from the opponent's proposals:
//!
//! - **Issue weights**: an issue whose value keeps matching the reference
//!   proposal gains weight, every other issue loses a share of it. The
//!   weights are plain numbers, never renormalised or clamped.
//! - **Value frequencies**: per issue, how often each value is proposed,
//!   kept as a running average whose denominator only grows while the
//!   observed value is already saturated at frequency 1.
//!
//! Frequencies are stored as integer tallies over the issue's observation
//! count. `tally / count` equals the running average exactly.

use tracing::trace;

use crate::config::{ModelConfig, ReferencePolicy};
use crate::domain::{Bid, Domain, Value};


/// Errors raised by the opponent model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Nothing has been observed yet.
    #[error("no opponent proposal has been observed yet")]
    NoHistory,
    /// A proposal lacks a value for a domain issue.
    #[error("proposal has no value for issue '{issue}'")]
    MissingValue {
        /// Issue without a value.
        issue: String,
    },
    /// A proposal mentions an issue the domain does not have.
    #[error("issue '{issue}' is not part of the domain")]
    UnknownIssue {
        /// Foreign issue name.
        issue: String,
    },
    /// A proposal uses a value the issue does not admit.
    #[error("value '{value}' is not admissible for issue '{issue}'")]
    UnknownValue {
        /// Issue name.
        issue: String,
        /// Rejected value.
        value: Value,
    },
}

/// Per-issue statistics.
#[derive(Debug, Clone)]
struct IssueStats {
    name: String,
    weight: f64,
    values: Vec<Value>,
    tallies: Vec<u32>,
    count: u32,
}

impl IssueStats {
    fn position(&self, value: &Value) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    fn frequency_at(&self, index: usize) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        f64::from(self.tallies[index]) / f64::from(self.count)
    }

    fn reset(&mut self, weight: f64) {
        self.weight = weight;
        self.tallies.iter_mut().for_each(|t| *t = 0);
        self.count = 0;
    }

    /// Running-average update for an observed value.
    ///
    /// `freq[u] = (freq[u] * m + [u == v]) / (m + r)` where `r` is 1 only when
    /// `v` is already at frequency 1. An issue never observed (`m == 0`) also
    /// takes `r = 1`.
    fn record(&mut self, index: usize) {
        let saturated = self.count == 0 || self.tallies[index] == self.count;
        self.tallies[index] += 1;
        if saturated {
            self.count += 1;
        }
    }

    /// Index of the most frequent value; the first declared value wins ties.
    fn most_frequent(&self) -> usize {
        let mut best = 0;
        for (index, tally) in self.tallies.iter().enumerate() {
            if *tally > self.tallies[best] {
                best = index;
            }
        }
        best
    }
}

/// Online estimate of the opponent's preferences.
///
/// One instance belongs to exactly one negotiation session.
#[derive(Debug, Clone)]
pub struct FrequencyModel {
    config: ModelConfig,
    issues: Vec<IssueStats>,
    reference: Option<Bid>,
    observations: u64,
}

impl FrequencyModel {
    /// Creates an empty model over a domain.
    #[must_use]
    pub fn new(domain: &Domain, config: ModelConfig) -> Self {
        let uniform = 1.0 / domain.issue_count().max(1) as f64;
        let issues = domain
            .issues
            .iter()
            .map(|issue| IssueStats {
                name: issue.name.clone(),
                weight: uniform,
                values: issue.values.clone(),
                tallies: vec![0; issue.values.len()],
                count: 0,
            })
            .collect();
        Self {
            config,
            issues,
            reference: None,
            observations: 0,
        }
    }

    /// Ingests one opponent proposal.
    ///
    /// The first proposal initialises the tables and becomes the reference.
    /// Later proposals must cover every domain issue. A rejected proposal
    /// leaves the model unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownIssue`] or [`ModelError::UnknownValue`]
    /// for values outside the domain, and [`ModelError::MissingValue`] for an
    /// incomplete proposal (or an empty first proposal).
    pub fn observe(&mut self, bid: &Bid) -> Result<(), ModelError> {
        let positions = self.resolve(bid)?;

        if self.reference.is_none() {
            self.initialize(&positions);
            self.reference = Some(bid.clone());
            self.observations = 1;
            trace!(issues = bid.len(), "opponent model initialised");
            return Ok(());
        }

        let reference = self.reference.as_ref().ok_or(ModelError::NoHistory)?;
        let stable: Vec<bool> = self
            .issues
            .iter()
            .map(|stats| reference.value(&stats.name) == bid.value(&stats.name))
            .collect();
        self.adjust_weights(&stable);

        for (stats, position) in self.issues.iter_mut().zip(&positions) {
            if let Some(index) = position {
                stats.record(*index);
            }
        }

        if self.config.reference_policy == ReferencePolicy::MostRecent {
            self.reference = Some(bid.clone());
        }
        self.observations += 1;
        trace!(
            observations = self.observations,
            stable = stable.iter().filter(|s| **s).count(),
            "opponent proposal observed"
        );
        Ok(())
    }

    /// The opponent's most likely proposal: per issue, the most frequent value.
    ///
    /// Ties go to the value declared first in the domain.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NoHistory`] before the first observation.
    pub fn predict(&self) -> Result<Bid, ModelError> {
        if !self.has_history() {
            return Err(ModelError::NoHistory);
        }
        Ok(Bid::new(self.issues.iter().map(|stats| {
            (
                stats.name.as_str(),
                stats.values[stats.most_frequent()].clone(),
            )
        })))
    }

    /// Estimated opponent utility: `Σ weight[issue] * freq[issue][value]`
    /// over the issues present in `bid`.
    ///
    /// The scale is meaningless; only comparisons under one model state are.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NoHistory`] before the first observation, or an
    /// error if `bid` uses an issue or value outside the domain.
    pub fn estimate_utility(&self, bid: &Bid) -> Result<f64, ModelError> {
        if !self.has_history() {
            return Err(ModelError::NoHistory);
        }
        let mut total = 0.0;
        for (issue, value) in bid.iter() {
            let stats = self.stats(issue)?;
            let index = stats
                .position(value)
                .ok_or_else(|| ModelError::UnknownValue {
                    issue: issue.to_string(),
                    value: value.clone(),
                })?;
            total += stats.weight * stats.frequency_at(index);
        }
        Ok(total)
    }

    /// Returns true once a proposal has been observed.
    #[must_use]
    pub fn has_history(&self) -> bool {
        self.reference.is_some()
    }

    /// Number of proposals observed.
    #[must_use]
    pub fn observations(&self) -> u64 {
        self.observations
    }

    /// Proposal new proposals are compared against.
    #[must_use]
    pub fn reference(&self) -> Option<&Bid> {
        self.reference.as_ref()
    }

    /// Current weight of an issue.
    #[must_use]
    pub fn weight(&self, issue: &str) -> Option<f64> {
        self.stats(issue).ok().map(|stats| stats.weight)
    }

    /// Current frequency of a value.
    #[must_use]
    pub fn frequency(&self, issue: &str, value: &Value) -> Option<f64> {
        let stats = self.stats(issue).ok()?;
        stats.position(value).map(|index| stats.frequency_at(index))
    }

    /// Running-average denominator of an issue.
    #[must_use]
    pub fn observation_count(&self, issue: &str) -> Option<u32> {
        self.stats(issue).ok().map(|stats| stats.count)
    }

    /// Issue weights in domain order.
    pub fn weights(&self) -> impl Iterator<Item = (&str, f64)> {
        self.issues
            .iter()
            .map(|stats| (stats.name.as_str(), stats.weight))
    }

    /// Model configuration.
    #[must_use]
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn stats(&self, issue: &str) -> Result<&IssueStats, ModelError> {
        self.issues
            .iter()
            .find(|stats| stats.name == issue)
            .ok_or_else(|| ModelError::UnknownIssue {
                issue: issue.to_string(),
            })
    }

    /// Maps a proposal onto value indices, one slot per domain issue.
    fn resolve(&self, bid: &Bid) -> Result<Vec<Option<usize>>, ModelError> {
        for issue in bid.issues() {
            self.stats(issue)?;
        }
        let first = self.reference.is_none();
        if first && bid.is_empty() {
            return Err(ModelError::MissingValue {
                issue: self
                    .issues
                    .first()
                    .map(|stats| stats.name.clone())
                    .unwrap_or_default(),
            });
        }

        self.issues
            .iter()
            .map(|stats| match bid.value(&stats.name) {
                Some(value) => stats
                    .position(value)
                    .map(Some)
                    .ok_or_else(|| ModelError::UnknownValue {
                        issue: stats.name.clone(),
                        value: value.clone(),
                    }),
                None if first => Ok(None),
                None => Err(ModelError::MissingValue {
                    issue: stats.name.clone(),
                }),
            })
            .collect()
    }

    fn initialize(&mut self, positions: &[Option<usize>]) {
        let uniform = 1.0 / self.issues.len() as f64;
        let present = positions.iter().flatten().count();
        let share = 1.0 / present as f64;
        for (stats, position) in self.issues.iter_mut().zip(positions) {
            stats.reset(uniform);
            if let Some(index) = position {
                stats.weight = share;
                stats.tallies[*index] = 1;
                stats.count = 1;
            }
        }
    }

    /// Moves weight towards every issue whose value held still.
    fn adjust_weights(&mut self, stable: &[bool]) {
        let increment = self.config.increment;
        let share = increment / self.issues.len() as f64;
        for (held, _) in stable.iter().enumerate().filter(|(_, s)| **s) {
            for (index, stats) in self.issues.iter_mut().enumerate() {
                if index == held {
                    stats.weight += increment;
                } else {
                    stats.weight -= share;
                }
            }
        }
    }
}
