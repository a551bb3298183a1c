//! Scenario validation command.
//!
//! Loads a scenario and describes its bid space without negotiating.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parley_agent::{BidSampler, LinearBidSpace, UtilityProfile};

use crate::error::CliError;
use crate::output::{IssueReport, OutputFormat, ScenarioReport};
use crate::scenario::Scenario;

/// Validate command executor.
pub struct ValidateCommand {
    scenario: PathBuf,
}

impl ValidateCommand {
    /// Create a new validate command for a scenario file.
    #[must_use]
    pub fn new(scenario: impl Into<PathBuf>) -> Self {
        Self {
            scenario: scenario.into(),
        }
    }

    /// Path of the scenario file.
    #[must_use]
    pub fn scenario(&self) -> &Path {
        &self.scenario
    }

    /// Execute the validate command.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario is invalid or output fails.
    pub fn execute<W: Write>(&self, writer: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let scenario = Scenario::load(&self.scenario)?;
        format.write(writer, &report(&scenario))?;
        Ok(())
    }
}

/// Describe a loaded scenario.
#[must_use]
pub fn report(scenario: &Scenario) -> ScenarioReport {
    let domain = scenario.domain();
    let weight = |weights: &BTreeMap<String, f64>, issue: &str| {
        weights.get(issue).copied().unwrap_or_default()
    };
    let issues = domain
        .issues
        .iter()
        .map(|issue| IssueReport {
            name: issue.name.clone(),
            values: issue.values.len(),
            agent_weight: weight(&scenario.agent.issue_weights, &issue.name),
            opponent_weight: weight(&scenario.opponent.issue_weights, &issue.name),
        })
        .collect();

    ScenarioReport {
        domain: domain.name.clone(),
        size: domain.size(),
        issues,
        agent_best_bids: LinearBidSpace::new(&scenario.agent).max_utility_bids().to_vec(),
        agent_reservation: reservation_utility(&scenario.agent),
        opponent_reservation: reservation_utility(&scenario.opponent),
    }
}

fn reservation_utility<P: UtilityProfile>(profile: &P) -> Option<f64> {
    profile.reservation_bid().map(|bid| profile.utility(bid))
}
