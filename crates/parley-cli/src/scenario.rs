//! Scenario files: one domain, two profiles, optional strategy settings.
//!
//! ```json
//! {
//!   "domain": { "name": "holiday", "issues": [ { "name": "color", "values": ["red", "blue"] } ] },
//!   "profiles": [
//!     { "issue_weights": { "color": 1.0 }, "value_utilities": { "color": { "red": 1.0, "blue": 0.0 } } },
//!     { "issue_weights": { "color": 1.0 }, "value_utilities": { "color": { "red": 0.0, "blue": 1.0 } } }
//!   ],
//!   "strategy": { "concession_rate": 1.0 }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use parley_agent::{Bid, Domain, LinearAdditiveProfile, StrategyConfig, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Profile description without its domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSpec {
    /// Weight of each issue.
    pub issue_weights: BTreeMap<String, f64>,
    /// Utility of each value, per issue.
    pub value_utilities: BTreeMap<String, BTreeMap<Value, f64>>,
    /// Optional reservation bid.
    #[serde(default)]
    pub reservation_bid: Option<Bid>,
}

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    domain: Domain,
    profiles: [ProfileSpec; 2],
    #[serde(default)]
    strategy: StrategyConfig,
}

/// A validated negotiation scenario.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Profile of the agent under test.
    pub agent: LinearAdditiveProfile,
    /// Profile of its opponent.
    pub opponent: LinearAdditiveProfile,
    /// Strategy settings for every strategy-driven party.
    pub strategy: StrategyConfig,
}

impl Scenario {
    /// Parses and validates a scenario from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a profile, the domain, or
    /// the strategy settings are invalid.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let file: ScenarioFile = serde_json::from_str(text).context("parsing scenario JSON")?;
        let [agent, opponent] = file.profiles;
        let agent = build_profile(&file.domain, agent).context("first profile")?;
        let opponent = build_profile(&file.domain, opponent).context("second profile")?;
        file.strategy.validate().context("strategy settings")?;
        Ok(Self {
            agent,
            opponent,
            strategy: file.strategy,
        })
    }

    /// Loads and validates a scenario file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let scenario =
            Self::from_json(&text).with_context(|| format!("loading {}", path.display()))?;
        debug!(
            path = %path.display(),
            domain = %scenario.agent.domain.name,
            issues = scenario.agent.domain.issue_count(),
            "scenario loaded"
        );
        Ok(scenario)
    }

    /// The shared domain.
    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.agent.domain
    }
}

fn build_profile(domain: &Domain, profile: ProfileSpec) -> anyhow::Result<LinearAdditiveProfile> {
    Ok(LinearAdditiveProfile::new(
        domain.clone(),
        profile.issue_weights,
        profile.value_utilities,
        profile.reservation_bid,
    )?)
}
