//! Bidding and acceptance strategy.
//!
//! Acceptance follows a linear, deadline-driven concession: an opponent
//! proposal is accepted once its own utility beats both the reservation
//! utility and `concession_rate * (1 - progress) * own(counter)`.
//!
//! Bidding runs in two phases:
//!
//! 1. Before `early_phase_threshold`, offer a maximum-utility bid (ties
//!    broken uniformly at random).
//! 2. Afterwards, start from such a bid and run a bounded random search that
//!    gives up at most the niceness margin of own utility per step in
//!    exchange for a bid the opponent model rates at least as high.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::StrategyConfig;
use crate::domain::Bid;
use crate::error::AgentError;
use crate::opponent::{FrequencyModel, ModelError};
use crate::profile::UtilityProfile;
use crate::sampler::BidSampler;

/// What the agent does on its turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "bid", rename_all = "snake_case")]
pub enum Action {
    /// Accept the opponent's last proposal.
    Accept(Bid),
    /// Propose a bid.
    Offer(Bid),
}

impl Action {
    /// The bid accepted or offered.
    #[must_use]
    pub const fn bid(&self) -> &Bid {
        match self {
            Self::Accept(bid) | Self::Offer(bid) => bid,
        }
    }

    /// Returns true if this is an Accept action.
    #[must_use]
    pub const fn is_accept(&self) -> bool {
        matches!(self, Self::Accept(_))
    }

    /// Returns true if this is an Offer action.
    #[must_use]
    pub const fn is_offer(&self) -> bool {
        matches!(self, Self::Offer(_))
    }
}

/// Outcome of [`NegotiationStrategy::decide`], with the numbers behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnDecision {
    /// Action to send.
    pub action: Action,
    /// Acceptance threshold in force this turn.
    pub threshold: f64,
    /// Own utility of the counter-offer.
    pub counter_utility: f64,
    /// Own utility of the opponent's proposal, if there was one.
    pub received_utility: Option<f64>,
}

/// Deadline-aware bidding and acceptance.
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiationStrategy {
    config: StrategyConfig,
}

impl NegotiationStrategy {
    /// Creates a strategy from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if the configuration is out of range.
    pub fn new(config: StrategyConfig) -> Result<Self, AgentError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Replaces the reservation utility.
    #[must_use]
    pub fn with_reservation_utility(mut self, utility: f64) -> Self {
        self.config.reservation_utility = utility;
        self
    }

    /// Strategy configuration.
    #[must_use]
    pub const fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Own utility an opponent proposal must exceed at `progress`.
    ///
    /// Linear in `1 - progress`, so it is zero at the deadline.
    #[must_use]
    pub fn acceptance_threshold(&self, counter_utility: f64, progress: f64) -> f64 {
        self.config.concession_rate * (1.0 - progress) * counter_utility
    }

    /// Returns true if `received` should be accepted rather than countered
    /// with `counter`. A missing proposal is never acceptable.
    pub fn is_acceptable<P: UtilityProfile>(
        &self,
        profile: &P,
        received: Option<&Bid>,
        counter: &Bid,
        progress: f64,
    ) -> bool {
        let Some(received) = received else {
            return false;
        };
        let utility = profile.utility(received);
        let threshold = self.acceptance_threshold(profile.utility(counter), progress);
        utility > self.config.reservation_utility && utility > threshold
    }

    /// A maximum-utility bid, chosen uniformly among ties.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EmptyBidSpace`] if the sampler has none.
    pub fn anchor_bid<S, R>(&self, sampler: &S, rng: &mut R) -> Result<Bid, AgentError>
    where
        S: BidSampler,
        R: Rng + ?Sized,
    {
        sampler
            .max_utility_bids()
            .choose(rng)
            .cloned()
            .ok_or(AgentError::EmptyBidSpace)
    }

    /// Bounded search from `anchor` towards bids the opponent prefers.
    ///
    /// Runs exactly `exploration_attempts` draws. A draw replaces the
    /// incumbent when it costs at most the niceness margin of own utility
    /// and does not lower the estimated opponent utility.
    ///
    /// # Errors
    ///
    /// Propagates opponent model errors, including [`ModelError::NoHistory`].
    pub fn search_bid<P, S, R>(
        &self,
        profile: &P,
        sampler: &S,
        model: &FrequencyModel,
        anchor: Bid,
        progress: f64,
        rng: &mut R,
    ) -> Result<Bid, ModelError>
    where
        P: UtilityProfile,
        S: BidSampler,
        R: Rng + ?Sized,
    {
        let margin = self
            .config
            .niceness_schedule
            .margin_at(self.config.niceness_margin, progress);

        let mut own = profile.utility(&anchor);
        let mut theirs = model.estimate_utility(&anchor)?;
        let mut incumbent = anchor;

        for _ in 0..self.config.exploration_attempts {
            let candidate = sampler.random_bid(rng);
            let candidate_own = profile.utility(&candidate);
            if candidate_own < own - margin {
                continue;
            }
            let candidate_theirs = model.estimate_utility(&candidate)?;
            if candidate_theirs >= theirs {
                incumbent = candidate;
                own = candidate_own;
                theirs = candidate_theirs;
            }
        }
        Ok(incumbent)
    }

    /// The bid the agent would offer at `progress`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bid space is empty or the opponent model
    /// rejects a sampled bid. A model without history is not an error: the
    /// anchor bid is returned.
    pub fn next_bid<P, S, R>(
        &self,
        profile: &P,
        sampler: &S,
        model: &FrequencyModel,
        progress: f64,
        rng: &mut R,
    ) -> Result<Bid, AgentError>
    where
        P: UtilityProfile,
        S: BidSampler,
        R: Rng + ?Sized,
    {
        let anchor = self.anchor_bid(sampler, rng)?;
        if progress < self.config.early_phase_threshold {
            return Ok(anchor);
        }
        match self.search_bid(profile, sampler, model, anchor.clone(), progress, rng) {
            Ok(bid) => Ok(bid),
            Err(ModelError::NoHistory) => {
                warn!(progress, "no opponent history, offering maximum-utility bid");
                Ok(anchor)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Decides between accepting `received` and countering.
    ///
    /// The caller must already have fed `received` to `model`.
    ///
    /// # Errors
    ///
    /// See [`NegotiationStrategy::next_bid`].
    pub fn decide<P, S, R>(
        &self,
        profile: &P,
        sampler: &S,
        model: &FrequencyModel,
        received: Option<&Bid>,
        progress: f64,
        rng: &mut R,
    ) -> Result<TurnDecision, AgentError>
    where
        P: UtilityProfile,
        S: BidSampler,
        R: Rng + ?Sized,
    {
        let counter = self.next_bid(profile, sampler, model, progress, rng)?;
        let counter_utility = profile.utility(&counter);
        let threshold = self.acceptance_threshold(counter_utility, progress);
        let received_utility = received.map(|bid| profile.utility(bid));

        let action = match received {
            Some(bid) if self.is_acceptable(profile, Some(bid), &counter, progress) => {
                Action::Accept(bid.clone())
            }
            _ => Action::Offer(counter),
        };
        debug!(
            progress,
            threshold,
            counter_utility,
            received_utility,
            accept = action.is_accept(),
            "turn decided"
        );
        Ok(TurnDecision {
            action,
            threshold,
            counter_utility,
            received_utility,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use proptest::prelude::{any, prop, prop_assert, proptest};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use test_case::test_case;

    use super::*;
    use crate::config::{ModelConfig, NicenessSchedule};
    use crate::domain::{Domain, Issue, Value};
    use crate::profile::tests::holiday_profile;
    use crate::profile::LinearAdditiveProfile;
    use crate::sampler::LinearBidSpace;

    fn strategy(config: StrategyConfig) -> NegotiationStrategy {
        NegotiationStrategy::new(config).unwrap()
    }

    fn holiday_bid(color: &str, size: &str) -> Bid {
        Bid::new([("color", color), ("size", size)])
    }

    /// Three issues with partly opposed preferences, 24 bids in total.
    fn trip_profile() -> LinearAdditiveProfile {
        let domain = Domain::new(
            "trip",
            vec![
                Issue::new("city", ["rome", "oslo", "lima"]),
                Issue::new("days", ["2", "5", "9", "14"]),
                Issue::new("hotel", ["yes", "no"]),
            ],
        )
        .unwrap();
        let utilities = |pairs: &[(&str, f64)]| {
            pairs
                .iter()
                .map(|(v, u)| (Value::from(*v), *u))
                .collect::<BTreeMap<_, _>>()
        };
        LinearAdditiveProfile::new(
            domain,
            BTreeMap::from([
                ("city".to_string(), 0.5),
                ("days".to_string(), 0.3),
                ("hotel".to_string(), 0.2),
            ]),
            BTreeMap::from([
                ("city".to_string(), utilities(&[("rome", 1.0), ("oslo", 0.6), ("lima", 0.2)])),
                (
                    "days".to_string(),
                    utilities(&[("2", 0.1), ("5", 0.5), ("9", 1.0), ("14", 0.8)]),
                ),
                ("hotel".to_string(), utilities(&[("yes", 1.0), ("no", 0.7)])),
            ]),
            None,
        )
        .unwrap()
    }

    fn trip_model(observed: &[[&str; 3]]) -> FrequencyModel {
        let mut model = FrequencyModel::new(&trip_profile().domain, ModelConfig::default());
        for [city, days, hotel] in observed {
            model
                .observe(&Bid::new([("city", *city), ("days", *days), ("hotel", *hotel)]))
                .unwrap();
        }
        model
    }

    // ==========================================================================
    // Acceptance threshold
    // ==========================================================================

    #[test_case(1.2, 0.0, 1.0, 1.2 ; "start of session")]
    #[test_case(1.2, 0.5, 1.0, 0.6 ; "halfway")]
    #[test_case(1.0, 0.5, 0.8, 0.4 ; "halfway with lower counter")]
    #[test_case(0.5, 0.0, 1.0, 0.5 ; "fast concession")]
    #[test_case(1.0, 1.0, 1.0, 0.0 ; "deadline")]
    fn acceptance_threshold_values(rate: f64, progress: f64, counter: f64, expected: f64) {
        let strategy = strategy(StrategyConfig {
            concession_rate: rate,
            ..StrategyConfig::default()
        });
        assert!((strategy.acceptance_threshold(counter, progress) - expected).abs() < 1e-12);
    }

    #[test]
    fn missing_proposal_is_never_acceptable() {
        let profile = holiday_profile(None);
        let strategy = strategy(StrategyConfig::default());
        let counter = holiday_bid("red", "large");
        assert!(!strategy.is_acceptable(&profile, None, &counter, 1.0));
    }

    #[test]
    fn proposal_below_reservation_is_never_accepted() {
        let profile = holiday_profile(None);
        let strategy = strategy(StrategyConfig {
            reservation_utility: 0.5,
            ..StrategyConfig::default()
        });
        let counter = holiday_bid("red", "large");
        // own utility 0.4
        let received = holiday_bid("blue", "large");
        for step in 0..=20 {
            let progress = f64::from(step) / 20.0;
            assert!(!strategy.is_acceptable(&profile, Some(&received), &counter, progress));
        }
    }

    #[test]
    fn anything_above_reservation_is_accepted_at_deadline() {
        let profile = holiday_profile(None);
        let strategy = strategy(StrategyConfig {
            concession_rate: 1.0,
            ..StrategyConfig::default()
        });
        let counter = holiday_bid("red", "large");
        let received = holiday_bid("blue", "small");
        assert!(strategy.is_acceptable(&profile, Some(&received), &counter, 1.0));
        assert!(!strategy.is_acceptable(&profile, Some(&received), &counter, 0.5));
    }

    // ==========================================================================
    // Bidding
    // ==========================================================================

    #[test]
    fn early_phase_offers_maximum_bid() {
        let profile = trip_profile();
        let space = LinearBidSpace::new(&profile);
        let model = trip_model(&[["lima", "2", "no"]]);
        let strategy = strategy(StrategyConfig::default());
        let mut rng = StdRng::seed_from_u64(1);

        let bid = strategy
            .next_bid(&profile, &space, &model, 0.05, &mut rng)
            .unwrap();
        assert_eq!(
            bid,
            Bid::new([("city", "rome"), ("days", "9"), ("hotel", "yes")])
        );
    }

    #[test]
    fn anchor_breaks_ties_uniformly() {
        let mut profile = holiday_profile(None);
        profile
            .value_utilities
            .get_mut("size")
            .unwrap()
            .insert(Value::from("small"), 1.0);
        let space = LinearBidSpace::new(&profile);
        let strategy = strategy(StrategyConfig::default());
        let mut rng = StdRng::seed_from_u64(3);

        let mut small = 0;
        for _ in 0..200 {
            let bid = strategy.anchor_bid(&space, &mut rng).unwrap();
            if bid.value("size") == Some(&Value::from("small")) {
                small += 1;
            }
        }
        assert!((60..=140).contains(&small));
    }

    #[test]
    fn later_phase_trades_margin_for_opponent_utility() {
        let profile = trip_profile();
        let space = LinearBidSpace::new(&profile);
        // The opponent keeps asking for a 14-day trip.
        let model = trip_model(&[
            ["lima", "14", "no"],
            ["oslo", "14", "no"],
            ["lima", "14", "no"],
        ]);
        let strategy = strategy(StrategyConfig {
            exploration_attempts: 500,
            niceness_margin: 0.1,
            ..StrategyConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(11);

        let bid = strategy
            .next_bid(&profile, &space, &model, 0.5, &mut rng)
            .unwrap();
        // 9 -> 14 days costs 0.06 of own utility and pleases the opponent.
        assert_eq!(bid.value("days"), Some(&Value::from("14")));
        assert_eq!(bid.value("city"), Some(&Value::from("rome")));
    }

    #[test]
    fn later_phase_without_history_falls_back_to_anchor() {
        let profile = trip_profile();
        let space = LinearBidSpace::new(&profile);
        let model = FrequencyModel::new(&profile.domain, ModelConfig::default());
        let strategy = strategy(StrategyConfig::default());
        let mut rng = StdRng::seed_from_u64(5);

        let bid = strategy
            .next_bid(&profile, &space, &model, 0.9, &mut rng)
            .unwrap();
        assert_eq!(&bid, &space.max_utility_bids()[0]);
    }

    #[test]
    fn tightening_margin_keeps_maximum_bid_at_deadline() {
        let profile = trip_profile();
        let space = LinearBidSpace::new(&profile);
        let model = trip_model(&[["lima", "14", "no"], ["lima", "14", "no"]]);
        let strategy = strategy(StrategyConfig {
            niceness_schedule: NicenessSchedule::Tightening,
            exploration_attempts: 300,
            ..StrategyConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(9);

        let bid = strategy
            .next_bid(&profile, &space, &model, 1.0, &mut rng)
            .unwrap();
        assert!((profile.utility(&bid) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_bid_space_is_an_error() {
        struct Empty;
        impl BidSampler for Empty {
            fn random_bid<R: Rng + ?Sized>(&self, _rng: &mut R) -> Bid {
                Bid::default()
            }
            fn max_utility_bids(&self) -> &[Bid] {
                &[]
            }
        }
        let strategy = strategy(StrategyConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            strategy.anchor_bid(&Empty, &mut rng),
            Err(AgentError::EmptyBidSpace)
        );
    }

    // ==========================================================================
    // decide
    // ==========================================================================

    #[test]
    fn decide_offers_on_first_turn() {
        let profile = holiday_profile(None);
        let space = LinearBidSpace::new(&profile);
        let model = FrequencyModel::new(&profile.domain, ModelConfig::default());
        let strategy = strategy(StrategyConfig::default());
        let mut rng = StdRng::seed_from_u64(0);

        let decision = strategy
            .decide(&profile, &space, &model, None, 0.0, &mut rng)
            .unwrap();
        assert_eq!(decision.action, Action::Offer(holiday_bid("red", "large")));
        assert!(decision.received_utility.is_none());
        assert!((decision.threshold - 1.2).abs() < 1e-12);
    }

    #[test]
    fn decide_accepts_good_enough_proposal() {
        let profile = holiday_profile(None);
        let space = LinearBidSpace::new(&profile);
        let received = holiday_bid("red", "small");
        let mut model = FrequencyModel::new(&profile.domain, ModelConfig::default());
        model.observe(&received).unwrap();
        let strategy = strategy(StrategyConfig::default());
        let mut rng = StdRng::seed_from_u64(0);

        // threshold = 1.2 * 0.5 * own(counter) <= 0.6 < 0.7
        let decision = strategy
            .decide(&profile, &space, &model, Some(&received), 0.5, &mut rng)
            .unwrap();
        assert_eq!(decision.action, Action::Accept(received));
    }

    #[test]
    fn action_serializes_with_tag() {
        let action = Action::Offer(holiday_bid("red", "small"));
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(
            json,
            r#"{"action":"offer","bid":{"color":"red","size":"small"}}"#
        );
        let parsed: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, action);
    }

    // ==========================================================================
    // Property-based tests with proptest
    // ==========================================================================

    proptest! {
        #[test]
        fn threshold_is_non_increasing_and_zero_at_deadline(
            rate in 0.0f64..3.0,
            counter in 0.0f64..=1.0,
            a in 0.0f64..=1.0,
            b in 0.0f64..=1.0,
        ) {
            let strategy = strategy(StrategyConfig {
                concession_rate: rate,
                ..StrategyConfig::default()
            });
            let (early, late) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(
                strategy.acceptance_threshold(counter, early)
                    >= strategy.acceptance_threshold(counter, late)
            );
            prop_assert!(strategy.acceptance_threshold(counter, 1.0).abs() < f64::EPSILON);
        }

        #[test]
        fn search_never_lowers_estimated_opponent_utility(
            seed in any::<u64>(),
            attempts in 1u32..200,
            margin in 0.0f64..0.5,
            progress in 0.1f64..=1.0,
            observed in prop::collection::vec((0usize..3, 0usize..4, 0usize..2), 1..10),
        ) {
            let profile = trip_profile();
            let space = LinearBidSpace::new(&profile);
            let mut model = FrequencyModel::new(&profile.domain, ModelConfig::default());
            for (city, days, hotel) in observed {
                let issues = &profile.domain.issues;
                model.observe(&Bid::new([
                    ("city", issues[0].values[city].clone()),
                    ("days", issues[1].values[days].clone()),
                    ("hotel", issues[2].values[hotel].clone()),
                ])).unwrap();
            }
            let strategy = strategy(StrategyConfig {
                exploration_attempts: attempts,
                niceness_margin: margin,
                ..StrategyConfig::default()
            });
            let mut rng = StdRng::seed_from_u64(seed);
            let anchor = strategy.anchor_bid(&space, &mut rng).unwrap();
            let anchor_theirs = model.estimate_utility(&anchor).unwrap();

            let found = strategy
                .search_bid(&profile, &space, &model, anchor, progress, &mut rng)
                .unwrap();
            prop_assert!(model.estimate_utility(&found).unwrap() >= anchor_theirs);
            prop_assert!(profile.domain.is_complete(&found));
        }
    }
}
