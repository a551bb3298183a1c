//! Repeated self-play sessions.
//!
//! Each session runs the alternating-offers protocol between the agent
//! (first profile) and an opponent (second profile) until one side accepts
//! or the round deadline passes. Sessions are independent: each one builds
//! its own parties, models, and random sources, so they run in parallel on
//! the blocking pool.

use std::sync::Arc;

use parley_agent::{
    Action, AgentError, Bid, BidSampler, DeadlineTracker, LinearAdditiveProfile, LinearBidSpace,
    NegotiationSession, Party, RoundProgress, SessionPhase, StrategyConfig, UtilityProfile,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cli::OpponentKind;
use crate::error::CliError;
use crate::scenario::Scenario;

/// Own utility at which the random opponent accepts.
pub const RANDOM_ACCEPTANCE: f64 = 0.6;

/// Tournament parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TournamentConfig {
    /// Number of sessions.
    pub sessions: u32,
    /// Deadline in rounds.
    pub rounds: u32,
    /// Base seed.
    pub seed: u64,
    /// Opponent kind.
    pub opponent: OpponentKind,
    /// Keep per-turn thresholds in the outcomes.
    pub trace: bool,
}

/// Result of one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionOutcome {
    /// Position of the session in the tournament.
    pub index: u32,
    /// Agent session identifier.
    pub session_id: Uuid,
    /// Agreed bid, if any.
    pub agreement: Option<Bid>,
    /// Agent utility of the agreement (0 without one).
    pub agent_utility: f64,
    /// Opponent utility of the agreement (0 without one).
    pub opponent_utility: f64,
    /// Sum of both utilities.
    pub social_welfare: f64,
    /// Rounds played.
    pub rounds: u32,
    /// Agent acceptance thresholds, one per turn.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub thresholds: Vec<f64>,
}

/// Aggregated tournament result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TournamentSummary {
    /// Domain name.
    pub domain: String,
    /// Opponent kind.
    pub opponent: OpponentKind,
    /// Sessions run.
    pub sessions: u32,
    /// Sessions ending in agreement.
    pub agreements: u32,
    /// Mean social welfare over all sessions.
    pub average_social_welfare: f64,
    /// Mean agent utility over all sessions.
    pub average_agent_utility: f64,
    /// Mean rounds played.
    pub average_rounds: f64,
    /// Per-session results, ordered by index.
    pub outcomes: Vec<SessionOutcome>,
}

impl TournamentSummary {
    fn from_outcomes(
        domain: String,
        opponent: OpponentKind,
        mut outcomes: Vec<SessionOutcome>,
    ) -> Self {
        outcomes.sort_by_key(|o| o.index);
        let sessions = outcomes.len() as u32;
        let mean = |f: &dyn Fn(&SessionOutcome) -> f64| {
            if outcomes.is_empty() {
                0.0
            } else {
                outcomes.iter().map(f).sum::<f64>() / outcomes.len() as f64
            }
        };
        let average_social_welfare = mean(&|o| o.social_welfare);
        let average_agent_utility = mean(&|o| o.agent_utility);
        let average_rounds = mean(&|o| f64::from(o.rounds));
        let agreements = outcomes.iter().filter(|o| o.agreement.is_some()).count() as u32;
        Self {
            domain,
            opponent,
            sessions,
            agreements,
            average_social_welfare,
            average_agent_utility,
            average_rounds,
            outcomes,
        }
    }
}

/// Offers uniformly random bids; accepts any proposal worth at least
/// [`RANDOM_ACCEPTANCE`] to itself.
#[derive(Debug)]
pub struct RandomParty<R> {
    profile: LinearAdditiveProfile,
    space: LinearBidSpace,
    rng: R,
    last_received: Option<Bid>,
    phase: SessionPhase,
}

impl<R: Rng> RandomParty<R> {
    /// Creates a random party.
    #[must_use]
    pub fn new(profile: LinearAdditiveProfile, rng: R) -> Self {
        let space = LinearBidSpace::new(&profile);
        Self {
            profile,
            space,
            rng,
            last_received: None,
            phase: SessionPhase::AwaitingOpponent,
        }
    }
}

impl<R: Rng> Party for RandomParty<R> {
    fn receive(&mut self, action: &Action) -> Result<(), AgentError> {
        if self.phase.is_terminal() {
            return Err(AgentError::SessionClosed { phase: self.phase });
        }
        match action {
            Action::Offer(bid) => {
                self.last_received = Some(bid.clone());
                self.phase = SessionPhase::ObservedOpponent;
            }
            Action::Accept(_) => self.phase = SessionPhase::Accepted,
        }
        Ok(())
    }

    fn take_turn(&mut self, _progress: f64) -> Result<Action, AgentError> {
        if self.phase.is_terminal() {
            return Err(AgentError::SessionClosed { phase: self.phase });
        }
        if let Some(bid) = &self.last_received {
            if self.profile.utility(bid) >= RANDOM_ACCEPTANCE {
                self.phase = SessionPhase::Accepted;
                return Ok(Action::Accept(bid.clone()));
            }
        }
        self.phase = SessionPhase::AwaitingOpponent;
        Ok(Action::Offer(self.space.random_bid(&mut self.rng)))
    }

    fn finish(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = SessionPhase::Deadline;
        }
    }
}

/// Runs one session of the alternating-offers protocol.
///
/// # Errors
///
/// Returns an error if either party fails to act.
pub fn run_session(
    scenario: &Scenario,
    config: &TournamentConfig,
    index: u32,
) -> Result<SessionOutcome, AgentError> {
    let base = config.seed.wrapping_add(u64::from(index).wrapping_mul(2));
    let agent_profile = scenario.agent.clone();
    let agent_space = LinearBidSpace::new(&agent_profile);
    let mut agent = NegotiationSession::new(
        agent_profile,
        agent_space,
        scenario.strategy,
        StdRng::seed_from_u64(base),
    )?;
    let mut opponent = build_opponent(
        scenario,
        config.opponent,
        scenario.strategy,
        base.wrapping_add(1),
    )?;

    agent.start();
    let mut deadline = RoundProgress::new(config.rounds);
    let mut agreement = None;
    let mut played = 0;
    while !deadline.is_past_deadline() {
        let progress = deadline.progress();
        played += 1;

        let action = agent.take_turn(progress)?;
        opponent.receive(&action)?;
        if let Action::Accept(bid) = action {
            agreement = Some(bid);
            break;
        }

        let reply = opponent.take_turn(progress)?;
        agent.receive(&reply)?;
        if let Action::Accept(bid) = reply {
            agreement = Some(bid);
            break;
        }

        deadline = deadline.advance();
    }
    if agreement.is_none() {
        agent.finish();
        opponent.finish();
    }

    let (agent_utility, opponent_utility) = agreement.as_ref().map_or((0.0, 0.0), |bid| {
        (scenario.agent.utility(bid), scenario.opponent.utility(bid))
    });
    let thresholds = if config.trace {
        agent.trace().iter().map(|t| t.threshold).collect()
    } else {
        Vec::new()
    };
    debug!(
        index,
        session = %agent.id(),
        agreed = agreement.is_some(),
        agent_utility,
        opponent_utility,
        "session finished"
    );

    Ok(SessionOutcome {
        index,
        session_id: agent.id(),
        agreement,
        agent_utility,
        opponent_utility,
        social_welfare: agent_utility + opponent_utility,
        rounds: played,
        thresholds,
    })
}

fn build_opponent(
    scenario: &Scenario,
    kind: OpponentKind,
    strategy: StrategyConfig,
    seed: u64,
) -> Result<Box<dyn Party>, AgentError> {
    let profile = scenario.opponent.clone();
    let rng = StdRng::seed_from_u64(seed);
    Ok(match kind {
        OpponentKind::Strategy => {
            let space = LinearBidSpace::new(&profile);
            Box::new(NegotiationSession::new(profile, space, strategy, rng)?)
        }
        OpponentKind::Random => Box::new(RandomParty::new(profile, rng)),
    })
}

/// Runs all sessions in parallel and aggregates the results.
///
/// # Errors
///
/// Returns the first session or worker failure.
pub async fn run_tournament(
    scenario: Arc<Scenario>,
    config: TournamentConfig,
) -> Result<TournamentSummary, CliError> {
    if config.sessions == 0 {
        return Err(CliError::InvalidArgument("sessions must be at least 1".into()));
    }
    if config.rounds == 0 {
        return Err(CliError::InvalidArgument("rounds must be at least 1".into()));
    }

    let mut workers = JoinSet::new();
    for index in 0..config.sessions {
        let scenario = Arc::clone(&scenario);
        workers.spawn_blocking(move || run_session(&scenario, &config, index));
    }

    let mut outcomes = Vec::with_capacity(config.sessions as usize);
    while let Some(joined) = workers.join_next().await {
        let outcome = joined.map_err(|e| CliError::Worker(e.to_string()))??;
        outcomes.push(outcome);
    }

    let summary =
        TournamentSummary::from_outcomes(scenario.domain().name.clone(), config.opponent, outcomes);
    info!(
        sessions = summary.sessions,
        agreements = summary.agreements,
        average_social_welfare = summary.average_social_welfare,
        "tournament finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::tests::HOLIDAY;

    fn scenario() -> Scenario {
        Scenario::from_json(HOLIDAY).unwrap()
    }

    fn config(opponent: OpponentKind) -> TournamentConfig {
        TournamentConfig {
            sessions: 4,
            rounds: 100,
            seed: 7,
            opponent,
            trace: true,
        }
    }

    #[test]
    fn self_play_session_reaches_agreement() {
        let outcome = run_session(&scenario(), &config(OpponentKind::Strategy), 0).unwrap();
        let bid = outcome.agreement.as_ref().expect("agreement expected");
        assert!(scenario().domain().is_complete(bid));
        assert!(
            (outcome.social_welfare - (outcome.agent_utility + outcome.opponent_utility)).abs()
                < 1e-12
        );
        assert!(outcome.rounds <= 100);
        assert!(!outcome.thresholds.is_empty());
    }

    #[test]
    fn sessions_are_reproducible_for_a_seed() {
        let scenario = scenario();
        let config = config(OpponentKind::Random);
        let a = run_session(&scenario, &config, 2).unwrap();
        let b = run_session(&scenario, &config, 2).unwrap();
        assert_eq!(a.agreement, b.agreement);
        assert_eq!(a.rounds, b.rounds);
        assert_eq!(a.thresholds, b.thresholds);
    }

    #[test]
    fn one_round_deadline_without_acceptance_scores_zero() {
        // At progress 0 both parties demand more than any offer is worth.
        let config = TournamentConfig {
            rounds: 1,
            ..config(OpponentKind::Strategy)
        };
        let outcome = run_session(&scenario(), &config, 0).unwrap();
        assert!(outcome.agreement.is_none());
        assert!(outcome.social_welfare.abs() < f64::EPSILON);
        assert_eq!(outcome.rounds, 1);
    }

    #[test]
    fn random_party_accepts_good_offers() {
        let scenario = scenario();
        let mut party = RandomParty::new(scenario.opponent.clone(), StdRng::seed_from_u64(1));
        // opponent utility of {blue, large} is 1.0
        party
            .receive(&Action::Offer(Bid::new([("color", "blue"), ("size", "large")])))
            .unwrap();
        assert!(party.take_turn(0.0).unwrap().is_accept());
        assert!(party.take_turn(0.1).is_err());

        let mut party = RandomParty::new(scenario.opponent, StdRng::seed_from_u64(1));
        party
            .receive(&Action::Offer(Bid::new([("color", "red"), ("size", "small")])))
            .unwrap();
        assert!(party.take_turn(0.0).unwrap().is_offer());
    }

    #[test]
    fn summary_averages_over_all_sessions() {
        let outcome = |index, welfare: f64, agreed: bool| SessionOutcome {
            index,
            session_id: Uuid::new_v4(),
            agreement: agreed.then(Bid::default),
            agent_utility: welfare / 2.0,
            opponent_utility: welfare / 2.0,
            social_welfare: welfare,
            rounds: 10,
            thresholds: Vec::new(),
        };
        let summary = TournamentSummary::from_outcomes(
            "d".into(),
            OpponentKind::Strategy,
            vec![outcome(1, 0.0, false), outcome(0, 1.5, true)],
        );
        assert_eq!(summary.sessions, 2);
        assert_eq!(summary.agreements, 1);
        assert!((summary.average_social_welfare - 0.75).abs() < 1e-12);
        assert_eq!(summary.outcomes[0].index, 0);
    }

    #[tokio::test]
    async fn tournament_runs_every_session() {
        let summary = run_tournament(Arc::new(scenario()), config(OpponentKind::Strategy))
            .await
            .unwrap();
        assert_eq!(summary.sessions, 4);
        assert_eq!(summary.domain, "holiday");
        let indices: Vec<u32> = summary.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, [0, 1, 2, 3]);
        assert!(summary.average_social_welfare >= 0.0);
    }

    #[tokio::test]
    async fn tournament_rejects_zero_sessions() {
        let config = TournamentConfig {
            sessions: 0,
            ..config(OpponentKind::Random)
        };
        let result = run_tournament(Arc::new(scenario()), config).await;
        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
    }
}
