//! Per-session negotiation context.
//!
//! A [`NegotiationSession`] owns everything one negotiation needs: profile,
//! bid sampler, strategy, opponent model, and random source. It is created
//! when the session starts, handed every protocol event, and dropped when
//! the session ends. Nothing is shared between sessions.
//!
//! ```text
//! Idle ─► AwaitingOpponent ─(offer)─► ObservedOpponent ─(take_turn)─┬─► Accepted
//!              ▲                                                     │
//!              └──────────────────────── offered ────────────────────┘
//! ```
//!
//! `Deadline` is entered through [`NegotiationSession::finish`]. `Accepted`
//! and `Deadline` are terminal.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::StrategyConfig;
use crate::domain::Bid;
use crate::error::AgentError;
use crate::opponent::FrequencyModel;
use crate::profile::UtilityProfile;
use crate::progress::DeadlineTracker;
use crate::sampler::BidSampler;
use crate::strategy::{Action, NegotiationStrategy};

/// Unique identifier for a negotiation session.
pub type SessionId = Uuid;

/// Phase of a negotiation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Created, no protocol event yet.
    Idle,
    /// Waiting for the opponent to act.
    AwaitingOpponent,
    /// An opponent proposal arrived and awaits a decision.
    ObservedOpponent,
    /// Agreement reached.
    Accepted,
    /// The deadline passed without agreement.
    Deadline,
}

impl SessionPhase {
    /// Returns true for phases that end the session.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Deadline)
    }
}

/// One turn as seen by the strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    /// Turn number, starting at 1.
    pub turn: u32,
    /// Progress at decision time.
    pub progress: f64,
    /// Acceptance threshold in force.
    pub threshold: f64,
    /// Own utility of the counter-offer.
    pub counter_utility: f64,
    /// Own utility of the opponent proposal, if any.
    pub received_utility: Option<f64>,
    /// Whether the turn ended in acceptance.
    pub accepted: bool,
}

/// A participant in an alternating-offers negotiation.
pub trait Party {
    /// Handles the opponent's action.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed or the action is malformed.
    fn receive(&mut self, action: &Action) -> Result<(), AgentError>;

    /// Acts at the given progress.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed or no decision can be made.
    fn take_turn(&mut self, progress: f64) -> Result<Action, AgentError>;

    /// Signals that the deadline passed.
    fn finish(&mut self);
}

/// The negotiation state for one session.
#[derive(Debug)]
pub struct NegotiationSession<P, S, R> {
    id: SessionId,
    profile: P,
    sampler: S,
    strategy: NegotiationStrategy,
    model: FrequencyModel,
    rng: R,
    phase: SessionPhase,
    last_received: Option<Bid>,
    unobserved: bool,
    last_progress: f64,
    agreement: Option<Bid>,
    trace: Vec<TurnRecord>,
}

impl<P, S, R> NegotiationSession<P, S, R>
where
    P: UtilityProfile,
    S: BidSampler,
    R: Rng,
{
    /// Creates a session in the [`SessionPhase::Idle`] phase.
    ///
    /// The reservation utility is taken from the profile's reservation bid
    /// when it has one.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if `config` is invalid.
    pub fn new(profile: P, sampler: S, config: StrategyConfig, rng: R) -> Result<Self, AgentError> {
        let mut strategy = NegotiationStrategy::new(config)?;
        if let Some(bid) = profile.reservation_bid() {
            strategy = strategy.with_reservation_utility(profile.utility(bid));
        }
        let model = FrequencyModel::new(profile.domain(), config.model);
        Ok(Self {
            id: Uuid::new_v4(),
            profile,
            sampler,
            strategy,
            model,
            rng,
            phase: SessionPhase::Idle,
            last_received: None,
            unobserved: false,
            last_progress: 0.0,
            agreement: None,
            trace: Vec::new(),
        })
    }

    /// Marks the session as started.
    pub fn start(&mut self) {
        if self.phase == SessionPhase::Idle {
            self.phase = SessionPhase::AwaitingOpponent;
        }
    }

    /// Handles the opponent's action.
    ///
    /// An offer becomes the proposal the next turn responds to; an accept
    /// ends the session with that bid as the agreement.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::SessionClosed`] in a terminal phase.
    pub fn receive(&mut self, action: &Action) -> Result<(), AgentError> {
        self.ensure_open()?;
        match action {
            Action::Offer(bid) => {
                self.last_received = Some(bid.clone());
                self.unobserved = true;
                self.phase = SessionPhase::ObservedOpponent;
            }
            Action::Accept(bid) => {
                self.agreement = Some(bid.clone());
                self.phase = SessionPhase::Accepted;
                info!(session = %self.id, turns = self.trace.len(), "opponent accepted");
            }
        }
        Ok(())
    }

    /// Takes a turn: observe the pending proposal, then accept or counter.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::SessionClosed`] in a terminal phase,
    /// [`AgentError::InvalidProgress`] if `progress` is outside `[0, 1]` or
    /// below the previous turn's, [`AgentError::InvalidTransition`] if the
    /// agent already acted and no new proposal arrived since, and model
    /// errors for malformed proposals.
    pub fn take_turn(&mut self, progress: f64) -> Result<Action, AgentError> {
        self.ensure_open()?;
        if !(0.0..=1.0).contains(&progress) || progress < self.last_progress {
            return Err(AgentError::InvalidProgress { progress });
        }
        // Only the opening turn may be taken without a pending proposal.
        if self.phase != SessionPhase::ObservedOpponent && !self.trace.is_empty() {
            return Err(AgentError::InvalidTransition { phase: self.phase });
        }

        if self.unobserved {
            if let Some(bid) = &self.last_received {
                self.model.observe(bid)?;
            }
            self.unobserved = false;
        }

        let decision = self.strategy.decide(
            &self.profile,
            &self.sampler,
            &self.model,
            self.last_received.as_ref(),
            progress,
            &mut self.rng,
        )?;
        self.last_progress = progress;

        let accepted = decision.action.is_accept();
        self.trace.push(TurnRecord {
            turn: self.trace.len() as u32 + 1,
            progress,
            threshold: decision.threshold,
            counter_utility: decision.counter_utility,
            received_utility: decision.received_utility,
            accepted,
        });

        if accepted {
            self.agreement = Some(decision.action.bid().clone());
            self.phase = SessionPhase::Accepted;
            info!(session = %self.id, turns = self.trace.len(), progress, "accepted opponent proposal");
        } else {
            self.phase = SessionPhase::AwaitingOpponent;
            debug!(session = %self.id, bid = %decision.action.bid(), "offered");
        }
        Ok(decision.action)
    }

    /// Takes a turn at the tracker's current progress.
    ///
    /// # Errors
    ///
    /// See [`NegotiationSession::take_turn`].
    pub fn take_turn_with<D: DeadlineTracker>(&mut self, deadline: &D) -> Result<Action, AgentError> {
        self.take_turn(deadline.progress())
    }

    /// Ends the session at the deadline. No effect once terminal.
    pub fn finish(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = SessionPhase::Deadline;
            info!(session = %self.id, turns = self.trace.len(), "deadline reached without agreement");
        }
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Agreed bid, once accepted by either side.
    #[must_use]
    pub fn agreement(&self) -> Option<&Bid> {
        self.agreement.as_ref()
    }

    /// The opponent's latest proposal.
    #[must_use]
    pub fn last_received(&self) -> Option<&Bid> {
        self.last_received.as_ref()
    }

    /// Opponent model built so far.
    #[must_use]
    pub const fn model(&self) -> &FrequencyModel {
        &self.model
    }

    /// Strategy in use.
    #[must_use]
    pub const fn strategy(&self) -> &NegotiationStrategy {
        &self.strategy
    }

    /// Own profile.
    #[must_use]
    pub const fn profile(&self) -> &P {
        &self.profile
    }

    /// Per-turn decision records.
    #[must_use]
    pub fn trace(&self) -> &[TurnRecord] {
        &self.trace
    }

    fn ensure_open(&self) -> Result<(), AgentError> {
        if self.phase.is_terminal() {
            return Err(AgentError::SessionClosed { phase: self.phase });
        }
        Ok(())
    }
}

impl<P, S, R> Party for NegotiationSession<P, S, R>
where
    P: UtilityProfile,
    S: BidSampler,
    R: Rng,
{
    fn receive(&mut self, action: &Action) -> Result<(), AgentError> {
        Self::receive(self, action)
    }

    fn take_turn(&mut self, progress: f64) -> Result<Action, AgentError> {
        Self::take_turn(self, progress)
    }

    fn finish(&mut self) {
        Self::finish(self);
    }
}
