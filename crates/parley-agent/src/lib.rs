//! # parley-agent
//!
//! Bilateral multi-issue negotiation agent.
//!
//! This crate provides:
//!
//! - **Domain model**: [`Domain`], [`Issue`], [`Value`], and [`Bid`]
//! - **Own preferences**: the [`UtilityProfile`] trait and [`LinearAdditiveProfile`]
//! - **Bid sampling**: the [`BidSampler`] trait and [`LinearBidSpace`]
//! - **Opponent modelling**: [`FrequencyModel`] learns issue weights and value
//!   frequencies from observed proposals
//! - **Strategy**: [`NegotiationStrategy`] with a deadline-driven acceptance
//!   threshold and an opponent-aware bid search
//! - **Sessions**: [`NegotiationSession`] owns all per-session state
//!
//! ## Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//!
//! use parley_agent::{Action, Bid, Domain, Issue, LinearAdditiveProfile, LinearBidSpace};
//! use parley_agent::{NegotiationSession, StrategyConfig, Value};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let domain = Domain::new(
//!     "holiday",
//!     vec![Issue::new("color", ["red", "blue"]), Issue::new("size", ["small", "large"])],
//! )
//! .unwrap();
//! let profile = LinearAdditiveProfile::new(
//!     domain,
//!     BTreeMap::from([("color".to_string(), 0.6), ("size".to_string(), 0.4)]),
//!     BTreeMap::from([
//!         ("color".to_string(), BTreeMap::from([(Value::from("red"), 1.0), (Value::from("blue"), 0.0)])),
//!         ("size".to_string(), BTreeMap::from([(Value::from("small"), 0.25), (Value::from("large"), 1.0)])),
//!     ]),
//!     None,
//! )
//! .unwrap();
//! let space = LinearBidSpace::new(&profile);
//! let mut session =
//!     NegotiationSession::new(profile, space, StrategyConfig::default(), StdRng::seed_from_u64(7)).unwrap();
//!
//! session.receive(&Action::Offer(Bid::new([("color", "red"), ("size", "small")]))).unwrap();
//! let action = session.take_turn(0.9).unwrap();
//! assert!(action.is_accept());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod domain;
pub mod error;
pub mod opponent;
pub mod profile;
pub mod progress;
pub mod sampler;
pub mod session;
pub mod strategy;

pub use error::AgentError;

// Re-exports for convenience
pub use config::{ConfigError, ModelConfig, NicenessSchedule, ReferencePolicy, StrategyConfig};
pub use domain::{Bid, Domain, DomainError, Issue, Value};
pub use opponent::{FrequencyModel, ModelError};
pub use profile::{LinearAdditiveProfile, ProfileError, UtilityProfile};
pub use progress::{DeadlineTracker, RoundProgress, TimeProgress};
pub use sampler::{BidSampler, LinearBidSpace};
pub use session::{NegotiationSession, Party, SessionId, SessionPhase, TurnRecord};
pub use strategy::{Action, NegotiationStrategy, TurnDecision};
