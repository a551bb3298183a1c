//! # parley-cli
//!
//! Command-line harness for the `parley-agent` negotiation strategy.
//!
//! Provides commands for:
//! - Playing repeated sessions on a scenario and reporting social welfare
//! - Validating scenario files
//!
//! # Architecture
//!
//! A scenario file holds one domain and two linear additive profiles. The
//! tournament runs each session on a blocking worker; the agent always uses
//! the first profile and negotiates against either a second strategy
//! instance or a random bidder holding the second profile.
//!
//! ```text
//! ┌──────────┐  Action  ┌──────────────────┐
//! │  agent   │◄────────►│ strategy/random  │   x sessions
//! └──────────┘          └──────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
pub mod scenario;
pub mod tournament;

pub use cli::{Cli, Commands, Format, OpponentKind, RunArgs};
pub use error::CliError;
pub use output::OutputFormat;
pub use scenario::Scenario;
pub use tournament::{run_tournament, TournamentConfig, TournamentSummary};
