//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Parley - run and inspect automated negotiation sessions.
#[derive(Parser, Debug, Clone)]
#[command(name = "parley")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[derive(Default)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run repeated negotiation sessions on a scenario and report welfare.
    Run(RunArgs),

    /// Check a scenario file and describe its bid space.
    Validate {
        /// Scenario file (JSON).
        scenario: PathBuf,
    },
}

/// Arguments for the run command.
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Scenario file (JSON).
    #[arg(required = true)]
    pub scenario: PathBuf,

    /// Number of independent sessions.
    #[arg(short, long, default_value_t = 10)]
    pub sessions: u32,

    /// Deadline in rounds; both parties act once per round.
    #[arg(short, long, default_value_t = 200)]
    pub rounds: u32,

    /// Base random seed; session `i` derives its seeds from it.
    #[arg(long, env = "PARLEY_SEED", default_value_t = 0)]
    pub seed: u64,

    /// Who the agent negotiates against.
    #[arg(short, long, value_enum, default_value_t = OpponentKind::Strategy)]
    pub opponent: OpponentKind,

    /// Include per-turn acceptance thresholds in the output.
    #[arg(long)]
    pub trace: bool,
}

/// Opponent played against the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum OpponentKind {
    /// Another instance of the same strategy using the second profile.
    #[default]
    Strategy,
    /// Offers random bids and accepts anything good enough.
    Random,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_defaults() {
        let cli = Cli::try_parse_from(["parley", "run", "scenario.json"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.scenario, PathBuf::from("scenario.json"));
        assert_eq!(args.sessions, 10);
        assert_eq!(args.rounds, 200);
        assert_eq!(args.opponent, OpponentKind::Strategy);
        assert!(!args.trace);
        assert_eq!(cli.format, Format::Table);
    }

    #[test]
    fn parse_run_with_options() {
        let cli = Cli::try_parse_from([
            "parley", "--format", "json", "run", "s.json", "--sessions", "3", "--rounds", "50",
            "--seed", "9", "--opponent", "random", "--trace",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.sessions, 3);
        assert_eq!(args.rounds, 50);
        assert_eq!(args.seed, 9);
        assert_eq!(args.opponent, OpponentKind::Random);
        assert!(args.trace);
        assert_eq!(cli.format, Format::Json);
    }

    #[test]
    fn parse_validate() {
        let cli = Cli::try_parse_from(["parley", "validate", "s.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Validate { .. }));
    }

    #[test]
    fn run_requires_scenario() {
        assert!(Cli::try_parse_from(["parley", "run"]).is_err());
    }
}
