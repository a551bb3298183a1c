//! Tournament command implementation.
//!
//! Loads a scenario, plays the requested number of sessions and reports the
//! average social welfare.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output::OutputFormat;
use crate::scenario::Scenario;
use crate::tournament::{run_tournament, TournamentConfig, TournamentSummary};

/// Run command executor.
pub struct RunCommand {
    scenario: PathBuf,
}

impl RunCommand {
    /// Create a new run command for a scenario file.
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

    /// Execute the run command.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario is invalid, a session fails, or
    /// output fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        args: &RunArgs,
    ) -> Result<(), CliError> {
        let summary = self.run(args).await?;
        format.write(writer, &summary)?;
        Ok(())
    }

    /// Load the scenario and play the tournament.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario is invalid or a session fails.
    pub async fn run(&self, args: &RunArgs) -> Result<TournamentSummary, CliError> {
        let scenario = Arc::new(Scenario::load(&self.scenario)?);
        let config = Self::tournament_config(args);
        info!(
            scenario = %self.scenario.display(),
            sessions = config.sessions,
            rounds = config.rounds,
            seed = config.seed,
            "starting tournament"
        );
        run_tournament(scenario, config).await
    }

    /// Translate command-line arguments into tournament parameters.
    #[must_use]
    pub fn tournament_config(args: &RunArgs) -> TournamentConfig {
        TournamentConfig {
            sessions: args.sessions,
            rounds: args.rounds,
            seed: args.seed,
            opponent: args.opponent,
            trace: args.trace,
        }
    }
}
