//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use parley_agent::Bid;
use serde::Serialize;

use crate::cli::{Format, OpponentKind};
use crate::error::CliError;
use crate::tournament::TournamentSummary;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

impl TableDisplay for TournamentSummary {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Tournament: {}", self.domain)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Opponent:         {}", opponent_label(self))?;
        writeln!(writer, "Sessions:         {}", self.sessions)?;
        writeln!(writer, "Agreements:       {}", self.agreements)?;
        writeln!(writer, "Social welfare:   {:.4}", self.average_social_welfare)?;
        writeln!(writer, "Agent utility:    {:.4}", self.average_agent_utility)?;
        writeln!(writer, "Rounds:           {:.1}", self.average_rounds)?;

        if self.outcomes.is_empty() {
            return Ok(());
        }

        writeln!(writer)?;
        writeln!(
            writer,
            "{:>4}  {:<40}  {:>7}  {:>7}  {:>7}  {:>6}",
            "#", "AGREEMENT", "AGENT", "OTHER", "WELFARE", "ROUNDS"
        )?;
        writeln!(writer, "{}", "─".repeat(82))?;
        for outcome in &self.outcomes {
            let agreement = outcome
                .agreement
                .as_ref()
                .map_or_else(|| "-".to_string(), |bid| truncate(&bid.to_string(), 40));
            writeln!(
                writer,
                "{:>4}  {:<40}  {:>7.4}  {:>7.4}  {:>7.4}  {:>6}",
                outcome.index,
                agreement,
                outcome.agent_utility,
                outcome.opponent_utility,
                outcome.social_welfare,
                outcome.rounds
            )?;
            if !outcome.thresholds.is_empty() {
                let thresholds: Vec<String> =
                    outcome.thresholds.iter().map(|t| format!("{t:.3}")).collect();
                writeln!(writer, "      thresholds: {}", thresholds.join(" "))?;
            }
        }
        Ok(())
    }
}

fn opponent_label(summary: &TournamentSummary) -> &'static str {
    match summary.opponent {
        OpponentKind::Strategy => "strategy",
        OpponentKind::Random => "random",
    }
}

/// One issue of a validated scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueReport {
    /// Issue name.
    pub name: String,
    /// Number of admissible values.
    pub values: usize,
    /// Weight under the agent's profile.
    pub agent_weight: f64,
    /// Weight under the opponent's profile.
    pub opponent_weight: f64,
}

/// Description of a validated scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    /// Domain name.
    pub domain: String,
    /// Number of distinct bids.
    pub size: u128,
    /// Issues in declaration order.
    pub issues: Vec<IssueReport>,
    /// Bids of maximal utility for the agent.
    pub agent_best_bids: Vec<Bid>,
    /// Utility of the agent's reservation bid, if it has one.
    pub agent_reservation: Option<f64>,
    /// Utility of the opponent's reservation bid, if it has one.
    pub opponent_reservation: Option<f64>,
}

impl TableDisplay for ScenarioReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Scenario: {}", self.domain)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Bid space:        {} bid(s)", self.size)?;
        writeln!(writer, "Agent reserve:    {}", reservation_label(self.agent_reservation))?;
        writeln!(writer, "Opponent reserve: {}", reservation_label(self.opponent_reservation))?;
        writeln!(writer)?;
        writeln!(
            writer,
            "{:<24}  {:>6}  {:>7}  {:>7}",
            "ISSUE", "VALUES", "AGENT", "OTHER"
        )?;
        writeln!(writer, "{}", "─".repeat(50))?;
        for issue in &self.issues {
            writeln!(
                writer,
                "{:<24}  {:>6}  {:>7.3}  {:>7.3}",
                truncate(&issue.name, 24),
                issue.values,
                issue.agent_weight,
                issue.opponent_weight
            )?;
        }
        writeln!(writer)?;
        writeln!(writer, "Best bids for the agent")?;
        for bid in &self.agent_best_bids {
            writeln!(writer, "  {bid}")?;
        }
        Ok(())
    }
}

fn reservation_label(utility: Option<f64>) -> String {
    utility.map_or_else(|| "none".to_string(), |u| format!("{u:.4}"))
}

/// Truncate a string to a maximum number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
