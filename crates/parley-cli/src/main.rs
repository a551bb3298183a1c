//! Parley CLI binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use parley_cli::cli::{Cli, Commands};
use parley_cli::commands::{RunCommand, ValidateCommand};
use parley_cli::output::OutputFormat;

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), parley_cli::CliError> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Run(args) => {
            let cmd = RunCommand::new(&args.scenario);
            cmd.execute(&mut stdout, &format, &args).await?;
        }
        Commands::Validate { scenario } => {
            let cmd = ValidateCommand::new(scenario);
            cmd.execute(&mut stdout, &format)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_cli::cli::Format;

    #[test]
    fn cli_respects_format_flag() {
        let cli = Cli::parse_from(["parley", "--format", "json", "validate", "s.json"]);
        assert_eq!(cli.format, Format::Json);
    }

    #[tokio::test]
    async fn run_with_missing_scenario_fails() {
        let cli = Cli::parse_from(["parley", "run", "/nonexistent/scenario.json"]);
        assert!(run(cli).await.is_err());
    }

    #[tokio::test]
    async fn validate_with_missing_scenario_fails() {
        let cli = Cli::parse_from(["parley", "validate", "/nonexistent/scenario.json"]);
        assert!(run(cli).await.is_err());
    }
}
