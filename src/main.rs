use anyhow::{Context, Result, anyhow};
use clap::Parser;
use marketgate::cli::Cli;
use marketgate::core::error::GateError;
use marketgate::core::output::append_summary;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "MARKETGATE_LOG";

fn init_logging(verbose: bool) -> Result<()> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) => EnvFilter::try_new(&directives)
            .with_context(|| format!("invalid {} directives '{}'", LOG_ENV, directives))?,
        Err(_) => EnvFilter::new(if verbose {
            "marketgate=debug"
        } else {
            "marketgate=warn"
        }),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!(e))
        .context("failed to install log subscriber")
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("warning: {:#}", e);
    }

    let outcome = match marketgate::run(&cli) {
        Ok(outcome) => outcome,
        Err(GateError::MissingConsolePath(_)) => {
            eprintln!("ERROR: --console-path is required for cross-repo and full modes");
            return ExitCode::from(1);
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return ExitCode::from(1);
        }
    };

    if let Some(path) = &cli.github_summary {
        let appended = append_summary(path, &outcome.summary)
            .with_context(|| format!("failed to append summary to {}", path.display()));
        if let Err(e) = appended {
            eprintln!("ERROR: {:#}", e);
            return ExitCode::from(1);
        }
    }

    ExitCode::from(outcome.exit_code as u8)
}
