//! # sankey CLI Entry Point
//!
//! Parses arguments and dispatches to the handler modules. Logs go to
//! stderr (filtered by `RUST_LOG`) so stdout carries only command output.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sankey_cli::config::{run_config, ConfigArgs};
use sankey_cli::issue::{run_issue, IssueArgs};
use sankey_cli::keygen::{run_keygen, KeygenArgs};
use sankey_cli::retention::{run_retention, RetentionArgs};
use sankey_cli::verify::{run_verify, VerifyArgs};

/// Sankey EA license tooling.
///
/// Generates master keys, issues and verifies account-bound licenses, and
/// computes retention deadlines.
#[derive(Parser, Debug)]
#[command(name = "sankey", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a Base64 master key.
    Keygen(KeygenArgs),
    /// Seal a license for a trading account.
    Issue(IssueArgs),
    /// Verify a license; exits with the terminal status code.
    Verify(VerifyArgs),
    /// Compute a retention deadline.
    Retention(RetentionArgs),
    /// Print the effective lifecycle configuration.
    Config(ConfigArgs),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Keygen(args) => run_keygen(args),
        Commands::Issue(args) => run_issue(args),
        Commands::Verify(args) => run_verify(args),
        Commands::Retention(args) => run_retention(args),
        Commands::Config(args) => run_config(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            // Outside the 0..=6 range `verify` reports.
            ExitCode::from(64)
        }
    }
}
