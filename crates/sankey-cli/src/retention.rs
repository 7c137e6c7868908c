//! # Retention Subcommand
//!
//! Prints the retention deadline a terminal transition at `--at` would
//! receive, or with `--adjust-months` the deadline an operator override
//! would set.

use anyhow::{Context, Result};
use clap::Args;

use sankey_core::Timestamp;
use sankey_state::RetentionPolicy;

use crate::config::ConfigArgs;
use crate::resolve_time;

/// Arguments for the retention subcommand.
#[derive(Args, Debug)]
pub struct RetentionArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Time of the terminal transition or override (ISO-8601). Defaults to now.
    #[arg(long)]
    pub at: Option<String>,

    /// Compute an operator override of this many months instead
    /// (negative shortens; the result must be in the future).
    #[arg(long, allow_hyphen_values = true)]
    pub adjust_months: Option<i64>,
}

/// Compute the deadline described by `args`.
pub fn compute(args: &RetentionArgs) -> Result<Timestamp> {
    let at = resolve_time(args.at.as_deref(), "--at")?;
    let deadline = match args.adjust_months {
        Some(months) => RetentionPolicy::adjust_deadline(at, months)?,
        None => RetentionPolicy::from_config(&args.config.resolve()?).compute_deadline(at)?,
    };
    Timestamp::from_epoch_secs(deadline).context("deadline out of range")
}

/// Execute the retention subcommand.
pub fn run_retention(args: &RetentionArgs) -> Result<u8> {
    let deadline = compute(args)?;
    println!("{} {}", deadline.epoch_secs(), deadline);
    Ok(0)
}
