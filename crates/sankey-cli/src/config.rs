//! # Lifecycle Configuration Flags
//!
//! Shared flags that resolve a [`LifecycleConfig`] from the command line
//! or the `SANKEY_*` environment variables.

use anyhow::{Context, Result};
use clap::Args;

use sankey_core::config::{
    DEFAULT_CANCELLATION_WINDOW_SECS, DEFAULT_MAX_CAS_RETRIES, DEFAULT_NOTIFICATION_DELAY_SECS,
    DEFAULT_RETENTION_MONTHS,
};
use sankey_core::LifecycleConfig;

/// Lifecycle tunables.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Retention of terminal records, in calendar months.
    #[arg(long, env = "SANKEY_RETENTION_MONTHS", default_value_t = DEFAULT_RETENTION_MONTHS)]
    pub retention_months: u32,

    /// Owner cancellation window after the last status change, in seconds.
    #[arg(
        long,
        env = "SANKEY_CANCELLATION_WINDOW_SECS",
        default_value_t = DEFAULT_CANCELLATION_WINDOW_SECS
    )]
    pub cancellation_window_secs: i64,

    /// Delay between scheduling and license issuance, in seconds.
    #[arg(
        long,
        env = "SANKEY_NOTIFICATION_DELAY_SECS",
        default_value_t = DEFAULT_NOTIFICATION_DELAY_SECS
    )]
    pub notification_delay_secs: i64,

    /// Compare-and-swap retries per transition.
    #[arg(long, env = "SANKEY_MAX_CAS_RETRIES", default_value_t = DEFAULT_MAX_CAS_RETRIES)]
    pub max_cas_retries: u32,
}

impl ConfigArgs {
    /// Build and validate the configuration.
    pub fn resolve(&self) -> Result<LifecycleConfig> {
        let config = LifecycleConfig {
            retention_months: self.retention_months,
            cancellation_window_secs: self.cancellation_window_secs,
            notification_delay_secs: self.notification_delay_secs,
            max_cas_retries: self.max_cas_retries,
        };
        config.validate().context("invalid lifecycle configuration")?;
        Ok(config)
    }
}

/// Print the effective configuration as JSON.
pub fn run_config(args: &ConfigArgs) -> Result<u8> {
    let config = args.resolve()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(0)
}
