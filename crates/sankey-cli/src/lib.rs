//! # sankey-cli — Operator Command-Line Interface
//!
//! ## Subcommands
//!
//! - `keygen` — generate a Base64 master key
//! - `issue` — seal a v1 license for an account
//! - `verify` — open and expiry-check a license; exits with the terminal
//!   status code
//! - `retention` — compute or adjust a retention deadline
//! - `config` — print the effective lifecycle configuration
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from the handlers; handlers delegate to
//!   the domain crates.
//! - Every handler returns the process exit code.
//! - The master key comes from `--key` or `SANKEY_MASTER_KEY` and is never
//!   echoed or logged.

pub mod config;
pub mod issue;
pub mod keygen;
pub mod retention;
pub mod verify;

use anyhow::{Context, Result};

use sankey_core::Timestamp;

/// Parse an optional `--now`/`--at` style argument, defaulting to the clock.
pub fn resolve_time(value: Option<&str>, flag: &str) -> Result<Timestamp> {
    match value {
        Some(s) => Timestamp::parse_lenient(s).with_context(|| format!("invalid {flag}")),
        None => Ok(Timestamp::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_time_parses_offsets() {
        let t = resolve_time(Some("2026-01-15T14:00:00+02:00"), "--at").unwrap();
        assert_eq!(t.to_iso8601(), "2026-01-15T12:00:00Z");
    }

    #[test]
    fn resolve_time_rejects_garbage() {
        let err = resolve_time(Some("yesterday"), "--at").unwrap_err();
        assert!(format!("{err:#}").contains("--at"));
    }

    #[test]
    fn resolve_time_defaults_to_now() {
        let before = Timestamp::now();
        let t = resolve_time(None, "--at").unwrap();
        assert!(t >= before);
    }
}
