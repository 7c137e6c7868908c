//! # Verify Subcommand
//!
//! Opens a license the way an EA terminal does and exits with the terminal
//! status code (`0` valid, `1` expired, `2` invalid, `3` tampered,
//! `4` key error, `5` decryption failed, `6` parse error).

use std::io::Read;

use anyhow::{Context, Result};
use clap::Args;

use sankey_crypto::{LicenseStatus, LicenseVerifier, VerifiedLicense, VerifyError};

use crate::resolve_time;

/// Arguments for the verify subcommand.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Base64 master key.
    #[arg(long, env = "SANKEY_MASTER_KEY", hide_env_values = true)]
    pub key: String,

    /// Account the terminal is logged into.
    #[arg(long)]
    pub account_id: String,

    /// Evaluate expiry at this instant instead of now (ISO-8601).
    #[arg(long)]
    pub now: Option<String>,

    /// License string, or `-` to read it from stdin.
    pub license: String,
}

/// Verification outcome for one license.
pub type Outcome = Result<VerifiedLicense, VerifyError>;

/// Verify the license described by `args`. Only I/O and argument errors
/// are returned as `Err`; verification failures are in the outcome.
pub fn verify_license(args: &VerifyArgs) -> Result<Outcome> {
    let license = if args.license == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read license from stdin")?;
        buf
    } else {
        args.license.clone()
    };
    let now = resolve_time(args.now.as_deref(), "--now")?;

    let outcome = LicenseVerifier::from_base64_key(&args.key)
        .map_err(VerifyError::from)
        .and_then(|verifier| verifier.verify(&license, &args.account_id, now));
    if let Err(e) = &outcome {
        tracing::warn!(account_id = %args.account_id, error = %e, "license rejected");
    }
    Ok(outcome)
}

/// Execute the verify subcommand.
pub fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let outcome = verify_license(args)?;
    let status = LicenseStatus::of(&outcome);
    println!("{status}");
    match &outcome {
        Ok(license) => println!("{}", serde_json::to_string_pretty(license.payload())?),
        Err(e) => eprintln!("{e}"),
    }
    // Codes are 0..=6.
    Ok(u8::try_from(status.code()).unwrap_or(u8::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sankey_core::Timestamp;
    use sankey_crypto::{LicenseCodec, LicenseKey, LicensePayload};

    fn sealed(key: &LicenseKey, expiry: &str) -> String {
        let payload = LicensePayload::new(
            "TrendRider",
            "51234567",
            "alice",
            Timestamp::parse(expiry).unwrap(),
            Timestamp::parse("2026-01-01T00:00:00Z").unwrap(),
        );
        LicenseCodec::new(key.clone())
            .seal(&payload, "51234567")
            .unwrap()
            .into_string()
    }

    fn args(key: &LicenseKey, license: String, account_id: &str) -> VerifyArgs {
        VerifyArgs {
            key: key.to_base64(),
            account_id: account_id.to_string(),
            now: Some("2026-10-19T00:00:00Z".to_string()),
            license,
        }
    }

    #[test]
    fn valid_license_exits_zero() {
        let key = LicenseKey::generate();
        let a = args(&key, sealed(&key, "2027-01-01T00:00:00Z"), "51234567");
        assert_eq!(run_verify(&a).unwrap(), 0);
    }

    #[test]
    fn expired_license_exits_one() {
        let key = LicenseKey::generate();
        let a = args(&key, sealed(&key, "2026-06-01T00:00:00Z"), "51234567");
        assert_eq!(run_verify(&a).unwrap(), 1);
    }

    #[test]
    fn other_account_exits_tampered() {
        let key = LicenseKey::generate();
        let a = args(&key, sealed(&key, "2027-01-01T00:00:00Z"), "99999999");
        assert_eq!(run_verify(&a).unwrap(), 3);
    }

    #[test]
    fn malformed_key_exits_key_error() {
        let key = LicenseKey::generate();
        let mut a = args(&key, sealed(&key, "2027-01-01T00:00:00Z"), "51234567");
        a.key = "not base64!".to_string();
        let outcome = verify_license(&a).unwrap();
        assert_eq!(LicenseStatus::of(&outcome), LicenseStatus::KeyError);
        assert_eq!(run_verify(&a).unwrap(), 4);
    }

    #[test]
    fn bad_now_is_an_argument_error() {
        let key = LicenseKey::generate();
        let mut a = args(&key, sealed(&key, "2027-01-01T00:00:00Z"), "51234567");
        a.now = Some("soon".to_string());
        assert!(run_verify(&a).is_err());
    }
}
