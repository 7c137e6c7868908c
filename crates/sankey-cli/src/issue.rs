//! # Issue Subcommand
//!
//! Seals a current-version license for one trading account.
//!
//! ```bash
//! sankey issue --ea-name TrendRider --account-id 51234567 --user-id alice \
//!     --expiry 2027-03-02T09:00:00Z --field maxLots=5 --field tier=\"pro\"
//! ```

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use sankey_core::Timestamp;
use sankey_crypto::{EncryptedLicense, LicenseCodec, LicenseKey, LicensePayload};

use crate::resolve_time;

/// Arguments for the issue subcommand.
#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Base64 master key.
    #[arg(long, env = "SANKEY_MASTER_KEY", hide_env_values = true)]
    pub key: String,

    /// EA product name.
    #[arg(long)]
    pub ea_name: String,

    /// Trading account the license is bound to.
    #[arg(long)]
    pub account_id: String,

    /// Licensee.
    #[arg(long)]
    pub user_id: String,

    /// Expiry, ISO-8601.
    #[arg(long)]
    pub expiry: String,

    /// Issue time, ISO-8601. Defaults to now.
    #[arg(long)]
    pub issued_at: Option<String>,

    /// Extra payload field as KEY=VALUE. VALUE is read as JSON when it
    /// parses, otherwise as a string. Repeatable.
    #[arg(long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, Value)>,
}

/// Parse a `KEY=VALUE` extra field.
pub fn parse_field(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    if key.is_empty() {
        return Err("field name must not be empty".to_string());
    }
    if LicensePayload::is_reserved_field(key) {
        return Err(format!("`{key}` has a dedicated flag"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Build and seal the license described by `args`.
pub fn issue_license(args: &IssueArgs) -> Result<EncryptedLicense> {
    let key = LicenseKey::from_base64(&args.key).context("invalid master key")?;
    let expiry = Timestamp::parse_lenient(&args.expiry).context("invalid --expiry")?;
    let issued_at = resolve_time(args.issued_at.as_deref(), "--issued-at")?;

    let payload = args.fields.iter().fold(
        LicensePayload::new(&args.ea_name, &args.account_id, &args.user_id, expiry, issued_at),
        |payload, (name, value)| payload.with_field(name.clone(), value.clone()),
    );

    let license = LicenseCodec::new(key)
        .seal(&payload, &args.account_id)
        .context("failed to seal license")?;
    tracing::info!(
        ea_name = %args.ea_name,
        account_id = %args.account_id,
        expiry = %expiry,
        extra_fields = args.fields.len(),
        "license issued"
    );
    Ok(license)
}

/// Execute the issue subcommand.
pub fn run_issue(args: &IssueArgs) -> Result<u8> {
    println!("{}", issue_license(args)?);
    Ok(0)
}
