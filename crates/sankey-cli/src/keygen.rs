//! # Keygen Subcommand
//!
//! Generates a 256-bit master key from the OS CSPRNG and prints it as
//! Base64, the form `SANKEY_MASTER_KEY` and terminals expect.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use sankey_crypto::LicenseKey;

/// Arguments for the keygen subcommand.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Write the key to this file instead of stdout. Refuses to overwrite.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Execute the keygen subcommand.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let key = LicenseKey::generate();
    match &args.out {
        Some(path) => {
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .with_context(|| format!("failed to create key file: {}", path.display()))?;
            writeln!(file, "{}", key.to_base64())
                .with_context(|| format!("failed to write key file: {}", path.display()))?;
            tracing::info!(path = %path.display(), "master key written");
            println!("{}", path.display());
        }
        None => println!("{}", key.to_base64()),
    }
    Ok(0)
}
