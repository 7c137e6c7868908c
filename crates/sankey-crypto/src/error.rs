//! # Codec Error Types
//!
//! Every codec failure is fatal for the input that produced it. None of
//! these errors is transient and none is retried.

use sankey_core::ErrorKind;
use thiserror::Error;

/// Errors from sealing or opening a license.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Key material is not exactly 32 bytes.
    #[error("invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    /// Key material is not valid Base64.
    #[error("master key is not valid Base64")]
    InvalidKeyEncoding,

    /// Integrity tag mismatch. Deliberately carries no detail: wrong key,
    /// wrong account, corrupted and truncated input are indistinguishable.
    #[error("license integrity check failed")]
    TamperDetected,

    /// The authenticated ciphertext does not carry valid PKCS#7 padding.
    /// Only reachable with a tag produced under the right key.
    #[error("authenticated ciphertext has invalid padding")]
    InvalidPadding,

    /// The authenticated plaintext is not a license payload.
    #[error("malformed license payload: {0}")]
    MalformedPayload(String),

    /// The payload's `version` is missing, non-positive, or not an integer.
    #[error("invalid license payload version: {0}")]
    InvalidVersion(String),
}

impl CodecError {
    /// Map onto the shared error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidKeyLength(_) | Self::InvalidKeyEncoding => ErrorKind::InvalidKeyLength,
            Self::TamperDetected => ErrorKind::TamperDetected,
            Self::InvalidPadding | Self::MalformedPayload(_) => ErrorKind::MalformedPayload,
            Self::InvalidVersion(_) => ErrorKind::InvalidVersion,
        }
    }
}

/// Errors from terminal-side verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The license could not be opened.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The license opened but its `expiry` has passed.
    #[error("license expired at {expiry}")]
    Expired {
        /// The payload's expiry, as issued.
        expiry: String,
    },
}
