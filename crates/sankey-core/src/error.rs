//! # Error Types — Shared Error Taxonomy
//!
//! Every failure the license core can report falls into exactly one
//! [`ErrorKind`]. Component crates define their own `thiserror` enums with
//! structured context (`CodecError`, `TransitionError`, `StoreError`) and
//! map each variant onto a kind, so callers can match exhaustively on a
//! closed set instead of inspecting error text.
//!
//! ## Retry Policy
//!
//! Codec and state-machine failures are definitionally non-transient.
//! The only retryable kind is [`ErrorKind::ConcurrentModification`], and the
//! retry must re-read the record and recompute the transition from scratch.

use thiserror::Error;

/// The closed set of failure kinds surfaced by the license core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Key material is not exactly 256 bits.
    InvalidKeyLength,
    /// Integrity tag mismatch: wrong key, wrong account context, or a
    /// corrupted or truncated license.
    TamperDetected,
    /// Plaintext does not parse as a license payload.
    MalformedPayload,
    /// Payload parses but its `version` is missing, non-positive, or not an integer.
    InvalidVersion,
    /// The requested (source, target) status pair is not allowed.
    InvalidTransition,
    /// The transition is allowed but its time guard has lapsed.
    WindowExpired,
    /// The actor fails the ownership/role guard.
    Unauthorized,
    /// The persistence collaborator detected a lost-update race.
    ConcurrentModification,
}

impl ErrorKind {
    /// Whether a caller may retry an operation that failed with this kind.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }

    /// Stable identifier for logs and API error bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidKeyLength => "INVALID_KEY_LENGTH",
            Self::TamperDetected => "TAMPER_DETECTED",
            Self::MalformedPayload => "MALFORMED_PAYLOAD",
            Self::InvalidVersion => "INVALID_VERSION",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::WindowExpired => "WINDOW_EXPIRED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failure for identifiers, timestamps, and configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An identifier or key component is empty or contains a reserved character.
    #[error("invalid {field}: {reason}")]
    InvalidIdentifier {
        /// The identifier field being validated.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A timestamp could not be parsed or is out of range.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The offending input.
        value: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// A configuration value is outside its permitted range.
    #[error("invalid configuration {field}: {reason}")]
    InvalidConfig {
        /// The configuration field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
