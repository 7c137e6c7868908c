//! # Terminal-Side Verification
//!
//! EA terminals receive a license string, a Base64 master key, and know
//! their own trading account id. [`LicenseVerifier`] opens the license for
//! that account, rejects it once `expiry` has passed, and hands back a
//! [`VerifiedLicense`] with loosely typed accessors over the payload
//! document (terminal scripts read issuer-defined fields by name).
//!
//! [`LicenseStatus`] preserves the integer codes terminal integrations
//! already switch on.

use sankey_core::Timestamp;
use serde_json::{Map, Value};

use crate::codec::LicenseCodec;
use crate::error::{CodecError, VerifyError};
use crate::key::LicenseKey;
use crate::payload::LicensePayload;

/// Verification outcome codes understood by terminal integrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum LicenseStatus {
    /// License opened and has not expired.
    Valid = 0,
    /// License opened but `expiry` has passed.
    Expired = 1,
    /// Payload version rejected.
    Invalid = 2,
    /// Integrity check failed.
    Tampered = 3,
    /// Master key is malformed.
    KeyError = 4,
    /// Authenticated ciphertext did not decrypt.
    DecryptionFailed = 5,
    /// Plaintext is not a license payload.
    ParseError = 6,
}

impl LicenseStatus {
    /// The integer code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Classify a verification result.
    pub fn of<T>(result: &Result<T, VerifyError>) -> Self {
        match result {
            Ok(_) => Self::Valid,
            Err(e) => Self::from(e),
        }
    }
}

impl From<&VerifyError> for LicenseStatus {
    fn from(err: &VerifyError) -> Self {
        match err {
            VerifyError::Expired { .. } => Self::Expired,
            VerifyError::Codec(codec) => match codec {
                CodecError::InvalidKeyLength(_) | CodecError::InvalidKeyEncoding => Self::KeyError,
                CodecError::TamperDetected => Self::Tampered,
                CodecError::InvalidVersion(_) => Self::Invalid,
                CodecError::InvalidPadding => Self::DecryptionFailed,
                CodecError::MalformedPayload(_) => Self::ParseError,
            },
        }
    }
}

impl std::fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Valid => "VALID",
            Self::Expired => "EXPIRED",
            Self::Invalid => "INVALID",
            Self::Tampered => "TAMPERED",
            Self::KeyError => "KEY_ERROR",
            Self::DecryptionFailed => "DECRYPTION_FAILED",
            Self::ParseError => "PARSE_ERROR",
        };
        f.write_str(s)
    }
}

/// Opens and expiry-checks licenses for a terminal.
#[derive(Debug, Clone)]
pub struct LicenseVerifier {
    codec: LicenseCodec,
}

impl LicenseVerifier {
    /// Create a verifier for `key`.
    pub fn new(key: LicenseKey) -> Self {
        Self {
            codec: LicenseCodec::new(key),
        }
    }

    /// Create a verifier from a Base64 master key.
    pub fn from_base64_key(master_key: &str) -> Result<Self, CodecError> {
        Ok(Self::new(LicenseKey::from_base64(master_key)?))
    }

    /// Open `license` for `account_id` and check it is unexpired at `now`.
    ///
    /// An `expiry` that does not parse as ISO-8601 is a malformed payload,
    /// not an unlimited license.
    pub fn verify(
        &self,
        license: &str,
        account_id: &str,
        now: Timestamp,
    ) -> Result<VerifiedLicense, VerifyError> {
        let payload = self.codec.open(license, account_id)?;
        let expiry = payload
            .expiry_timestamp()
            .map_err(|e| CodecError::MalformedPayload(format!("expiry: {e}")))?;
        if now > expiry {
            return Err(VerifyError::Expired {
                expiry: payload.expiry,
            });
        }
        VerifiedLicense::from_payload(payload)
    }
}

/// A license that passed verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedLicense {
    payload: LicensePayload,
    document: Map<String, Value>,
}

impl VerifiedLicense {
    fn from_payload(payload: LicensePayload) -> Result<Self, VerifyError> {
        let document = match serde_json::to_value(&payload) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => return Err(CodecError::MalformedPayload(e.to_string()).into()),
        };
        Ok(Self { payload, document })
    }

    /// The typed payload.
    pub fn payload(&self) -> &LicensePayload {
        &self.payload
    }

    /// Whether the payload document has `key`.
    pub fn has_key(&self, key: &str) -> bool {
        self.document.contains_key(key)
    }

    /// String field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.document.get(key)?.as_str()
    }

    /// Integer field, or a string holding an integer.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.document.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean field; also accepts `"true"`, `"1"`, `"yes"` and non-zero numbers.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.document.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => Some(matches!(s.as_str(), "true" | "1" | "yes")),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            _ => None,
        }
    }

    /// Numeric field, or a string holding a number.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.document.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// ISO-8601 field as epoch seconds.
    pub fn get_datetime(&self, key: &str) -> Option<i64> {
        let s = self.get_str(key)?;
        Timestamp::parse_lenient(s).ok().map(|t| t.epoch_secs())
    }
}
