//! # License Payload
//!
//! The secret document sealed inside an [`EncryptedLicense`]. Field names
//! are camelCase on the wire. Fields beyond the current schema are kept in
//! [`LicensePayload::extra`] so a newer issuer's additions survive a decode
//! by an older reader.

use sankey_core::{Timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The payload version this crate produces.
pub const CURRENT_VERSION: u64 = 1;

/// Wire names of the schema fields; these never appear in `extra`.
pub const RESERVED_FIELDS: [&str; 6] = ["version", "eaName", "accountId", "expiry", "userId", "issuedAt"];

/// A versioned license payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicensePayload {
    /// Schema version; always a positive integer.
    pub version: u64,
    /// Name of the licensed EA.
    pub ea_name: String,
    /// Trading account the license is bound to.
    pub account_id: String,
    /// ISO-8601 instant after which the license is no longer valid.
    pub expiry: String,
    /// Applicant the license was issued to.
    pub user_id: String,
    /// ISO-8601 instant of issuance.
    pub issued_at: String,
    /// Fields not defined by this schema version, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LicensePayload {
    /// Build a current-version payload.
    pub fn new(
        ea_name: impl Into<String>,
        account_id: impl Into<String>,
        user_id: impl Into<String>,
        expiry: Timestamp,
        issued_at: Timestamp,
    ) -> Self {
        Self {
            version: CURRENT_VERSION,
            ea_name: ea_name.into(),
            account_id: account_id.into(),
            expiry: expiry.to_iso8601(),
            user_id: user_id.into(),
            issued_at: issued_at.to_iso8601(),
            extra: Map::new(),
        }
    }

    /// Whether `name` is a schema field rather than an extra.
    pub fn is_reserved_field(name: &str) -> bool {
        RESERVED_FIELDS.contains(&name)
    }

    /// Attach an issuer-defined field. Reserved names must not be used.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Parse `expiry` as a UTC timestamp.
    pub fn expiry_timestamp(&self) -> Result<Timestamp, ValidationError> {
        Timestamp::parse_lenient(&self.expiry)
    }

    /// Parse `issuedAt` as a UTC timestamp.
    pub fn issued_at_timestamp(&self) -> Result<Timestamp, ValidationError> {
        Timestamp::parse_lenient(&self.issued_at)
    }
}

/// Extract and validate `version` from a decoded payload document.
///
/// Runs before typed deserialization so a bad version is reported as such
/// rather than as a generic shape error.
pub(crate) fn check_version(doc: &Map<String, Value>) -> Result<u64, String> {
    let Some(raw) = doc.get("version") else {
        return Err("missing".to_string());
    };
    match raw.as_u64() {
        Some(0) => Err("must be positive, got 0".to_string()),
        Some(v) => Ok(v),
        None => Err(format!("must be a positive integer, got {raw}")),
    }
}
