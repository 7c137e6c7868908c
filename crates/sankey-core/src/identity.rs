//! # Record Identifiers
//!
//! Newtype wrappers for the keys of the abstract record store. These
//! prevent accidental identifier confusion: an owner id cannot be passed
//! where an application sort key is expected.
//!
//! ## Key Layout
//!
//! ```text
//! owner:        <user id>
//! application:  APPLICATION#<broker>#<accountNumber>#<eaName>#<appliedAt>
//! history:      <application key>#HISTORY#<changedAt>#<suffix>
//! ```
//!
//! History keys are prefixed by their application key so a prefix scan
//! returns an application's trail, and sort by `changedAt` because the
//! timestamp is ISO-8601 UTC.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::temporal::Timestamp;

const SEPARATOR: char = '#';
const APPLICATION_PREFIX: &str = "APPLICATION";
const HISTORY_MARKER: &str = "HISTORY";

/// Identifier of an applicant (the application owner) or operator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a user identifier. Rejects empty or whitespace-only input.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::InvalidIdentifier {
                field: "user id",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(Self(id))
    }

    /// Access the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sort key of an application record under its owner.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApplicationKey {
    broker: String,
    account_number: String,
    ea_name: String,
    applied_at: Timestamp,
}

impl ApplicationKey {
    /// Build the key for a new application.
    pub fn new(
        broker: impl Into<String>,
        account_number: impl Into<String>,
        ea_name: impl Into<String>,
        applied_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        let broker = component("broker", broker.into())?;
        let account_number = component("account number", account_number.into())?;
        let ea_name = component("EA name", ea_name.into())?;
        Ok(Self {
            broker,
            account_number,
            ea_name,
            applied_at,
        })
    }

    /// Parse an encoded key (`APPLICATION#broker#account#ea#appliedAt`).
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let parts: Vec<&str> = s.split(SEPARATOR).collect();
        match parts.as_slice() {
            [APPLICATION_PREFIX, broker, account, ea, applied_at] => {
                Self::new(*broker, *account, *ea, Timestamp::parse(applied_at)?)
            }
            _ => Err(ValidationError::InvalidIdentifier {
                field: "application key",
                reason: format!("malformed key {s:?}"),
            }),
        }
    }

    /// The broker component.
    pub fn broker(&self) -> &str {
        &self.broker
    }

    /// The trading account number component.
    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    /// The EA name component.
    pub fn ea_name(&self) -> &str {
        &self.ea_name
    }

    /// When the application was submitted.
    pub fn applied_at(&self) -> Timestamp {
        self.applied_at
    }

    /// The encoded sort key.
    pub fn encode(&self) -> String {
        format!(
            "{APPLICATION_PREFIX}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
            self.broker, self.account_number, self.ea_name, self.applied_at
        )
    }
}

impl std::fmt::Display for ApplicationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

impl TryFrom<String> for ApplicationKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ApplicationKey> for String {
    fn from(key: ApplicationKey) -> Self {
        key.encode()
    }
}

/// Sort key of a history record, scoped under its application.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryKey(String);

impl HistoryKey {
    /// Allocate a fresh history key for a transition at `changed_at`.
    ///
    /// The random suffix keeps two transitions within the same second distinct.
    pub fn new(application: &ApplicationKey, changed_at: Timestamp) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{application}{SEPARATOR}{HISTORY_MARKER}{SEPARATOR}{changed_at}{SEPARATOR}{}",
            &suffix[..12]
        ))
    }

    /// Whether this history entry belongs to `application`.
    pub fn belongs_to(&self, application: &ApplicationKey) -> bool {
        self.0
            .strip_prefix(&application.encode())
            .is_some_and(|rest| rest.starts_with(&format!("{SEPARATOR}{HISTORY_MARKER}")))
    }

    /// Access the encoded key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HistoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn component(field: &'static str, value: String) -> Result<String, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::InvalidIdentifier {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    if value.contains(SEPARATOR) {
        return Err(ValidationError::InvalidIdentifier {
            field,
            reason: format!("must not contain {SEPARATOR:?}"),
        });
    }
    Ok(value)
}
