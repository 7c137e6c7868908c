//! # Application Record
//!
//! The persisted application, keyed by `(owner, application_key)`. Fields
//! are private: status, timestamps, and the retention deadline change only
//! through [`ApplicationStateMachine`](crate::ApplicationStateMachine), so a
//! record read from the store always satisfies the retention invariant
//! (deadline present exactly when the status is terminal).

use serde::{Deserialize, Serialize};

use sankey_core::{ApplicationKey, Timestamp, UserId};
use sankey_crypto::EncryptedLicense;

use crate::status::ApplicationStatus;

/// A license application and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub(crate) owner: UserId,
    pub(crate) application_key: ApplicationKey,
    pub(crate) status: ApplicationStatus,
    pub(crate) broker: String,
    pub(crate) account_number: String,
    pub(crate) ea_name: String,
    pub(crate) email: String,
    pub(crate) x_account: String,
    pub(crate) applied_at: Timestamp,
    pub(crate) updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) notification_scheduled_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) expiry_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) license_key: Option<EncryptedLicense>,
    /// Unix seconds after which the record may be purged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) retention_deadline: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) integration_test_marker: Option<String>,
    /// Incremented by every successful write through the state machine.
    #[serde(default)]
    pub(crate) revision: u64,
}

impl ApplicationRecord {
    /// Create a freshly submitted application in `Pending`.
    ///
    /// Broker, account number, EA name, and submission time are taken from
    /// the key so the two can never disagree.
    pub fn new_application(
        owner: UserId,
        application_key: ApplicationKey,
        email: impl Into<String>,
        x_account: impl Into<String>,
    ) -> Self {
        let applied_at = application_key.applied_at();
        Self {
            owner,
            broker: application_key.broker().to_string(),
            account_number: application_key.account_number().to_string(),
            ea_name: application_key.ea_name().to_string(),
            application_key,
            status: ApplicationStatus::Pending,
            email: email.into(),
            x_account: x_account.into(),
            applied_at,
            updated_at: applied_at,
            notification_scheduled_at: None,
            expiry_date: None,
            license_key: None,
            retention_deadline: None,
            integration_test_marker: None,
            revision: 0,
        }
    }

    /// Tag the record as created by an integration test run.
    pub fn with_integration_test_marker(mut self, marker: impl Into<String>) -> Self {
        self.integration_test_marker = Some(marker.into());
        self
    }

    /// Applicant who owns the record.
    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    /// Sort key within the owner's partition.
    pub fn application_key(&self) -> &ApplicationKey {
        &self.application_key
    }

    /// Current lifecycle status.
    pub fn status(&self) -> ApplicationStatus {
        self.status
    }

    /// Broker name from the key.
    pub fn broker(&self) -> &str {
        &self.broker
    }

    /// Trading account the license is bound to.
    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    /// EA product name.
    pub fn ea_name(&self) -> &str {
        &self.ea_name
    }

    /// Contact email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Applicant's X handle.
    pub fn x_account(&self) -> &str {
        &self.x_account
    }

    /// Submission time.
    pub fn applied_at(&self) -> Timestamp {
        self.applied_at
    }

    /// Time of the last status change; anchors the cancellation window.
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// When license issuance is due; set on scheduling.
    pub fn notification_scheduled_at(&self) -> Option<Timestamp> {
        self.notification_scheduled_at
    }

    /// License expiry; set on activation.
    pub fn expiry_date(&self) -> Option<Timestamp> {
        self.expiry_date
    }

    /// Sealed license; set on activation.
    pub fn license_key(&self) -> Option<&EncryptedLicense> {
        self.license_key.as_ref()
    }

    /// Unix seconds after which the record may be purged. Terminal records only.
    pub fn retention_deadline(&self) -> Option<i64> {
        self.retention_deadline
    }

    /// Marker of the test run that created the record, if any.
    pub fn integration_test_marker(&self) -> Option<&str> {
        self.integration_test_marker.as_deref()
    }

    /// Number of writes applied since submission.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether the retention deadline is present exactly when the status
    /// is terminal.
    pub fn satisfies_retention_invariant(&self) -> bool {
        self.retention_deadline.is_some() == self.status.is_terminal()
    }

    /// Whether the record is past its retention deadline at `now`.
    pub fn is_purgeable(&self, now: Timestamp) -> bool {
        self.retention_deadline
            .is_some_and(|deadline| deadline <= now.epoch_secs())
    }

    /// The snapshot a compare-and-swap must match to replace this record.
    pub fn expected_version(&self) -> ExpectedVersion {
        ExpectedVersion {
            status: self.status,
            revision: self.revision,
        }
    }
}

/// Optimistic-concurrency precondition for replacing a stored record.
///
/// Status alone is not enough: retention adjustments leave the status
/// unchanged, and two of them can land within the same second, so the
/// record's write counter is compared as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedVersion {
    /// Status the write was computed from.
    pub status: ApplicationStatus,
    /// Revision the write was computed from.
    pub revision: u64,
}

impl ExpectedVersion {
    /// Whether `stored` still matches this precondition.
    pub fn matches(&self, stored: &ApplicationRecord) -> bool {
        stored.status == self.status && stored.revision == self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ApplicationRecord {
        let key = ApplicationKey::new(
            "ICMarkets",
            "1234",
            "MyEA",
            Timestamp::parse("2026-01-15T12:00:00Z").unwrap(),
        )
        .unwrap();
        ApplicationRecord::new_application(
            UserId::new("user-42").unwrap(),
            key,
            "trader@example.com",
            "@trader",
        )
    }

    #[test]
    fn test_new_application_is_pending() {
        let r = record();
        assert_eq!(r.status(), ApplicationStatus::Pending);
        assert_eq!(r.broker(), "ICMarkets");
        assert_eq!(r.account_number(), "1234");
        assert_eq!(r.ea_name(), "MyEA");
        assert_eq!(r.applied_at(), r.updated_at());
        assert!(r.retention_deadline().is_none());
        assert!(r.license_key().is_none());
        assert!(r.satisfies_retention_invariant());
    }

    #[test]
    fn test_persisted_field_names() {
        let r = record().with_integration_test_marker("run-7");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "Pending");
        assert_eq!(json["accountNumber"], "1234");
        assert_eq!(json["xAccount"], "@trader");
        assert_eq!(
            json["applicationKey"],
            "APPLICATION#ICMarkets#1234#MyEA#2026-01-15T12:00:00Z"
        );
        assert_eq!(json["integrationTestMarker"], "run-7");
        assert_eq!(json["revision"], 0);
        assert!(json.get("retentionDeadline").is_none());
        let back: ApplicationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_purgeable_only_after_deadline() {
        let mut r = record();
        let now = Timestamp::parse("2026-06-01T00:00:00Z").unwrap();
        assert!(!r.is_purgeable(now));
        r.retention_deadline = Some(now.epoch_secs());
        assert!(r.is_purgeable(now));
        r.retention_deadline = Some(now.epoch_secs() + 1);
        assert!(!r.is_purgeable(now));
    }

    #[test]
    fn test_expected_version_tracks_revision() {
        let r = record();
        let expected = r.expected_version();
        assert!(expected.matches(&r));
        let mut touched = r.clone();
        touched.revision += 1;
        assert_eq!(touched.updated_at, r.updated_at);
        assert!(!expected.matches(&touched));
    }

    #[test]
    fn test_missing_revision_reads_as_zero() {
        let mut json = serde_json::to_value(record()).unwrap();
        json.as_object_mut().unwrap().remove("revision");
        let back: ApplicationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.revision(), 0);
    }
}
