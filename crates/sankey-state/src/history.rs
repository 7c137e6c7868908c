//! # History Ledger
//!
//! Append-only audit trail. Every successful transition produces exactly
//! one [`HistoryRecord`], written after the application record's
//! compare-and-swap succeeds. Records are never updated; they inherit the
//! retention deadline of the transition that produced them and are purged
//! alongside their application.

use serde::{Deserialize, Serialize};

use sankey_core::{ApplicationKey, HistoryKey, Timestamp, UserId};

use crate::status::ApplicationStatus;
use crate::store::{HistoryStore, StoreError};

// ─── Action ──────────────────────────────────────────────────────────

/// The operation recorded by a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    /// `Pending → Approve`.
    Approve,
    /// `Pending → Rejected`.
    Reject,
    /// `Approve → AwaitingNotification`.
    ScheduleNotification,
    /// `AwaitingNotification → Cancelled`, inside the window.
    Cancel,
    /// `AwaitingNotification → Active`, with a sealed license.
    Activate,
    /// `Active → Revoked`.
    Revoke,
    /// `Active → Expired`.
    Expire,
    /// Operator override of a terminal record's retention deadline.
    AdjustRetention,
}

impl HistoryAction {
    /// Reason recorded when the caller supplies none.
    pub fn default_reason(&self) -> &'static str {
        match self {
            Self::Approve => "application approved",
            Self::Reject => "application rejected",
            Self::ScheduleNotification => "license issuance scheduled",
            Self::Cancel => "cancelled by owner",
            Self::Activate => "license issued",
            Self::Revoke => "license revoked",
            Self::Expire => "license expired",
            Self::AdjustRetention => "retention deadline adjusted",
        }
    }
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
            Self::ScheduleNotification => "SCHEDULE_NOTIFICATION",
            Self::Cancel => "CANCEL",
            Self::Activate => "ACTIVATE",
            Self::Revoke => "REVOKE",
            Self::Expire => "EXPIRE",
            Self::AdjustRetention => "ADJUST_RETENTION",
        };
        f.write_str(s)
    }
}

// ─── Records ─────────────────────────────────────────────────────────

/// Everything the ledger needs to record one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Owner of the application.
    pub owner: UserId,
    /// Application the entry belongs to.
    pub application_key: ApplicationKey,
    /// What happened.
    pub action: HistoryAction,
    /// Acting user id, or `system`.
    pub changed_by: String,
    /// Status before the write.
    pub previous_status: ApplicationStatus,
    /// Status after the write.
    pub new_status: ApplicationStatus,
    /// Free-text reason.
    pub reason: String,
    /// Deadline of the application record after the transition.
    pub retention_deadline: Option<i64>,
    /// Time of the transition.
    pub changed_at: Timestamp,
}

/// An immutable audit record. Fields mirror [`LedgerEntry`], plus the
/// history key it is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// Owner of the application.
    pub owner: UserId,
    /// Sort key, scoped under the application.
    pub history_key: HistoryKey,
    /// Application the record belongs to.
    pub application_key: ApplicationKey,
    /// What happened.
    pub action: HistoryAction,
    /// Acting user id, or `system`.
    pub changed_by: String,
    /// Status before the write.
    pub previous_status: ApplicationStatus,
    /// Status after the write.
    pub new_status: ApplicationStatus,
    /// Free-text reason.
    pub reason: String,
    /// Time of the transition.
    pub changed_at: Timestamp,
    /// Inherited from the transition; the record is purged with its
    /// application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_deadline: Option<i64>,
}

impl HistoryRecord {
    /// Materialize an entry under a freshly allocated history key.
    pub fn from_entry(entry: LedgerEntry) -> Self {
        Self {
            history_key: HistoryKey::new(&entry.application_key, entry.changed_at),
            owner: entry.owner,
            application_key: entry.application_key,
            action: entry.action,
            changed_by: entry.changed_by,
            previous_status: entry.previous_status,
            new_status: entry.new_status,
            reason: entry.reason,
            changed_at: entry.changed_at,
            retention_deadline: entry.retention_deadline,
        }
    }

    /// Whether the record is past its retention deadline at `now`.
    pub fn is_purgeable(&self, now: Timestamp) -> bool {
        self.retention_deadline
            .is_some_and(|deadline| deadline <= now.epoch_secs())
    }
}

// ─── Ledger ──────────────────────────────────────────────────────────

/// Append-only writer over a [`HistoryStore`].
#[derive(Debug, Clone)]
pub struct HistoryLedger<H> {
    sink: H,
}

impl<H: HistoryStore> HistoryLedger<H> {
    /// Ledger writing to `sink`.
    pub fn new(sink: H) -> Self {
        Self { sink }
    }

    /// Write exactly one record for `entry` and return it.
    pub fn append(&self, entry: LedgerEntry) -> Result<HistoryRecord, StoreError> {
        let record = HistoryRecord::from_entry(entry);
        self.sink.append(record.clone())?;
        tracing::debug!(
            application = %record.application_key,
            action = %record.action,
            from = %record.previous_status,
            to = %record.new_status,
            "history appended"
        );
        Ok(record)
    }

    /// All records for one application, in `changed_at` order.
    pub fn list(
        &self,
        owner: &UserId,
        application_key: &ApplicationKey,
    ) -> Result<Vec<HistoryRecord>, StoreError> {
        self.sink.list(owner, application_key)
    }
}
