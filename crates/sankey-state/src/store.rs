//! # Persistence Contract
//!
//! The license core never talks to a database. Callers supply an
//! [`ApplicationStore`] with a conditional write, and a [`HistoryStore`]
//! that only appends. [`MemoryStore`] implements both for tests and local
//! tooling, and models the external TTL sweep with
//! [`MemoryStore::purge_expired`].
//!
//! ## Compare-and-Swap
//!
//! A replacement is conditioned on the [`ExpectedVersion`] taken from the
//! snapshot the transition was computed from. If another writer got there
//! first the write fails with [`StoreError::ConcurrentModification`] and the
//! caller must re-read and recompute.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use sankey_core::{ApplicationKey, ErrorKind, Timestamp, UserId};

use crate::history::HistoryRecord;
use crate::record::{ApplicationRecord, ExpectedVersion};
use crate::status::ApplicationStatus;

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors reported by a store implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No record under the given key.
    #[error("application {application_key} of {owner} not found")]
    NotFound {
        /// Requested owner.
        owner: String,
        /// Requested application.
        application_key: String,
    },

    /// Insert of a key that is already present.
    #[error("application {application_key} of {owner} already exists")]
    AlreadyExists {
        /// Owner of the existing record.
        owner: String,
        /// Key of the existing record.
        application_key: String,
    },

    /// The stored record no longer matches the expected snapshot.
    #[error("concurrent modification: expected {expected}, found {actual}")]
    ConcurrentModification {
        /// Status the writer computed from.
        expected: ApplicationStatus,
        /// Status currently stored.
        actual: ApplicationStatus,
    },

    /// Failure inside the storage backend.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn not_found(owner: &UserId, key: &ApplicationKey) -> Self {
        Self::NotFound {
            owner: owner.to_string(),
            application_key: key.to_string(),
        }
    }

    /// Map onto the shared error taxonomy. Missing records and backend
    /// failures sit outside it.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::ConcurrentModification { .. } => Some(ErrorKind::ConcurrentModification),
            Self::NotFound { .. } | Self::AlreadyExists { .. } | Self::Backend(_) => None,
        }
    }
}

// ─── Traits ──────────────────────────────────────────────────────────

/// Keyed storage for application records with a conditional write.
pub trait ApplicationStore {
    /// Load one record. Fails with `NotFound` if absent.
    fn get(&self, owner: &UserId, key: &ApplicationKey) -> Result<ApplicationRecord, StoreError>;

    /// Store a new record. Fails with `AlreadyExists` if the key is taken.
    fn insert(&self, record: &ApplicationRecord) -> Result<(), StoreError>;

    /// Replace the stored record if it still matches `expected`.
    fn compare_and_swap(
        &self,
        expected: &ExpectedVersion,
        record: &ApplicationRecord,
    ) -> Result<(), StoreError>;
}

/// Append-only storage for history records.
pub trait HistoryStore {
    /// Store a new history record. Existing records are never touched.
    fn append(&self, record: HistoryRecord) -> Result<(), StoreError>;

    /// Records for one application, ordered by `changedAt`.
    fn list(
        &self,
        owner: &UserId,
        application_key: &ApplicationKey,
    ) -> Result<Vec<HistoryRecord>, StoreError>;
}

impl<T: ApplicationStore + ?Sized> ApplicationStore for Arc<T> {
    fn get(&self, owner: &UserId, key: &ApplicationKey) -> Result<ApplicationRecord, StoreError> {
        (**self).get(owner, key)
    }

    fn insert(&self, record: &ApplicationRecord) -> Result<(), StoreError> {
        (**self).insert(record)
    }

    fn compare_and_swap(
        &self,
        expected: &ExpectedVersion,
        record: &ApplicationRecord,
    ) -> Result<(), StoreError> {
        (**self).compare_and_swap(expected, record)
    }
}

impl<T: HistoryStore + ?Sized> HistoryStore for Arc<T> {
    fn append(&self, record: HistoryRecord) -> Result<(), StoreError> {
        (**self).append(record)
    }

    fn list(
        &self,
        owner: &UserId,
        application_key: &ApplicationKey,
    ) -> Result<Vec<HistoryRecord>, StoreError> {
        (**self).list(owner, application_key)
    }
}

// ─── In-Memory Store ─────────────────────────────────────────────────

type RecordKey = (UserId, ApplicationKey);

/// Counts of records removed by [`MemoryStore::purge_expired`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Application records removed.
    pub applications: usize,
    /// History records removed.
    pub history: usize,
}

/// Thread-safe in-memory store. Locks are `parking_lot` and never held
/// across calls into caller code.
#[derive(Debug, Default)]
pub struct MemoryStore {
    applications: RwLock<BTreeMap<RecordKey, ApplicationRecord>>,
    history: RwLock<Vec<HistoryRecord>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored application records.
    pub fn application_count(&self) -> usize {
        self.applications.read().len()
    }

    /// Number of stored history records.
    pub fn history_count(&self) -> usize {
        self.history.read().len()
    }

    /// Drop every record whose retention deadline is at or before `now`,
    /// as the production store's TTL sweep would.
    pub fn purge_expired(&self, now: Timestamp) -> PurgeReport {
        let mut report = PurgeReport::default();
        {
            let mut apps = self.applications.write();
            let before = apps.len();
            apps.retain(|_, r| !r.is_purgeable(now));
            report.applications = before - apps.len();
        }
        {
            let mut history = self.history.write();
            let before = history.len();
            history.retain(|r| !r.is_purgeable(now));
            report.history = before - history.len();
        }
        tracing::info!(
            now = %now,
            applications = report.applications,
            history = report.history,
            "purged expired records"
        );
        report
    }
}

impl ApplicationStore for MemoryStore {
    fn get(&self, owner: &UserId, key: &ApplicationKey) -> Result<ApplicationRecord, StoreError> {
        self.applications
            .read()
            .get(&(owner.clone(), key.clone()))
            .cloned()
            .ok_or_else(|| StoreError::not_found(owner, key))
    }

    fn insert(&self, record: &ApplicationRecord) -> Result<(), StoreError> {
        let key = (record.owner().clone(), record.application_key().clone());
        let mut apps = self.applications.write();
        if apps.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                owner: key.0.to_string(),
                application_key: key.1.to_string(),
            });
        }
        apps.insert(key, record.clone());
        Ok(())
    }

    fn compare_and_swap(
        &self,
        expected: &ExpectedVersion,
        record: &ApplicationRecord,
    ) -> Result<(), StoreError> {
        let key = (record.owner().clone(), record.application_key().clone());
        let mut apps = self.applications.write();
        let stored = apps
            .get_mut(&key)
            .ok_or_else(|| StoreError::not_found(&key.0, &key.1))?;
        if !expected.matches(stored) {
            tracing::warn!(
                application = %key.1,
                expected = %expected.status,
                actual = %stored.status(),
                "compare-and-swap conflict"
            );
            return Err(StoreError::ConcurrentModification {
                expected: expected.status,
                actual: stored.status(),
            });
        }
        *stored = record.clone();
        Ok(())
    }
}

impl HistoryStore for MemoryStore {
    fn append(&self, record: HistoryRecord) -> Result<(), StoreError> {
        self.history.write().push(record);
        Ok(())
    }

    fn list(
        &self,
        owner: &UserId,
        application_key: &ApplicationKey,
    ) -> Result<Vec<HistoryRecord>, StoreError> {
        let mut records: Vec<_> = self
            .history
            .read()
            .iter()
            .filter(|r| &r.owner == owner && r.history_key.belongs_to(application_key))
            .cloned()
            .collect();
        // Stable: same-second records keep append order.
        records.sort_by_key(|r| r.changed_at);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::machine::{ApplicationStateMachine, TransitionRequest};
    use sankey_core::LifecycleConfig;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn owner() -> UserId {
        UserId::new("alice").unwrap()
    }

    fn pending(applied_at: &str) -> ApplicationRecord {
        let key = ApplicationKey::new("ICMarkets", "1234", "MyEA", ts(applied_at)).unwrap();
        ApplicationRecord::new_application(owner(), key, "alice@example.com", "@alice")
    }

    fn machine() -> ApplicationStateMachine {
        ApplicationStateMachine::new(LifecycleConfig::default()).unwrap()
    }

    // ── Insert / get ─────────────────────────────────────────────────

    #[test]
    fn test_insert_then_get() {
        let store = MemoryStore::new();
        let r = pending("2026-01-15T12:00:00Z");
        store.insert(&r).unwrap();
        assert_eq!(store.get(r.owner(), r.application_key()).unwrap(), r);
        assert_eq!(store.application_count(), 1);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let store = MemoryStore::new();
        let r = pending("2026-01-15T12:00:00Z");
        store.insert(&r).unwrap();
        assert!(matches!(store.insert(&r), Err(StoreError::AlreadyExists { .. })));
    }

    #[test]
    fn test_get_missing() {
        let store = MemoryStore::new();
        let r = pending("2026-01-15T12:00:00Z");
        let err = store.get(r.owner(), r.application_key()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(err.kind(), None);
    }

    // ── Compare-and-swap ─────────────────────────────────────────────

    #[test]
    fn test_cas_succeeds_on_fresh_snapshot() {
        let store = MemoryStore::new();
        let r = pending("2026-01-15T12:00:00Z");
        store.insert(&r).unwrap();
        let req = TransitionRequest::new(
            ApplicationStatus::Approve,
            Actor::Owner(owner()),
            ts("2026-01-15T12:01:00Z"),
        );
        let t = machine().apply(&r, &req).unwrap();
        store.compare_and_swap(&t.expected, &t.record).unwrap();
        assert_eq!(
            store.get(r.owner(), r.application_key()).unwrap().status(),
            ApplicationStatus::Approve
        );
    }

    #[test]
    fn test_cas_detects_lost_update() {
        let store = MemoryStore::new();
        let r = pending("2026-01-15T12:00:00Z");
        store.insert(&r).unwrap();
        let now = ts("2026-01-15T12:01:00Z");
        let m = machine();

        // Two requests computed from the same snapshot.
        let approve = m
            .apply(&r, &TransitionRequest::new(ApplicationStatus::Approve, Actor::Owner(owner()), now))
            .unwrap();
        let reject = m
            .apply(&r, &TransitionRequest::new(ApplicationStatus::Rejected, Actor::Owner(owner()), now))
            .unwrap();

        store.compare_and_swap(&approve.expected, &approve.record).unwrap();
        let err = store
            .compare_and_swap(&reject.expected, &reject.record)
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::ConcurrentModification {
                expected: ApplicationStatus::Pending,
                actual: ApplicationStatus::Approve,
            }
        );
        assert_eq!(err.kind(), Some(ErrorKind::ConcurrentModification));
        assert!(ErrorKind::ConcurrentModification.is_retryable());
    }

    #[test]
    fn test_cas_detects_same_status_race() {
        let store = MemoryStore::new();
        let r = pending("2026-01-15T12:00:00Z");
        store.insert(&r).unwrap();
        let mut touched = r.clone();
        touched.revision += 1;
        store.compare_and_swap(&r.expected_version(), &touched).unwrap();
        assert!(matches!(
            store.compare_and_swap(&r.expected_version(), &r),
            Err(StoreError::ConcurrentModification { .. })
        ));
    }

    #[test]
    fn test_same_second_overrides_do_not_lose_writes() {
        let store = MemoryStore::new();
        let m = machine();
        let now = ts("2026-01-15T12:01:00Z");
        let r = pending("2026-01-15T12:00:00Z");
        store.insert(&r).unwrap();
        let reject = m
            .apply(&r, &TransitionRequest::new(ApplicationStatus::Rejected, Actor::Owner(owner()), now))
            .unwrap();
        store.compare_and_swap(&reject.expected, &reject.record).unwrap();

        // Two overrides from the same snapshot, in the same second as the reject.
        let snapshot = store.get(r.owner(), r.application_key()).unwrap();
        let ops = Actor::Elevated(UserId::new("ops").unwrap());
        let hold = m.adjust_retention(&snapshot, &ops, now, 24, None).unwrap();
        let short = m.adjust_retention(&snapshot, &ops, now, 1, None).unwrap();
        assert_eq!(hold.record.updated_at(), short.record.updated_at());

        store.compare_and_swap(&hold.expected, &hold.record).unwrap();
        assert!(matches!(
            store.compare_and_swap(&short.expected, &short.record),
            Err(StoreError::ConcurrentModification { .. })
        ));
        assert_eq!(
            store.get(r.owner(), r.application_key()).unwrap().retention_deadline(),
            hold.record.retention_deadline()
        );
    }

    #[test]
    fn test_cas_on_missing_record() {
        let store = MemoryStore::new();
        let r = pending("2026-01-15T12:00:00Z");
        assert!(matches!(
            store.compare_and_swap(&r.expected_version(), &r),
            Err(StoreError::NotFound { .. })
        ));
    }

    // ── Purge ────────────────────────────────────────────────────────

    #[test]
    fn test_purge_respects_deadline() {
        let store = MemoryStore::new();
        let live = pending("2026-01-15T12:00:00Z");
        let mut done = pending("2026-01-16T12:00:00Z");
        done.status = ApplicationStatus::Rejected;
        done.retention_deadline = Some(ts("2026-07-16T12:00:00Z").epoch_secs());
        store.insert(&live).unwrap();
        store.insert(&done).unwrap();

        let report = store.purge_expired(ts("2026-07-16T11:59:59Z"));
        assert_eq!(report, PurgeReport::default());

        let report = store.purge_expired(ts("2026-07-16T12:00:00Z"));
        assert_eq!(report.applications, 1);
        assert_eq!(store.application_count(), 1);
        assert!(store.get(live.owner(), live.application_key()).is_ok());
    }
}
