//! # License Workflow
//!
//! Glue between the pure state machine and the store: load the record,
//! compute the transition, write it with compare-and-swap, then append the
//! history record. A `ConcurrentModification` from the write is retried by
//! re-reading and recomputing from scratch, so guards are always evaluated
//! against the state that actually gets replaced.
//!
//! The history append happens only after the conditional write lands. If
//! the append itself fails the record change stands and the error is
//! returned to the caller.

use std::sync::Arc;

use thiserror::Error;

use sankey_core::{ApplicationKey, ErrorKind, LifecycleConfig, Timestamp, UserId, ValidationError};

use crate::actor::Actor;
use crate::history::{HistoryLedger, HistoryRecord};
use crate::machine::{ApplicationStateMachine, Transition, TransitionError, TransitionRequest};
use crate::record::ApplicationRecord;
use crate::store::{ApplicationStore, HistoryStore, StoreError};

/// Errors surfaced by [`LicenseWorkflow`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Every attempt lost the compare-and-swap race.
    #[error("gave up after {attempts} attempts due to concurrent modification")]
    RetriesExhausted {
        attempts: u32,
    },
}

impl WorkflowError {
    /// Map onto the shared error taxonomy, where one applies.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Transition(e) => Some(e.kind()),
            Self::Store(e) => e.kind(),
            Self::RetriesExhausted { .. } => Some(ErrorKind::ConcurrentModification),
        }
    }
}

/// A committed transition: the stored record and its audit entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// The record as stored.
    pub record: ApplicationRecord,
    /// The ledger entry appended for it.
    pub history: HistoryRecord,
}

/// Runs lifecycle transitions against a store.
#[derive(Debug)]
pub struct LicenseWorkflow<S> {
    store: Arc<S>,
    ledger: HistoryLedger<Arc<S>>,
    machine: ApplicationStateMachine,
}

impl<S: ApplicationStore + HistoryStore> LicenseWorkflow<S> {
    /// Build a workflow over `store`, validating `config`.
    pub fn new(store: Arc<S>, config: LifecycleConfig) -> Result<Self, ValidationError> {
        Ok(Self {
            ledger: HistoryLedger::new(Arc::clone(&store)),
            store,
            machine: ApplicationStateMachine::new(config)?,
        })
    }

    /// The state machine transitions are computed with.
    pub fn machine(&self) -> &ApplicationStateMachine {
        &self.machine
    }

    /// Persist a newly created application.
    pub fn submit(&self, record: &ApplicationRecord) -> Result<(), WorkflowError> {
        self.store.insert(record)?;
        tracing::info!(
            owner = %record.owner(),
            application = %record.application_key(),
            "application submitted"
        );
        Ok(())
    }

    /// Load one application.
    pub fn get(&self, owner: &UserId, key: &ApplicationKey) -> Result<ApplicationRecord, WorkflowError> {
        Ok(self.store.get(owner, key)?)
    }

    /// The application's audit trail, oldest first.
    pub fn history(&self, owner: &UserId, key: &ApplicationKey) -> Result<Vec<HistoryRecord>, WorkflowError> {
        Ok(self.ledger.list(owner, key)?)
    }

    /// Apply `request` to the stored application.
    pub fn transition(
        &self,
        owner: &UserId,
        key: &ApplicationKey,
        request: &TransitionRequest,
    ) -> Result<Applied, WorkflowError> {
        self.commit(owner, key, |record| self.machine.apply(record, request))
    }

    /// Operator override of a terminal application's retention deadline.
    pub fn adjust_retention(
        &self,
        owner: &UserId,
        key: &ApplicationKey,
        actor: &Actor,
        now: Timestamp,
        months: i64,
        reason: Option<String>,
    ) -> Result<Applied, WorkflowError> {
        self.commit(owner, key, |record| {
            self.machine
                .adjust_retention(record, actor, now, months, reason.clone())
        })
    }

    fn commit<F>(&self, owner: &UserId, key: &ApplicationKey, compute: F) -> Result<Applied, WorkflowError>
    where
        F: Fn(&ApplicationRecord) -> Result<Transition, TransitionError>,
    {
        let attempts = self.machine.config().max_cas_retries.saturating_add(1);
        for attempt in 1..=attempts {
            let current = self.store.get(owner, key)?;
            let transition = compute(&current)?;
            match self.store.compare_and_swap(&transition.expected, &transition.record) {
                Ok(()) => {
                    let history = self.ledger.append(transition.entry)?;
                    tracing::info!(
                        application = %key,
                        action = %history.action,
                        from = %history.previous_status,
                        to = %history.new_status,
                        changed_by = %history.changed_by,
                        attempt,
                        "transition applied"
                    );
                    return Ok(Applied {
                        record: transition.record,
                        history,
                    });
                }
                Err(StoreError::ConcurrentModification { .. }) => {
                    tracing::warn!(application = %key, attempt, "retrying after concurrent modification");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(WorkflowError::RetriesExhausted { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ExpectedVersion;
    use crate::status::ApplicationStatus;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    fn pending() -> ApplicationRecord {
        let key = ApplicationKey::new("ICMarkets", "1234", "MyEA", ts("2026-01-15T12:00:00Z")).unwrap();
        ApplicationRecord::new_application(alice(), key, "alice@example.com", "@alice")
    }

    /// Wraps a MemoryStore and makes the first `conflicts` CAS calls lose
    /// the race to a concurrent touch of the record.
    struct RacingStore {
        inner: MemoryStore,
        conflicts: AtomicU32,
    }

    impl ApplicationStore for RacingStore {
        fn get(&self, owner: &UserId, key: &ApplicationKey) -> Result<ApplicationRecord, StoreError> {
            self.inner.get(owner, key)
        }

        fn insert(&self, record: &ApplicationRecord) -> Result<(), StoreError> {
            self.inner.insert(record)
        }

        fn compare_and_swap(
            &self,
            expected: &ExpectedVersion,
            record: &ApplicationRecord,
        ) -> Result<(), StoreError> {
            if self.conflicts.load(Ordering::SeqCst) > 0 {
                self.conflicts.fetch_sub(1, Ordering::SeqCst);
                return Err(StoreError::ConcurrentModification {
                    expected: expected.status,
                    actual: expected.status,
                });
            }
            self.inner.compare_and_swap(expected, record)
        }
    }

    impl HistoryStore for RacingStore {
        fn append(&self, record: HistoryRecord) -> Result<(), StoreError> {
            self.inner.append(record)
        }

        fn list(&self, owner: &UserId, key: &ApplicationKey) -> Result<Vec<HistoryRecord>, StoreError> {
            self.inner.list(owner, key)
        }
    }

    fn racing(conflicts: u32) -> LicenseWorkflow<RacingStore> {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(),
            conflicts: AtomicU32::new(conflicts),
        });
        LicenseWorkflow::new(store, LifecycleConfig::default()).unwrap()
    }

    fn approve() -> TransitionRequest {
        TransitionRequest::new(
            ApplicationStatus::Approve,
            Actor::Owner(alice()),
            ts("2026-01-15T12:01:00Z"),
        )
    }

    #[test]
    fn test_transition_writes_record_and_history() {
        let wf = LicenseWorkflow::new(Arc::new(MemoryStore::new()), LifecycleConfig::default()).unwrap();
        let r = pending();
        wf.submit(&r).unwrap();
        let applied = wf.transition(r.owner(), r.application_key(), &approve()).unwrap();
        assert_eq!(applied.record.status(), ApplicationStatus::Approve);
        assert_eq!(wf.get(r.owner(), r.application_key()).unwrap(), applied.record);
        assert_eq!(wf.history(r.owner(), r.application_key()).unwrap(), vec![applied.history]);
    }

    #[test]
    fn test_rejected_transition_writes_nothing() {
        let wf = LicenseWorkflow::new(Arc::new(MemoryStore::new()), LifecycleConfig::default()).unwrap();
        let r = pending();
        wf.submit(&r).unwrap();
        let req = TransitionRequest::new(ApplicationStatus::Active, Actor::System, ts("2026-01-15T12:01:00Z"));
        let err = wf.transition(r.owner(), r.application_key(), &req).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidTransition));
        assert_eq!(wf.get(r.owner(), r.application_key()).unwrap(), r);
        assert!(wf.history(r.owner(), r.application_key()).unwrap().is_empty());
    }

    #[test]
    fn test_retries_through_transient_conflicts() {
        let wf = racing(2);
        let r = pending();
        wf.submit(&r).unwrap();
        let applied = wf.transition(r.owner(), r.application_key(), &approve()).unwrap();
        assert_eq!(applied.record.status(), ApplicationStatus::Approve);
        assert_eq!(wf.history(r.owner(), r.application_key()).unwrap().len(), 1);
    }

    #[test]
    fn test_gives_up_after_configured_retries() {
        let wf = racing(10);
        let r = pending();
        wf.submit(&r).unwrap();
        let err = wf.transition(r.owner(), r.application_key(), &approve()).unwrap_err();
        assert_eq!(err, WorkflowError::RetriesExhausted { attempts: 4 });
        assert_eq!(err.kind(), Some(ErrorKind::ConcurrentModification));
        assert!(wf.history(r.owner(), r.application_key()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_application() {
        let wf = LicenseWorkflow::new(Arc::new(MemoryStore::new()), LifecycleConfig::default()).unwrap();
        let r = pending();
        let err = wf.transition(r.owner(), r.application_key(), &approve()).unwrap_err();
        assert!(matches!(err, WorkflowError::Store(StoreError::NotFound { .. })));
        assert_eq!(err.kind(), None);
    }

    #[test]
    fn test_adjust_retention_is_audited() {
        let wf = LicenseWorkflow::new(Arc::new(MemoryStore::new()), LifecycleConfig::default()).unwrap();
        let r = pending();
        wf.submit(&r).unwrap();
        let reject = TransitionRequest::new(
            ApplicationStatus::Rejected,
            Actor::Owner(alice()),
            ts("2026-01-15T12:01:00Z"),
        );
        wf.transition(r.owner(), r.application_key(), &reject).unwrap();

        let ops = Actor::Elevated(UserId::new("ops").unwrap());
        let now = ts("2026-02-01T00:00:00Z");
        let applied = wf
            .adjust_retention(r.owner(), r.application_key(), &ops, now, 18, None)
            .unwrap();
        assert_eq!(
            applied.record.retention_deadline(),
            Some(ts("2027-08-01T00:00:00Z").epoch_secs())
        );

        let history = wf.history(r.owner(), r.application_key()).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].action.to_string(), "ADJUST_RETENTION");
        assert_eq!(history[1].changed_by, "ops");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = LifecycleConfig {
            cancellation_window_secs: 0,
            ..LifecycleConfig::default()
        };
        assert!(LicenseWorkflow::new(Arc::new(MemoryStore::new()), config).is_err());
    }
}
