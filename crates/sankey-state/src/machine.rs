//! # Application State Machine
//!
//! A pure function of `(record, request)` to either a [`Transition`] or a
//! [`TransitionError`]. No I/O, no clock reads: the caller supplies `now`.
//!
//! ## Transition Table
//!
//! | Source               | Target               | Guard          | Action                  |
//! |----------------------|----------------------|----------------|-------------------------|
//! | Pending              | Approve              | ownership      | `APPROVE`               |
//! | Pending              | Rejected             | ownership      | `REJECT`                |
//! | Approve              | AwaitingNotification | system         | `SCHEDULE_NOTIFICATION` |
//! | AwaitingNotification | Cancelled            | ownership + window | `CANCEL`            |
//! | AwaitingNotification | Active               | system + license   | `ACTIVATE`          |
//! | Active               | Revoked              | ownership + license on record | `REVOKE` |
//! | Active               | Expired              | system         | `EXPIRE`                |
//!
//! Every other pair is [`TransitionError::InvalidTransition`].
//!
//! ## Effects
//!
//! Every successful transition sets `updatedAt = now`. Landing on a terminal
//! status stamps `retentionDeadline` from the [`RetentionPolicy`]; landing on
//! a non-terminal status clears it.

use thiserror::Error;

use sankey_core::{ErrorKind, LifecycleConfig, Timestamp, ValidationError};
use sankey_crypto::EncryptedLicense;

use crate::actor::Actor;
use crate::history::{HistoryAction, LedgerEntry};
use crate::record::{ApplicationRecord, ExpectedVersion};
use crate::retention::{RetentionError, RetentionPolicy};
use crate::status::ApplicationStatus;

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors that can occur during application lifecycle transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The (source, target) pair is not in the transition table.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: ApplicationStatus,
        /// Requested status.
        to: ApplicationStatus,
    },

    /// The cancellation window measured from `updatedAt` has lapsed.
    #[error("cancellation window expired: {elapsed_secs}s elapsed, window is {window_secs}s")]
    WindowExpired {
        /// Seconds since the record's last status change.
        elapsed_secs: i64,
        /// Configured window.
        window_secs: i64,
    },

    /// The actor fails the ownership or role guard.
    #[error("actor {actor} is not authorized for application owned by {owner}")]
    Unauthorized {
        /// The requesting actor.
        actor: String,
        /// The application owner.
        owner: String,
    },

    /// Activation without a sealed license, or revocation of a record that
    /// never had one.
    #[error("transition to {to} requires a license key")]
    MissingLicenseKey {
        /// Requested status.
        to: ApplicationStatus,
    },

    /// `now + notificationDelay` leaves the representable time range.
    #[error("notification delay from {now} is out of range")]
    NotificationOutOfRange {
        /// Scheduling time.
        now: Timestamp,
    },

    /// Retention can only be adjusted on a terminal record.
    #[error("retention can only be adjusted on terminal records (status is {status})")]
    NotTerminal {
        /// Current status.
        status: ApplicationStatus,
    },

    /// The retention deadline could not be computed or was rejected.
    #[error("invalid retention: {0}")]
    InvalidRetention(#[from] RetentionError),
}

impl TransitionError {
    /// Map onto the shared error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::WindowExpired { .. } => ErrorKind::WindowExpired,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::InvalidTransition { .. }
            | Self::MissingLicenseKey { .. }
            | Self::NotificationOutOfRange { .. }
            | Self::NotTerminal { .. }
            | Self::InvalidRetention(_) => ErrorKind::InvalidTransition,
        }
    }
}

// ─── Requests and Results ────────────────────────────────────────────

/// A sealed license and its expiry, supplied when activating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedLicense {
    /// The sealed license string stored on the record.
    pub license_key: EncryptedLicense,
    /// Expiry sealed inside the license.
    pub expiry_date: Timestamp,
}

/// A request to move a record to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    /// Requested status.
    pub target: ApplicationStatus,
    /// Who is asking.
    pub actor: Actor,
    /// Time of the request; becomes `updatedAt` on success.
    pub now: Timestamp,
    /// Ledger reason; the action's default when absent.
    pub reason: Option<String>,
    /// Required when `target` is `Active`.
    pub license: Option<IssuedLicense>,
}

impl TransitionRequest {
    /// A request with no reason and no license attached.
    pub fn new(target: ApplicationStatus, actor: Actor, now: Timestamp) -> Self {
        Self {
            target,
            actor,
            now,
            reason: None,
            license: None,
        }
    }

    /// Record `reason` in the ledger instead of the default.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attach the sealed license for an activation.
    pub fn with_license(mut self, license_key: EncryptedLicense, expiry_date: Timestamp) -> Self {
        self.license = Some(IssuedLicense {
            license_key,
            expiry_date,
        });
        self
    }
}

/// The outcome of a successful transition: the record to write, the
/// precondition the write must be conditioned on, and the ledger entry to
/// append once it lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The record after the transition.
    pub record: ApplicationRecord,
    /// Snapshot of the source record for the conditional write.
    pub expected: ExpectedVersion,
    /// History entry to append after the write.
    pub entry: LedgerEntry,
}

// ─── Transition Table ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Guard {
    /// Owner of the application, or an elevated actor.
    Ownership,
    /// The platform, or an elevated actor.
    System,
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    from: ApplicationStatus,
    to: ApplicationStatus,
    guard: Guard,
    action: HistoryAction,
}

static RULES: [Rule; 7] = {
    use ApplicationStatus::*;
    [
        Rule { from: Pending, to: Approve, guard: Guard::Ownership, action: HistoryAction::Approve },
        Rule { from: Pending, to: Rejected, guard: Guard::Ownership, action: HistoryAction::Reject },
        Rule {
            from: Approve,
            to: AwaitingNotification,
            guard: Guard::System,
            action: HistoryAction::ScheduleNotification,
        },
        Rule {
            from: AwaitingNotification,
            to: Cancelled,
            guard: Guard::Ownership,
            action: HistoryAction::Cancel,
        },
        Rule { from: AwaitingNotification, to: Active, guard: Guard::System, action: HistoryAction::Activate },
        Rule { from: Active, to: Revoked, guard: Guard::Ownership, action: HistoryAction::Revoke },
        Rule { from: Active, to: Expired, guard: Guard::System, action: HistoryAction::Expire },
    ]
};

fn rule_for(from: ApplicationStatus, to: ApplicationStatus) -> Option<&'static Rule> {
    RULES.iter().find(|r| r.from == from && r.to == to)
}

// ─── State Machine ───────────────────────────────────────────────────

/// Applies lifecycle transitions under a validated [`LifecycleConfig`].
#[derive(Debug, Clone)]
pub struct ApplicationStateMachine {
    config: LifecycleConfig,
    retention: RetentionPolicy,
}

impl ApplicationStateMachine {
    /// Build a machine, rejecting an invalid configuration up front.
    pub fn new(config: LifecycleConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self {
            retention: RetentionPolicy::from_config(&config),
            config,
        })
    }

    /// The validated configuration in effect.
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Whether `from -> to` appears in the transition table.
    pub fn is_allowed(from: ApplicationStatus, to: ApplicationStatus) -> bool {
        rule_for(from, to).is_some()
    }

    /// Statuses reachable from `from` in one step.
    pub fn targets(from: ApplicationStatus) -> impl Iterator<Item = ApplicationStatus> {
        RULES.iter().filter(move |r| r.from == from).map(|r| r.to)
    }

    /// Compute the result of applying `request` to `record`.
    pub fn apply(
        &self,
        record: &ApplicationRecord,
        request: &TransitionRequest,
    ) -> Result<Transition, TransitionError> {
        let result = self.try_apply(record, request);
        if let Err(e) = &result {
            tracing::debug!(
                application = %record.application_key,
                from = %record.status,
                to = %request.target,
                actor = %request.actor,
                error = %e,
                "transition rejected"
            );
        }
        result
    }

    fn try_apply(
        &self,
        record: &ApplicationRecord,
        request: &TransitionRequest,
    ) -> Result<Transition, TransitionError> {
        let from = record.status;
        let to = request.target;
        let now = request.now;
        let rule = rule_for(from, to).ok_or(TransitionError::InvalidTransition { from, to })?;

        match rule.guard {
            Guard::Ownership => require(request.actor.may_act_for(&record.owner), record, &request.actor)?,
            Guard::System => require(request.actor.may_act_as_system(), record, &request.actor)?,
        }

        let mut next = record.clone();
        match to {
            ApplicationStatus::AwaitingNotification => {
                let scheduled = now
                    .checked_add(self.config.notification_delay())
                    .ok_or(TransitionError::NotificationOutOfRange { now })?;
                next.notification_scheduled_at = Some(scheduled);
            }
            ApplicationStatus::Cancelled => {
                let elapsed = now.duration_since(&record.updated_at);
                if elapsed > self.config.cancellation_window() {
                    return Err(TransitionError::WindowExpired {
                        elapsed_secs: elapsed.num_seconds(),
                        window_secs: self.config.cancellation_window_secs,
                    });
                }
            }
            ApplicationStatus::Active => {
                let issued = request
                    .license
                    .as_ref()
                    .ok_or(TransitionError::MissingLicenseKey { to })?;
                next.license_key = Some(issued.license_key.clone());
                next.expiry_date = Some(issued.expiry_date);
            }
            ApplicationStatus::Revoked if record.license_key.is_none() => {
                return Err(TransitionError::MissingLicenseKey { to });
            }
            _ => {}
        }

        next.status = to;
        next.updated_at = now;
        next.retention_deadline = if RetentionPolicy::is_terminal(to) {
            Some(self.retention.compute_deadline(now)?)
        } else {
            None
        };

        Ok(Self::finish(record, next, rule.action, &request.actor, request.reason.clone(), now))
    }

    /// Operator override of a terminal record's retention deadline to
    /// `now + months` (negative shortens). The status is unchanged.
    pub fn adjust_retention(
        &self,
        record: &ApplicationRecord,
        actor: &Actor,
        now: Timestamp,
        months: i64,
        reason: Option<String>,
    ) -> Result<Transition, TransitionError> {
        require(actor.is_elevated(), record, actor)?;
        if !record.status.is_terminal() {
            return Err(TransitionError::NotTerminal {
                status: record.status,
            });
        }
        let deadline = RetentionPolicy::adjust_deadline(now, months)?;

        let mut next = record.clone();
        next.updated_at = now;
        next.retention_deadline = Some(deadline);
        Ok(Self::finish(record, next, HistoryAction::AdjustRetention, actor, reason, now))
    }

    fn finish(
        previous: &ApplicationRecord,
        mut next: ApplicationRecord,
        action: HistoryAction,
        actor: &Actor,
        reason: Option<String>,
        now: Timestamp,
    ) -> Transition {
        next.revision = previous.revision.wrapping_add(1);
        let entry = LedgerEntry {
            owner: next.owner.clone(),
            application_key: next.application_key.clone(),
            action,
            changed_by: actor.changed_by().to_string(),
            previous_status: previous.status,
            new_status: next.status,
            reason: reason.unwrap_or_else(|| action.default_reason().to_string()),
            retention_deadline: next.retention_deadline,
            changed_at: now,
        };
        Transition {
            expected: previous.expected_version(),
            record: next,
            entry,
        }
    }
}

fn require(allowed: bool, record: &ApplicationRecord, actor: &Actor) -> Result<(), TransitionError> {
    if allowed {
        Ok(())
    } else {
        Err(TransitionError::Unauthorized {
            actor: actor.to_string(),
            owner: record.owner.to_string(),
        })
    }
}
