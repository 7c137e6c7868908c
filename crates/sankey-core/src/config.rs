//! # Lifecycle Configuration
//!
//! The tunables of the application workflow, resolved once at the process
//! boundary (CLI flags, environment, a config file) and passed by value into
//! the retention policy and state machine. Nothing in the core reads the
//! environment.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Default retention of terminal records, in calendar months.
pub const DEFAULT_RETENTION_MONTHS: u32 = 6;

/// Default window after the last update during which an owner may cancel.
pub const DEFAULT_CANCELLATION_WINDOW_SECS: i64 = 5 * 60;

/// Default delay between approval and license issuance.
pub const DEFAULT_NOTIFICATION_DELAY_SECS: i64 = 5 * 60;

/// Default number of compare-and-swap retries for a single transition.
pub const DEFAULT_MAX_CAS_RETRIES: u32 = 3;

/// Immutable configuration for the application lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LifecycleConfig {
    /// How long terminal records are retained before the store may purge them.
    pub retention_months: u32,
    /// Cancellation window measured from the record's `updatedAt`.
    pub cancellation_window_secs: i64,
    /// Delay from scheduling to the downstream issuance step.
    pub notification_delay_secs: i64,
    /// Retries after a lost compare-and-swap before giving up.
    pub max_cas_retries: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            retention_months: DEFAULT_RETENTION_MONTHS,
            cancellation_window_secs: DEFAULT_CANCELLATION_WINDOW_SECS,
            notification_delay_secs: DEFAULT_NOTIFICATION_DELAY_SECS,
            max_cas_retries: DEFAULT_MAX_CAS_RETRIES,
        }
    }
}

impl LifecycleConfig {
    /// Check every field is within range.
    ///
    /// A zero retention would stamp a deadline equal to the write time,
    /// and a non-positive window would make cancellation unreachable.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.retention_months == 0 {
            return Err(ValidationError::InvalidConfig {
                field: "retention_months",
                reason: "must be at least 1".to_string(),
            });
        }
        if i32::try_from(self.retention_months).is_err() {
            return Err(ValidationError::InvalidConfig {
                field: "retention_months",
                reason: format!("{} is out of range", self.retention_months),
            });
        }
        if self.cancellation_window_secs <= 0 {
            return Err(ValidationError::InvalidConfig {
                field: "cancellation_window_secs",
                reason: "must be positive".to_string(),
            });
        }
        if self.notification_delay_secs <= 0 {
            return Err(ValidationError::InvalidConfig {
                field: "notification_delay_secs",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// The cancellation window as a duration.
    pub fn cancellation_window(&self) -> Duration {
        Duration::seconds(self.cancellation_window_secs)
    }

    /// The notification delay as a duration.
    pub fn notification_delay(&self) -> Duration {
        Duration::seconds(self.notification_delay_secs)
    }
}
