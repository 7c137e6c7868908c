//! # Retention Policy
//!
//! Terminal records carry a Unix-seconds deadline after which the store may
//! purge them. The deadline is computed at the moment of the terminal
//! transition by calendar-month arithmetic: a month end with no counterpart
//! clamps to the last day of the target month (Aug 31 + 6 months = Feb 28,
//! or Feb 29 in a leap year).

use thiserror::Error;

use sankey_core::config::DEFAULT_RETENTION_MONTHS;
use sankey_core::{LifecycleConfig, Timestamp};

use crate::status::ApplicationStatus;

/// Retention deadline computation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetentionError {
    /// The month offset leaves the representable calendar range.
    #[error("retention offset of {months} months from {from} is out of range")]
    OutOfRange {
        /// Anchor time.
        from: Timestamp,
        /// Requested offset.
        months: i64,
    },

    /// An adjusted deadline must lie strictly after the adjustment time.
    #[error("adjusted retention deadline {deadline} is not after {now}")]
    NotInFuture {
        /// Computed deadline (Unix seconds).
        deadline: i64,
        /// Adjustment time.
        now: Timestamp,
    },
}

/// Computes retention deadlines for terminal application records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    retention_months: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            retention_months: DEFAULT_RETENTION_MONTHS,
        }
    }
}

impl RetentionPolicy {
    /// Policy retaining terminal records for `retention_months` months.
    pub fn new(retention_months: u32) -> Self {
        Self { retention_months }
    }

    /// Policy using the configured retention period.
    pub fn from_config(config: &LifecycleConfig) -> Self {
        Self::new(config.retention_months)
    }

    /// Months added to the terminal transition time.
    pub fn retention_months(&self) -> u32 {
        self.retention_months
    }

    /// Whether records in `status` carry a retention deadline.
    pub fn is_terminal(status: ApplicationStatus) -> bool {
        status.is_terminal()
    }

    /// Deadline for a record entering a terminal status at `now`.
    pub fn compute_deadline(&self, now: Timestamp) -> Result<i64, RetentionError> {
        Self::deadline_after(now, i64::from(self.retention_months))
    }

    /// `now` shifted by `months` calendar months, in Unix seconds.
    pub fn deadline_after(now: Timestamp, months: i64) -> Result<i64, RetentionError> {
        let out_of_range = || RetentionError::OutOfRange { from: now, months };
        let months = i32::try_from(months).map_err(|_| out_of_range())?;
        now.checked_add_months(months)
            .map(|t| t.epoch_secs())
            .ok_or_else(out_of_range)
    }

    /// Operator override: recompute a deadline as `now + months`, which may
    /// be negative to shorten retention, as long as the result stays in
    /// the future.
    pub fn adjust_deadline(now: Timestamp, months: i64) -> Result<i64, RetentionError> {
        let deadline = Self::deadline_after(now, months)?;
        if deadline <= now.epoch_secs() {
            return Err(RetentionError::NotInFuture { deadline, now });
        }
        Ok(deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn secs(s: &str) -> i64 {
        ts(s).epoch_secs()
    }

    #[test]
    fn test_default_is_six_months() {
        let policy = RetentionPolicy::default();
        assert_eq!(policy.retention_months(), 6);
        assert_eq!(
            policy.compute_deadline(ts("2026-01-15T12:00:00Z")).unwrap(),
            secs("2026-07-15T12:00:00Z")
        );
    }

    #[test]
    fn test_month_end_clamps() {
        let policy = RetentionPolicy::default();
        assert_eq!(
            policy.compute_deadline(ts("2026-08-31T10:00:00Z")).unwrap(),
            secs("2027-02-28T10:00:00Z")
        );
        assert_eq!(
            policy.compute_deadline(ts("2027-08-31T10:00:00Z")).unwrap(),
            secs("2028-02-29T10:00:00Z")
        );
    }

    #[test]
    fn test_from_config() {
        let config = LifecycleConfig {
            retention_months: 12,
            ..LifecycleConfig::default()
        };
        let policy = RetentionPolicy::from_config(&config);
        assert_eq!(
            policy.compute_deadline(ts("2026-03-01T00:00:00Z")).unwrap(),
            secs("2027-03-01T00:00:00Z")
        );
    }

    #[test]
    fn test_terminal_classification() {
        for status in ApplicationStatus::ALL {
            assert_eq!(RetentionPolicy::is_terminal(status), status.is_terminal());
        }
    }

    #[test]
    fn test_adjust_can_shorten() {
        let now = ts("2026-10-19T00:00:00Z");
        let standard = RetentionPolicy::default().compute_deadline(now).unwrap();
        assert_eq!(standard, secs("2027-04-19T00:00:00Z"));

        let shortened = RetentionPolicy::adjust_deadline(now, 2).unwrap();
        assert_eq!(shortened, secs("2026-12-19T00:00:00Z"));
        assert!(shortened < standard);
    }

    #[test]
    fn test_adjust_can_extend() {
        let now = ts("2026-10-19T00:00:00Z");
        assert_eq!(
            RetentionPolicy::adjust_deadline(now, 24).unwrap(),
            secs("2028-10-19T00:00:00Z")
        );
    }

    #[test]
    fn test_adjust_rejects_non_future() {
        let now = ts("2026-10-19T00:00:00Z");
        assert_eq!(
            RetentionPolicy::adjust_deadline(now, 0),
            Err(RetentionError::NotInFuture {
                deadline: now.epoch_secs(),
                now,
            })
        );
        assert!(matches!(
            RetentionPolicy::adjust_deadline(now, -2),
            Err(RetentionError::NotInFuture { .. })
        ));
    }

    #[test]
    fn test_out_of_range() {
        let now = ts("2026-10-19T00:00:00Z");
        assert!(matches!(
            RetentionPolicy::deadline_after(now, i64::from(i32::MAX) + 1),
            Err(RetentionError::OutOfRange { .. })
        ));
        assert!(matches!(
            RetentionPolicy::deadline_after(now, i64::from(i32::MAX)),
            Err(RetentionError::OutOfRange { .. })
        ));
    }
}
