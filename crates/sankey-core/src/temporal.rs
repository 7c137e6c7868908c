//! # Temporal Types — UTC-Only Timestamps
//!
//! Defines `Timestamp`, a UTC timestamp truncated to seconds precision.
//! Application and history records carry ISO-8601 strings with a `Z`
//! suffix, while retention deadlines are stored as epoch seconds so the
//! record store's expiry sweep can act on them directly. Both views come
//! from the same value.
//!
//! ## Calendar Arithmetic
//!
//! [`Timestamp::checked_add_months`] uses calendar-month rollover with
//! month-end clamping: 31 August plus six months is 28 (or 29) February,
//! never 3 March.

use chrono::{DateTime, Duration, Months, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`] — current UTC time, truncated.
/// - [`Timestamp::from_utc()`] — from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`] — strict ISO-8601 with `Z` suffix.
/// - [`Timestamp::parse_lenient()`] — any RFC 3339 offset, converted to UTC.
/// - [`Timestamp::from_epoch_secs()`] — from Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a timestamp from an RFC 3339 string with a `Z` suffix.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTimestamp`] if the string is not
    /// valid RFC 3339 or carries an explicit offset.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::InvalidTimestamp {
                value: s.to_string(),
                reason: "must use Z suffix (UTC only)".to_string(),
            });
        }
        Self::parse_lenient(s)
    }

    /// Parse a timestamp from an RFC 3339 string, accepting any offset and
    /// converting to UTC.
    ///
    /// License payloads are produced by several issuers over time, so the
    /// `expiry` and `issuedAt` fields are read with this parser.
    pub fn parse_lenient(s: &str) -> Result<Self, ValidationError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| ValidationError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Create a timestamp from a Unix epoch timestamp (seconds).
    pub fn from_epoch_secs(secs: i64) -> Result<Self, ValidationError> {
        let dt = DateTime::from_timestamp(secs, 0).ok_or_else(|| ValidationError::InvalidTimestamp {
            value: secs.to_string(),
            reason: "out of range".to_string(),
        })?;
        Ok(Self(dt))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Render as ISO-8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    /// Add (or, for negative values, subtract) whole calendar months.
    ///
    /// Returns `None` if the result falls outside chrono's representable range.
    pub fn checked_add_months(&self, months: i32) -> Option<Self> {
        let shifted = if months >= 0 {
            self.0.checked_add_months(Months::new(months.unsigned_abs()))
        } else {
            self.0.checked_sub_months(Months::new(months.unsigned_abs()))
        }?;
        Some(Self(shifted))
    }

    /// Add a signed duration. Returns `None` on overflow.
    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        self.0
            .checked_add_signed(duration)
            .map(truncate_to_seconds)
            .map(Self)
    }

    /// Signed duration elapsed from `earlier` to `self`. Negative when
    /// `earlier` is in the future relative to `self`.
    pub fn duration_since(&self, earlier: &Timestamp) -> Duration {
        self.0.signed_duration_since(earlier.0)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// Truncate a `DateTime<Utc>` to seconds precision (discard nanoseconds).
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    #[test]
    fn test_now_has_no_subseconds() {
        let now = Timestamp::now();
        assert_eq!(now.as_datetime().nanosecond(), 0);
    }

    #[test]
    fn test_from_utc_truncates() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 12, 30, 45).unwrap();
        let dt = dt.with_nanosecond(123_456_789).unwrap();
        assert_eq!(Timestamp::from_utc(dt).to_iso8601(), "2026-01-15T12:30:45Z");
    }

    // ---- parsing ----

    #[test]
    fn test_parse_z_suffix_accepted() {
        assert_eq!(ts("2026-01-15T12:00:00Z").to_iso8601(), "2026-01-15T12:00:00Z");
    }

    #[test]
    fn test_parse_offset_rejected_strict() {
        assert!(Timestamp::parse("2026-01-15T12:00:00+00:00").is_err());
        assert!(Timestamp::parse("2026-01-15T17:00:00+05:00").is_err());
    }

    #[test]
    fn test_parse_lenient_converts_offset() {
        let parsed = Timestamp::parse_lenient("2026-01-15T17:00:00+05:00").unwrap();
        assert_eq!(parsed.to_iso8601(), "2026-01-15T12:00:00Z");
    }

    #[test]
    fn test_parse_millis_truncated() {
        assert_eq!(ts("2025-12-31T23:59:59.000Z").to_iso8601(), "2025-12-31T23:59:59Z");
    }

    #[test]
    fn test_parse_invalid_format() {
        assert!(Timestamp::parse("not-a-date").is_err());
        assert!(Timestamp::parse("2026-01-15").is_err());
        assert!(Timestamp::parse("").is_err());
    }

    #[test]
    fn test_epoch_roundtrip() {
        let t = ts("2026-01-15T12:00:00Z");
        assert_eq!(Timestamp::from_epoch_secs(t.epoch_secs()).unwrap(), t);
    }

    // ---- calendar arithmetic ----

    #[test]
    fn test_add_six_months() {
        let t = ts("2026-01-15T12:00:00Z");
        assert_eq!(t.checked_add_months(6).unwrap().to_iso8601(), "2026-07-15T12:00:00Z");
    }

    #[test]
    fn test_add_months_clamps_to_month_end() {
        let t = ts("2026-08-31T10:00:00Z");
        assert_eq!(t.checked_add_months(6).unwrap().to_iso8601(), "2027-02-28T10:00:00Z");
        let leap = ts("2027-08-31T10:00:00Z");
        assert_eq!(leap.checked_add_months(6).unwrap().to_iso8601(), "2028-02-29T10:00:00Z");
    }

    #[test]
    fn test_subtract_months() {
        let t = ts("2026-03-31T00:00:00Z");
        assert_eq!(t.checked_add_months(-1).unwrap().to_iso8601(), "2026-02-28T00:00:00Z");
    }

    #[test]
    fn test_add_duration_and_elapsed() {
        let t = ts("2026-01-15T12:00:00Z");
        let later = t.checked_add(Duration::minutes(3)).unwrap();
        assert_eq!(later.to_iso8601(), "2026-01-15T12:03:00Z");
        assert_eq!(later.duration_since(&t), Duration::seconds(180));
        assert_eq!(t.duration_since(&later), Duration::seconds(-180));
    }

    #[test]
    fn test_serde_roundtrip() {
        let t = ts("2026-01-15T12:00:00Z");
        let json = serde_json::to_string(&t).unwrap();
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(t, parsed);
    }
}
