//! # Temporal Types: UTC-Only Timestamps
//!
//! `Timestamp` is a UTC timestamp truncated to seconds precision. Every
//! time value in the graph (effective-from, sunset, last-updated) uses it,
//! so temporal comparisons and canonical bytes agree on the same instant.
//!
//! Canonical rendering is `YYYY-MM-DDTHH:MM:SSZ`, no sub-seconds, no
//! `+00:00`, always `Z`.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`]: current UTC time, truncated.
/// - [`Timestamp::from_utc()`]: from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`]: from an RFC 3339 string, rejecting non-UTC offsets.
///
/// Deserialization goes through [`Timestamp::parse()`], so serde input obeys
/// the same rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
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

    /// Parse a timestamp from an RFC 3339 string.
    ///
    /// Only the `Z` suffix is accepted; explicit offsets (even `+00:00`)
    /// are rejected so that the canonical form is unambiguous.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTimestamp`] if the string is not
    /// valid RFC 3339 or does not use the `Z` suffix.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::InvalidTimestamp {
                value: s.to_string(),
                reason: "must use Z suffix (UTC only)".to_string(),
            });
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| ValidationError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Shift by a (possibly negative) number of whole days.
    ///
    /// Returns `None` on overflow of the representable range.
    pub fn checked_add_days(&self, days: i64) -> Option<Self> {
        let delta = Duration::try_days(days)?;
        self.0.checked_add_signed(delta).map(Self)
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl TryFrom<String> for Timestamp {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_utc(dt)
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

    #[test]
    fn now_has_no_subseconds() {
        assert_eq!(Timestamp::now().to_iso8601().len(), "2026-01-15T12:00:00Z".len());
    }

    #[test]
    fn from_utc_truncates() {
        let dt = Utc.with_ymd_and_hms(2024, 12, 30, 0, 0, 0).unwrap();
        let ts = Timestamp::from_utc(dt.with_nanosecond(999_000_000).unwrap());
        assert_eq!(ts.to_iso8601(), "2024-12-30T00:00:00Z");
    }

    #[test]
    fn parse_accepts_z_and_rejects_offsets() {
        assert!(Timestamp::parse("2025-02-02T00:00:00Z").is_ok());
        assert!(Timestamp::parse("2025-02-02T00:00:00+00:00").is_err());
        assert!(Timestamp::parse("2025-02-02T05:00:00+05:00").is_err());
        assert!(Timestamp::parse("2025-02-02").is_err());
        assert!(Timestamp::parse("").is_err());
    }

    #[test]
    fn deserialize_applies_parse_rules() {
        let ts: Timestamp = serde_json::from_str("\"2025-01-01T00:00:00.500Z\"").unwrap();
        assert_eq!(ts, Timestamp::parse("2025-01-01T00:00:00Z").unwrap());
        assert_eq!(serde_json::to_string(&ts).unwrap(), "\"2025-01-01T00:00:00Z\"");
        assert!(serde_json::from_str::<Timestamp>("\"2025-01-01T05:00:00+05:00\"").is_err());
        assert!(serde_json::from_str::<Timestamp>("\"yesterday\"").is_err());
    }

    #[test]
    fn parse_truncates_subseconds() {
        let ts = Timestamp::parse("2025-08-02T10:00:00.750Z").unwrap();
        assert_eq!(ts.to_iso8601(), "2025-08-02T10:00:00Z");
    }

    #[test]
    fn checked_add_days_moves_both_directions() {
        let ts = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        assert_eq!(
            ts.checked_add_days(30).unwrap().to_iso8601(),
            "2026-02-14T12:00:00Z"
        );
        assert_eq!(
            ts.checked_add_days(-15).unwrap().to_iso8601(),
            "2025-12-31T12:00:00Z"
        );
    }

    #[test]
    fn ordering_follows_time() {
        let earlier = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        let later = Timestamp::parse("2026-01-15T12:00:01Z").unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn serde_uses_z_suffix() {
        let ts = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2026-01-15T12:00:00Z\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
