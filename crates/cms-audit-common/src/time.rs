//! ISO-8601 helpers for audit timestamps
//!
//! Timestamps are always stored and compared in UTC. Parsing accepts the
//! forms clients commonly send in query strings; values without an offset
//! are interpreted as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::error::{CommonError, Result};

/// Parse a date or instant into a UTC timestamp.
///
/// Accepted forms:
/// - RFC 3339 (`2024-03-01T12:00:00Z`, `2024-03-01T12:00:00+02:00`)
/// - naive date-time (`2024-03-01T12:00:00`, optional fractional seconds)
/// - plain date (`2024-03-01`, midnight UTC)
pub fn parse_instant(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| CommonError::InvalidDate(input.to_string()))
}

/// Format a timestamp as ISO-8601 with millisecond precision and a `Z` suffix.
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
