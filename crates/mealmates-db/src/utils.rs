//! Shared utility functions

use chrono::{DateTime, NaiveDate, Utc};

/// Parse a datetime string (RFC3339 format) or return current time
///
/// Stored timestamps are always written by this crate, so a parse failure
/// only happens on hand-edited rows.
pub fn parse_datetime_or_now(s: &str) -> DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Parse a client supplied date: either a full RFC3339 timestamp or a
/// plain `YYYY-MM-DD` calendar date (taken as midnight UTC).
pub fn parse_client_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
