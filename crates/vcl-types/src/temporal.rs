//! Wall-clock helpers. Every instant in the ledger is an integer count of
//! milliseconds since the UNIX epoch.

use chrono::{DateTime, Utc};

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Human-readable `dd/MM/yyyy HH:mm:ss` rendering in UTC.
///
/// Out-of-range instants fall back to the raw millisecond count.
pub fn format_display(millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(dt) => dt.format("%d/%m/%Y %H:%M:%S").to_string(),
        None => millis.to_string(),
    }
}

/// ISO-8601 rendering in UTC with second precision, e.g. `2024-03-01T12:00:00Z`.
pub fn format_iso(millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(dt) => dt.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        None => millis.to_string(),
    }
}
