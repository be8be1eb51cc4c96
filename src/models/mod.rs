//! Data models module
//!
//! Contains all data structures used throughout the game:
//! - User and challenge records
//! - Submission and progress types
//! - Leaderboard and statistics types

pub mod challenge;
pub mod stats;
pub mod submission;
pub mod user;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Render a timestamp the way it is stored.
///
/// Fixed microsecond precision keeps stored values lexically sortable.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 (what this crate writes) as well as SQLite's
/// `CURRENT_TIMESTAMP` layout (`YYYY-MM-DD HH:MM:SS`, implicitly UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let dt = parse_timestamp("2026-02-05T10:30:00Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2026, 2, 5, 10, 30, 0).unwrap());

        let offset = parse_timestamp("2026-02-05T12:30:00+02:00").unwrap();
        assert_eq!(offset, dt);
    }

    #[test]
    fn test_parse_timestamp_sqlite_layout() {
        let dt = parse_timestamp("2026-02-05 10:30:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2026, 2, 5, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_format_timestamp_round_trips() {
        let dt = Utc.with_ymd_and_hms(2026, 2, 5, 10, 30, 0).unwrap();
        let text = format_timestamp(dt);
        assert_eq!(text, "2026-02-05T10:30:00.000000Z");
        assert_eq!(parse_timestamp(&text).unwrap(), dt);
    }

    #[test]
    fn test_parse_timestamp_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
