//! Lenient timestamp parsing.
//!
//! Upstream timestamps arrive as local `YYYY-MM-DD HH:MM[:SS]` strings,
//! ISO/RFC3339, or occasionally garbage. Unparseable values are passed
//! through as opaque strings by the adapters, never dropped or defaulted.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Naive formats tried in order. `%.f` also matches an absent fraction.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Parse a timestamp string, returning `None` when nothing matches.
///
/// Offset-less values are taken as UTC; the backend and the imaging host
/// share a clock, and relative ordering is all the pipeline needs.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    // Bare dates show up on imported historical tickets.
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_space_separated() {
        let dt = parse_timestamp("2024-05-01 10:30:45").unwrap();
        assert_eq!((dt.year(), dt.hour(), dt.second()), (2024, 10, 45));
    }

    #[test]
    fn test_t_separated_without_seconds() {
        let dt = parse_timestamp("2024-05-01T10:30").unwrap();
        assert_eq!((dt.minute(), dt.second()), (30, 0));
    }

    #[test]
    fn test_slash_separated() {
        assert!(parse_timestamp("2024/05/01 10:30:45").is_some());
    }

    #[test]
    fn test_rfc3339_with_offset() {
        let dt = parse_timestamp("2024-05-01T10:30:45-03:00").unwrap();
        assert_eq!(dt.hour(), 13);
    }

    #[test]
    fn test_fractional_seconds() {
        assert!(parse_timestamp("2024-05-01T10:30:45.123").is_some());
    }

    #[test]
    fn test_bare_date() {
        let dt = parse_timestamp("2024-05-01").unwrap();
        assert_eq!((dt.hour(), dt.minute()), (0, 0));
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(parse_timestamp("ontem de manhã"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("01/05/2024"), None);
    }
}
