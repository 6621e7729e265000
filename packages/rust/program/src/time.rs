//! Timestamp parsing for program entries.
//!
//! Programs state times in a handful of shapes: RFC 3339 with an offset,
//! ISO-like local date-times, or a date followed by a `HH:MM - HH:MM` range.
//! All of them are reduced to a zone-less wall-clock time.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

/// Local date-time layouts, tried in order after RFC 3339.
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Matches `2024-05-14 10:00 - 10:45` (hyphen or en dash).
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})[ T](\d{1,2}:\d{2})\s*[-–]\s*(\d{1,2}:\d{2})$")
        .expect("time range regex")
});

/// Parse a single timestamp, keeping the wall-clock time of any offset.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Parse `YYYY-MM-DD HH:MM - HH:MM` into begin and end.
///
/// An end earlier than the begin is taken to be on the following day.
pub fn parse_time_range(raw: &str) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let caps = RANGE_RE.captures(&collapsed)?;

    let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
    let begin = date.and_time(NaiveTime::parse_from_str(&caps[2], "%H:%M").ok()?);
    let mut end = date.and_time(NaiveTime::parse_from_str(&caps[3], "%H:%M").ok()?);

    if end < begin {
        end += Duration::days(1);
    }

    Some((begin, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_keeps_wall_clock() {
        let ts = parse_timestamp("2024-05-14T09:00:00+02:00").unwrap();
        assert_eq!(ts.to_string(), "2024-05-14 09:00:00");
    }

    #[test]
    fn local_formats() {
        assert_eq!(
            parse_timestamp("2024-05-14T10:00").unwrap().to_string(),
            "2024-05-14 10:00:00"
        );
        assert_eq!(
            parse_timestamp(" 2024-05-14 17:30:15 ").unwrap().to_string(),
            "2024-05-14 17:30:15"
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("tomorrow morning").is_none());
        assert!(parse_timestamp("2024-13-40 10:00").is_none());
    }

    #[test]
    fn range_with_hyphen_and_en_dash() {
        let (b, e) = parse_time_range("2024-05-15 11:00 - 11:30").unwrap();
        assert_eq!(b.to_string(), "2024-05-15 11:00:00");
        assert_eq!(e.to_string(), "2024-05-15 11:30:00");

        let (b, e) = parse_time_range("2024-05-15\n  9:15 – 9:55").unwrap();
        assert_eq!(b.to_string(), "2024-05-15 09:15:00");
        assert_eq!(e.to_string(), "2024-05-15 09:55:00");
    }

    #[test]
    fn range_past_midnight_rolls_over() {
        let (b, e) = parse_time_range("2024-05-15 23:30 - 00:15").unwrap();
        assert_eq!(b.to_string(), "2024-05-15 23:30:00");
        assert_eq!(e.to_string(), "2024-05-16 00:15:00");
    }
}
