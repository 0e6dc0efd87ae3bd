//! Embedded-epoch timestamp decoding
//!
//! The VVO API serializes instants as `/Date(1644164100000-0000)/`: Unix
//! milliseconds followed by a signed `HHMM` UTC offset. Decoded values are
//! naive wall-clock times in that offset.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, TimeDelta};
use regex::Regex;

use crate::error::VvoError;

#[allow(clippy::unwrap_used)] // literal pattern
static TIMESTAMP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)([+-])(\d{2})(\d{2})").unwrap());

/// Decode an embedded-epoch timestamp into local wall-clock time
///
/// # Errors
///
/// Returns [`VvoError::InvalidTimestamp`] if no `<millis><sign><HHMM>`
/// sequence is present or the millisecond value is out of range.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, VvoError> {
    let invalid = || VvoError::InvalidTimestamp(raw.to_string());

    let caps = TIMESTAMP_PATTERN.captures(raw).ok_or_else(invalid)?;
    let millis: i64 = caps[1].parse().map_err(|_| invalid())?;
    let hours: i64 = caps[3].parse().map_err(|_| invalid())?;
    let minutes: i64 = caps[4].parse().map_err(|_| invalid())?;
    let offset_minutes = if &caps[2] == "-" {
        -(hours * 60 + minutes)
    } else {
        hours * 60 + minutes
    };

    let utc = DateTime::from_timestamp_millis(millis).ok_or_else(invalid)?;
    utc.naive_utc()
        .checked_add_signed(TimeDelta::minutes(offset_minutes))
        .ok_or_else(invalid)
}

/// Encode local wall-clock time with its UTC offset in the wire format
#[must_use]
pub fn format_timestamp(local: NaiveDateTime, offset_minutes: i32) -> String {
    let millis = (local - TimeDelta::minutes(i64::from(offset_minutes)))
        .and_utc()
        .timestamp_millis();
    let sign = if offset_minutes < 0 { '-' } else { '+' };
    let abs = offset_minutes.unsigned_abs();
    format!("/Date({millis}{sign}{:02}{:02})/", abs / 60, abs % 60)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 2, 6)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_parse_utc() {
        let parsed = parse_timestamp("/Date(1644164100000-0000)/").unwrap();
        assert_eq!(parsed, at(16, 15, 0));
    }

    #[test]
    fn test_parse_positive_offset() {
        let parsed = parse_timestamp("/Date(1644164100000+0100)/").unwrap();
        assert_eq!(parsed, at(17, 15, 0));
    }

    #[test]
    fn test_parse_offset_with_minutes() {
        let parsed = parse_timestamp("/Date(1644164100000-0130)/").unwrap();
        assert_eq!(parsed, at(14, 45, 0));
    }

    #[test]
    fn test_parse_keeps_milliseconds() {
        let parsed = parse_timestamp("/Date(1644164100250+0000)/").unwrap();
        assert_eq!(parsed.and_utc().timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_without_wrapper() {
        let parsed = parse_timestamp("1644164100000+0000").unwrap();
        assert_eq!(parsed, at(16, 15, 0));
    }

    #[test]
    fn test_parse_missing_pattern() {
        assert!(matches!(
            parse_timestamp("2022-02-06T16:15:00"),
            Err(VvoError::InvalidTimestamp(_))
        ));
        assert!(parse_timestamp("/Date(1644164100000)/").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(at(17, 15, 0), 60),
            "/Date(1644164100000+0100)/"
        );
        assert_eq!(
            format_timestamp(at(16, 15, 0), 0),
            "/Date(1644164100000+0000)/"
        );
        assert_eq!(
            format_timestamp(at(14, 45, 0), -90),
            "/Date(1644164100000-0130)/"
        );
    }
}
