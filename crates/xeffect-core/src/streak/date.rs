//! Calendar-date helpers for streak keys.
//!
//! Streak start dates are persisted as `YYYY-MM-DD` strings. Parsing is strict:
//! exactly four year digits, and the string must round-trip through
//! [`format_date`] unchanged, so `2024-1-5`, `2024-01-05T00:00` and
//! `+10000-01-01` are rejected.

use chrono::{Datelike, Duration, NaiveDate};

use crate::error::StreakError;

/// Storage format for streak dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Last year expressible as a four-digit `YYYY` key.
pub const MAX_YEAR: i32 = 9999;

/// Parse a `YYYY-MM-DD` string.
///
/// # Errors
/// Returns [`StreakError::DateParse`] if the value is not a canonical
/// calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, StreakError> {
    Some(value)
        .filter(|value| has_date_layout(value))
        .and_then(|value| NaiveDate::parse_from_str(value, DATE_FORMAT).ok())
        .filter(|date| format_date(*date) == value)
        .ok_or_else(|| StreakError::DateParse {
            value: value.to_string(),
        })
}

/// `DDDD-DD-DD`: ten ASCII characters, dashes at 4 and 7, digits elsewhere.
fn has_date_layout(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Whether `date` still formats as a four-digit-year key.
pub fn is_storable(date: NaiveDate) -> bool {
    (0..=MAX_YEAR).contains(&date.year())
}

/// Format a date as its storage key.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Shift a date by a (possibly negative) number of days, saturating at the
/// ends of chrono's calendar.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// Whole days from `earlier` to `later` (negative if `later` is before).
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}
