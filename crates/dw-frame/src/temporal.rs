//! Timestamp parsing for scalar operands
//!
//! Column-wide parsing runs inside polars (`str().to_datetime`); this module
//! reads the single values that arrive as filter operands or JSON cells.
//! Every parsed timestamp is normalized to UTC: offset-carrying inputs are
//! converted, naive inputs are stamped as UTC.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::{DataType, TimeUnit};

const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Rewrite a trailing `Z` as `+00:00` and a trailing `+HHMM` as `+HH:MM`
#[must_use]
pub fn normalize_offset(input: &str) -> String {
    let s = input.trim();
    if let Some(stripped) = s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        return format!("{stripped}+00:00");
    }
    let bytes = s.as_bytes();
    if bytes.len() > 5 {
        let tail = &bytes[bytes.len() - 5..];
        let signed = tail[0] == b'+' || tail[0] == b'-';
        if signed && tail[1..].iter().all(u8::is_ascii_digit) && bytes[bytes.len() - 6].is_ascii_digit() {
            let split = s.len() - 2;
            return format!("{}:{}", &s[..split], &s[split..]);
        }
    }
    s.to_string()
}

/// Parse an ISO-8601 timestamp that carries an explicit offset (or `Z`)
#[must_use]
pub fn parse_aware(input: &str) -> Option<DateTime<Utc>> {
    let s = normalize_offset(input);
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Some(dt.with_timezone(&Utc));
    }
    AWARE_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(&s, fmt).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an ISO-8601 timestamp or date without offset, stamped as UTC
#[must_use]
pub fn parse_naive(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Parse a timestamp with an explicit strftime format, or generically as ISO-8601
#[must_use]
pub fn parse_datetime(input: &str, format: Option<&str>) -> Option<DateTime<Utc>> {
    let s = input.trim();
    match format {
        Some(fmt) => DateTime::parse_from_str(s, fmt)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(s, fmt).ok().map(|n| n.and_utc()))
            .or_else(|| {
                NaiveDate::parse_from_str(s, fmt)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|n| n.and_utc())
            }),
        None => parse_aware(s).or_else(|| parse_naive(s)),
    }
}

/// Check that a strftime format string contains no invalid specifiers
#[must_use]
pub fn is_valid_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Polars type of every timestamp column: microseconds in UTC
#[must_use]
pub fn utc_datetime() -> DataType {
    DataType::Datetime(TimeUnit::Microseconds, Some("UTC".into()))
}
