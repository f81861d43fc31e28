//! Date/time recognition shared by type inference and row coercion.
//!
//! Remote payloads carry timestamps either as plain strings or as serialized
//! date objects (`{"date": "...", "timezone": "..."}`). Both end up as a wall
//! clock value stored as `YYYY-MM-DD HH:MM:SS`.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

/// Storage format for timestamp columns.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d %B %Y", "%d %b %Y", "%B %d, %Y", "%b %d, %Y"];

/// Parse a string that looks like a date or date/time.
///
/// Returns the wall clock value; values carrying an offset keep their own
/// local time.
pub fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    parse_with_offset(input).map(|(naive, _)| naive)
}

/// Convert a serialized date object into a wall clock value.
///
/// The optional `timezone` key is honored when it names a fixed offset
/// (`UTC`, `Z`, `+02:00`, ...) and the date itself carries an offset.
pub fn parse_date_object(object: &Map<String, Value>) -> Option<NaiveDateTime> {
    let raw = object.get("date")?.as_str()?;
    let (naive, offset) = parse_with_offset(raw)?;

    let target = object.get("timezone").and_then(Value::as_str).and_then(parse_offset);

    match (offset, target) {
        (Some(source), Some(target)) => {
            let instant = naive.and_local_timezone(source).single()?;
            Some(instant.with_timezone(&target).naive_local())
        }
        _ => Some(naive),
    }
}

/// Format a wall clock value for storage.
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_with_offset(input: &str) -> Option<(NaiveDateTime, Option<FixedOffset>)> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some((dt.naive_local(), Some(*dt.offset())));
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some((dt.naive_local(), Some(*dt.offset())));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some((naive, None));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some((date.and_hms_opt(0, 0, 0)?, None));
        }
    }

    None
}

fn parse_offset(name: &str) -> Option<FixedOffset> {
    match name.trim() {
        "UTC" | "utc" | "Z" | "GMT" => FixedOffset::east_opt(0),
        other => {
            let sign = match other.chars().next()? {
                '+' => 1,
                '-' => -1,
                _ => return None,
            };
            let digits: String = other[1..].chars().filter(char::is_ascii_digit).collect();
            if digits.len() != 4 {
                return None;
            }
            let hours: i32 = digits[..2].parse().ok()?;
            let minutes: i32 = digits[2..].parse().ok()?;
            FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        }
    }
}
