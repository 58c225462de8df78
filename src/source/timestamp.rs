//! Parsing of timestamps stored as text or integers in the source store.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Integers at or above this magnitude are read as epoch milliseconds
/// rather than seconds (1e11 seconds is past the year 5000).
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 style timestamp, keeping its UTC offset.
///
/// Values without an offset are taken as UTC. A bare date is midnight UTC.
pub fn parse_text(raw: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed);
    }

    let normalized = match trimmed.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{rest}+00:00"),
        None => trimmed.to_string(),
    };

    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(&normalized, format) {
            return Some(parsed);
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Some(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }

    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
}

/// Interpret an integer as a Unix epoch timestamp in UTC.
pub fn from_epoch(value: i64) -> Option<DateTime<FixedOffset>> {
    let parsed = if value.unsigned_abs() >= EPOCH_MILLIS_THRESHOLD as u64 {
        DateTime::<Utc>::from_timestamp_millis(value)
    } else {
        DateTime::<Utc>::from_timestamp(value, 0)
    };
    parsed.map(|ts| ts.fixed_offset())
}

/// Reject timestamps whose calendar year falls outside 1..=9999.
///
/// RFC 3339 output writes such years with a sign and extra digits, a form
/// the destination refuses to parse.
pub fn check_year_range(ts: DateTime<FixedOffset>) -> Result<DateTime<FixedOffset>, String> {
    match ts.year() {
        1..=9999 => Ok(ts),
        year => Err(format!("timestamp year {} is outside 1..=9999", year)),
    }
}
