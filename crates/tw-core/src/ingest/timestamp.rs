//! Event timestamp resolution.
//!
//! Record timestamps are a tagged union: absent, integer epoch seconds,
//! float epoch seconds, or a string parsed with the configured layout.
//! Resolution collapses all of them to `Option<DateTime<Utc>>`; the caller
//! decides whether "absent/invalid" is skippable (live) or fatal (replay).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

/// Raw `timestamp` field of a record, before resolution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TimestampValue {
    /// Whole epoch seconds.
    EpochSeconds(i64),
    /// Fractional epoch seconds; truncated to whole seconds.
    EpochSecondsFloat(f64),
    /// A string in the configured layout.
    Text(String),
}

/// Resolve a record timestamp to an instant, or `None` if absent/invalid.
pub fn resolve(value: &TimestampValue, layout: &str) -> Option<DateTime<Utc>> {
    match value {
        TimestampValue::EpochSeconds(secs) => DateTime::from_timestamp(*secs, 0),
        TimestampValue::EpochSecondsFloat(secs) if secs.is_finite() => {
            DateTime::from_timestamp(secs.trunc() as i64, 0)
        }
        TimestampValue::EpochSecondsFloat(_) => None,
        TimestampValue::Text(text) => parse_with_layout(text, layout),
    }
}

/// Parse a timestamp string with an strftime layout. Layouts without a zone
/// fall back to naive parsing and are taken as UTC.
pub fn parse_with_layout(text: &str, layout: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_str(text, layout) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, layout)
        .ok()
        .map(|naive| naive.and_utc())
}
