//! Human-readable rendering of note timestamps

use super::id::NoteId;
use chrono::{DateTime, Local, TimeZone};

/// Format used wherever a note's instant is shown to a person or sent to
/// the enrichment service: `Saturday, March 1, 2025 at 3:45 PM`
const TIMESTAMP_FORMAT: &str = "%A, %B %-d, %Y at %-I:%M %p";

/// Render a note id's instant in the local time zone
///
/// Ids outside the representable range render as an empty string.
pub fn format_note_timestamp(id: NoteId) -> String {
    match DateTime::from_timestamp_millis(id.timestamp_millis()) {
        Some(utc) => format_in_zone(&utc.with_timezone(&Local)),
        None => String::new(),
    }
}

/// Zone-generic formatter, split out so tests can pin the zone
pub(crate) fn format_in_zone<Tz: TimeZone>(instant: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    instant.format(TIMESTAMP_FORMAT).to_string()
}
