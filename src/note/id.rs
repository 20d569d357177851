//! Note identity: creation-time ids that double as the sort key

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Unique identifier for a note
///
/// Milliseconds since the Unix epoch at creation time. Ordering follows
/// recency: a larger id is a newer note. Serializes as a plain integer and
/// displays as the decimal string used for the note's directory name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NoteId(i64);

impl NoteId {
    /// Derive a fresh id from the current wall clock
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// Milliseconds since the Unix epoch
    pub fn timestamp_millis(&self) -> i64 {
        self.0
    }

    /// The id one millisecond later, used to dodge directory collisions
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NoteId {
    fn from(millis: i64) -> Self {
        Self(millis)
    }
}

impl std::str::FromStr for NoteId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(Self)
    }
}
