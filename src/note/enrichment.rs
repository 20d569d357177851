//! Enrichment: AI-derived content attached to a note

use serde::{Deserialize, Serialize};

/// The service's derived view of one note
///
/// Persisted next to the note body once fetched. Treated as immutable per
/// id: the cache only fetches it when no persisted copy exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    /// Short AI-generated title
    pub title: String,
    /// One-paragraph AI-generated summary
    pub summary: String,
    /// Full transcription or extracted text, when the note had media
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}
