//! Core note data model: ids, bodies, and enrichment

mod body;
mod enrichment;
mod id;
mod time;

pub use body::{MediaKind, NoteBody, NoteItem};
pub use enrichment::Enrichment;
pub use id::NoteId;
pub use time::format_note_timestamp;
