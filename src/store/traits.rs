//! Store trait definitions

use crate::note::{Enrichment, NoteBody, NoteId};
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The notes root could not be created or enumerated
    #[error("Note store unavailable: {0}")]
    Unavailable(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cannot save a note with no content")]
    EmptyNote,
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for durable note storage
///
/// Implementations must be thread-safe (Send + Sync) to support concurrent
/// access from background fetch tasks.
///
/// Absence and failure are distinct: a note without a persisted enrichment
/// reads as `Ok(None)`, never as an error. Malformed persisted enrichment
/// also reads as `Ok(None)` so one corrupt file cannot poison a load.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// List all note ids, newest first
    async fn list_note_ids(&self) -> StoreResult<Vec<NoteId>>;

    /// Load the authored body of a note, or None if the note has no body file
    async fn read_note_body(&self, id: NoteId) -> StoreResult<Option<NoteBody>>;

    /// Load the persisted enrichment of a note, or None if never enriched
    async fn read_enrichment(&self, id: NoteId) -> StoreResult<Option<Enrichment>>;

    /// Persist an enrichment next to its note
    async fn write_enrichment(&self, id: NoteId, enrichment: &Enrichment) -> StoreResult<()>;

    /// Directory holding the note's media files, for upload resolution
    fn media_dir(&self, id: NoteId) -> PathBuf;
}
