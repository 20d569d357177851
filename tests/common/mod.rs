//! Common test utilities: an in-memory store and controllable clients
//!
//! The in-memory store keeps whole-cache tests independent of the
//! filesystem and lets them inject listing and write failures. The gated
//! client parks fetches until the test releases them, for exercising
//! shutdown while calls are in flight.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tabella::{
    ClientError, ContextEntry, Enrichment, EnrichmentClient, NoteBody, NoteId, NoteItem,
    NoteStore, Settings, StoreError, StoreResult,
};
use tokio::sync::watch;

#[derive(Default, Clone)]
struct StoredNote {
    body: Option<NoteBody>,
    enrichment: Option<Enrichment>,
}

/// In-memory note store with failure injection
#[derive(Default)]
pub struct MemoryStore {
    notes: Mutex<HashMap<NoteId, StoredNote>>,
    fail_listing: AtomicBool,
    fail_enrichment_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a note with a one-line text body
    pub fn with_note(self, id: i64) -> Self {
        self.insert(id, Some(text_body(&format!("note {id}"))), None);
        self
    }

    /// Add a note that already has a persisted enrichment
    pub fn with_enriched_note(self, id: i64, enrichment: Enrichment) -> Self {
        self.insert(id, Some(text_body(&format!("note {id}"))), Some(enrichment));
        self
    }

    /// Add a note directory with no readable body
    pub fn with_bodyless_note(self, id: i64) -> Self {
        self.insert(id, None, None);
        self
    }

    fn insert(&self, id: i64, body: Option<NoteBody>, enrichment: Option<Enrichment>) {
        self.notes
            .lock()
            .unwrap()
            .insert(NoteId::from(id), StoredNote { body, enrichment });
    }

    /// Make every list call fail from now on
    pub fn break_listing(&self) {
        self.fail_listing.store(true, Ordering::SeqCst);
    }

    /// Make every enrichment write fail from now on
    pub fn break_enrichment_writes(&self) {
        self.fail_enrichment_writes.store(true, Ordering::SeqCst);
    }

    /// What the store has persisted for a note, if anything
    pub fn persisted_enrichment(&self, id: i64) -> Option<Enrichment> {
        self.notes
            .lock()
            .unwrap()
            .get(&NoteId::from(id))
            .and_then(|note| note.enrichment.clone())
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn list_note_ids(&self) -> StoreResult<Vec<NoteId>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(std::io::Error::other(
                "injected listing failure",
            )));
        }
        let mut ids: Vec<NoteId> = self.notes.lock().unwrap().keys().copied().collect();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    async fn read_note_body(&self, id: NoteId) -> StoreResult<Option<NoteBody>> {
        Ok(self
            .notes
            .lock()
            .unwrap()
            .get(&id)
            .and_then(|note| note.body.clone()))
    }

    async fn read_enrichment(&self, id: NoteId) -> StoreResult<Option<Enrichment>> {
        Ok(self
            .notes
            .lock()
            .unwrap()
            .get(&id)
            .and_then(|note| note.enrichment.clone()))
    }

    async fn write_enrichment(&self, id: NoteId, enrichment: &Enrichment) -> StoreResult<()> {
        if self.fail_enrichment_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other(
                "injected write failure",
            )));
        }
        let mut notes = self.notes.lock().unwrap();
        notes.entry(id).or_default().enrichment = Some(enrichment.clone());
        Ok(())
    }

    fn media_dir(&self, _id: NoteId) -> PathBuf {
        PathBuf::from("/dev/null")
    }
}

/// Client that parks every fetch until the gate opens
pub struct GatedClient {
    open: watch::Receiver<bool>,
    result: Enrichment,
}

impl GatedClient {
    /// Returns the client and the sender that opens the gate
    pub fn new(result: Enrichment) -> (Self, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { open: rx, result }, tx)
    }
}

#[async_trait]
impl EnrichmentClient for GatedClient {
    async fn fetch_enrichment(
        &self,
        _id: NoteId,
        _body: &NoteBody,
        _media_dir: &Path,
        _context: &[ContextEntry],
        _settings: &Settings,
    ) -> Result<Enrichment, ClientError> {
        let mut open = self.open.clone();
        while !*open.borrow_and_update() {
            if open.changed().await.is_err() {
                break;
            }
        }
        Ok(self.result.clone())
    }
}

pub fn text_body(text: &str) -> NoteBody {
    vec![NoteItem::Text { text: text.to_string() }]
}

pub fn enrichment(tag: &str) -> Enrichment {
    Enrichment {
        title: format!("title-{tag}"),
        summary: format!("summary-{tag}"),
        raw_text: None,
    }
}
