//! Filesystem store: one directory per note under a common root
//!
//! Layout:
//!
//! ```text
//! <root>/settings.json
//! <root>/notes/<id>/note.json       authored body
//! <root>/notes/<id>/ai_info.json    enrichment, absent until fetched
//! <root>/notes/<id>/image-<i>.jpg   media referenced by the body
//! <root>/notes/<id>/audio-<i>.m4a
//! ```
//!
//! Directory names are the decimal note id, so a plain directory listing
//! already yields creation order.

use super::traits::{NoteStore, StoreError, StoreResult};
use crate::note::{Enrichment, MediaKind, NoteBody, NoteId, NoteItem};
use crate::session::Settings;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const NOTES_DIR: &str = "notes";
const BODY_FILE: &str = "note.json";
const ENRICHMENT_FILE: &str = "ai_info.json";
const SETTINGS_FILE: &str = "settings.json";

/// Input to [`FsStore::create_note`]: authored items whose media still
/// point at source files outside the store
#[derive(Debug, Clone)]
pub enum DraftItem {
    Text { text: String },
    Image { source: PathBuf },
    Audio { source: PathBuf, duration: Option<u32> },
}

impl DraftItem {
    fn is_blank(&self) -> bool {
        match self {
            DraftItem::Text { text } => text.trim().is_empty(),
            DraftItem::Image { .. } | DraftItem::Audio { .. } => false,
        }
    }
}

/// Note storage rooted at a directory on the local filesystem
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `root`, creating the layout if needed
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join(NOTES_DIR)).map_err(StoreError::Unavailable)?;
        Ok(Self { root })
    }

    /// The directory this store lives in
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn notes_dir(&self) -> PathBuf {
        self.root.join(NOTES_DIR)
    }

    fn note_dir(&self, id: NoteId) -> PathBuf {
        self.notes_dir().join(id.to_string())
    }

    /// Save a new note, copying media into its directory
    ///
    /// Items with only whitespace text are dropped; a draft with nothing
    /// left fails with [`StoreError::EmptyNote`]. Media files are renamed
    /// to `image-<i>` / `audio-<i>` by their position in the saved body.
    pub async fn create_note(&self, draft: Vec<DraftItem>) -> StoreResult<NoteId> {
        let draft: Vec<DraftItem> = draft.into_iter().filter(|item| !item.is_blank()).collect();
        if draft.is_empty() {
            return Err(StoreError::EmptyNote);
        }

        tokio::fs::create_dir_all(self.notes_dir())
            .await
            .map_err(StoreError::Unavailable)?;
        let (id, dir) = self.claim_note_dir().await?;

        match self.write_note_contents(&dir, draft).await {
            Ok(()) => Ok(id),
            Err(e) => {
                // Don't leave a half-written note behind
                tokio::fs::remove_dir_all(&dir).await.ok();
                Err(e)
            }
        }
    }

    /// Reserve a fresh note directory, nudging the id forward on the rare
    /// same-millisecond collision
    async fn claim_note_dir(&self) -> StoreResult<(NoteId, PathBuf)> {
        let mut id = NoteId::now();
        loop {
            let dir = self.note_dir(id);
            match tokio::fs::create_dir(&dir).await {
                Ok(()) => return Ok((id, dir)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => id = id.next(),
                Err(e) => return Err(StoreError::Io(e)),
            }
        }
    }

    async fn write_note_contents(&self, dir: &Path, draft: Vec<DraftItem>) -> StoreResult<()> {
        let mut body: NoteBody = Vec::with_capacity(draft.len());
        for (index, item) in draft.into_iter().enumerate() {
            let item = match item {
                DraftItem::Text { text } => NoteItem::Text { text },
                DraftItem::Image { source } => {
                    let file = media_file_name(MediaKind::Image, index);
                    tokio::fs::copy(&source, dir.join(&file)).await?;
                    NoteItem::Image { file }
                }
                DraftItem::Audio { source, duration } => {
                    let file = media_file_name(MediaKind::Audio, index);
                    tokio::fs::copy(&source, dir.join(&file)).await?;
                    NoteItem::Audio { file, duration }
                }
            };
            body.push(item);
        }

        let json = serde_json::to_vec_pretty(&body)?;
        tokio::fs::write(dir.join(BODY_FILE), json).await?;
        Ok(())
    }

    /// Remove a note and everything in its directory
    ///
    /// Returns false if the note did not exist.
    pub async fn delete_note(&self, id: NoteId) -> StoreResult<bool> {
        match tokio::fs::remove_dir_all(self.note_dir(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Load persisted settings, or None if never saved or unreadable
    pub async fn read_settings(&self) -> StoreResult<Option<Settings>> {
        let path = self.root.join(SETTINGS_FILE);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };
        match serde_json::from_slice(&bytes) {
            Ok(settings) => Ok(Some(settings)),
            Err(e) => {
                warn!("ignoring malformed settings file: {e}");
                Ok(None)
            }
        }
    }

    /// Persist settings at the store root
    pub async fn write_settings(&self, settings: &Settings) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(settings)?;
        tokio::fs::write(self.root.join(SETTINGS_FILE), json).await?;
        Ok(())
    }

    /// Absolute path of a media file named by a note body
    pub fn media_path(&self, id: NoteId, file: &str) -> PathBuf {
        self.note_dir(id).join(file)
    }
}

#[async_trait]
impl NoteStore for FsStore {
    async fn list_note_ids(&self) -> StoreResult<Vec<NoteId>> {
        let notes_dir = self.notes_dir();
        tokio::fs::create_dir_all(&notes_dir)
            .await
            .map_err(StoreError::Unavailable)?;

        let mut entries = tokio::fs::read_dir(&notes_dir)
            .await
            .map_err(StoreError::Unavailable)?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(StoreError::Unavailable)? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            match name.parse::<NoteId>() {
                Ok(id) => ids.push(id),
                Err(_) => debug!("skipping stray entry in notes dir: {name}"),
            }
        }
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    async fn read_note_body(&self, id: NoteId) -> StoreResult<Option<NoteBody>> {
        let path = self.note_dir(id).join(BODY_FILE);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };
        let body = serde_json::from_slice(&bytes)?;
        Ok(Some(body))
    }

    async fn read_enrichment(&self, id: NoteId) -> StoreResult<Option<Enrichment>> {
        let path = self.note_dir(id).join(ENRICHMENT_FILE);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };
        match serde_json::from_slice(&bytes) {
            Ok(enrichment) => Ok(Some(enrichment)),
            Err(e) => {
                // One corrupt file must not block the note; it just reads
                // as never enriched and gets fetched again.
                warn!("ignoring malformed enrichment for note {id}: {e}");
                Ok(None)
            }
        }
    }

    async fn write_enrichment(&self, id: NoteId, enrichment: &Enrichment) -> StoreResult<()> {
        let dir = self.note_dir(id);
        tokio::fs::create_dir_all(&dir).await?;
        let json = serde_json::to_vec(enrichment)?;
        tokio::fs::write(dir.join(ENRICHMENT_FILE), json).await?;
        Ok(())
    }

    fn media_dir(&self, id: NoteId) -> PathBuf {
        self.note_dir(id)
    }
}

fn media_file_name(kind: MediaKind, index: usize) -> String {
    let prefix = match kind {
        MediaKind::Image => "image",
        MediaKind::Audio => "audio",
    };
    format!("{prefix}-{index}.{}", kind.extension())
}
