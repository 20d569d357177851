//! Tabella: local-first notes with background AI enrichment
//!
//! Notes live on the local filesystem and are always readable, online or
//! not. Each note is lazily enriched by a remote service with a title,
//! summary, and transcription; the cache shows the local list immediately
//! and merges enrichment in as it arrives.
//!
//! # Core Concepts
//!
//! - **Notes**: ordered text/image/audio items, stored one directory per note
//! - **Enrichment**: AI-derived title/summary/transcription, fetched once and persisted
//! - **Cache**: the in-memory view that never blocks on the network
//!
//! # Example
//!
//! ```
//! use tabella::{SessionContext, Settings};
//!
//! let session = SessionContext::new(Settings::default());
//! assert!(session.is_configured());
//! ```

pub mod cache;
pub mod chat;
pub mod client;
mod note;
pub mod session;
pub mod store;

pub use cache::{
    build_context_window, CommitFence, FetchState, NoteCache, NoteRecord,
    DEFAULT_CONTEXT_LIMIT,
};
pub use chat::{ChatMessage, ChatSession, MessageContent, Speaker};
pub use client::{
    ChatClient, ChatOutbound, ChatReply, ChatRequest, ClientError, ContextEntry, EnrichmentClient,
    HttpClient, MockClient,
};
pub use note::{format_note_timestamp, Enrichment, MediaKind, NoteBody, NoteId, NoteItem};
pub use session::{Language, SessionContext, Settings, SettingsError};
pub use store::{DraftItem, FsStore, NoteStore, StoreError, StoreResult};
