//! Session context: user settings and cross-surface signals
//!
//! One [`SessionContext`] is built at startup and handed to whatever needs
//! it. Nothing reads it ambiently, so embedders and tests can run several
//! isolated sessions in one process.

use crate::store::{FsStore, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tracing::warn;

/// Language the service should answer in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    French,
}

/// User preferences sent with every enrichment and chat request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// How the service should address the user
    pub name: String,
    pub language: Language,
    /// Persona the assistant speaks as
    pub persona: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: String::new(),
            language: Language::English,
            persona: "Muse".to_string(),
        }
    }
}

/// Errors from settings updates
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Display name must not be empty")]
    EmptyName,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-session state shared across the cache, chat, and CLI surfaces
pub struct SessionContext {
    settings: RwLock<Settings>,
    /// Set when a note is created or deleted behind the cache's back
    notes_changed: AtomicBool,
    /// False until a settings file has been found or written
    configured: AtomicBool,
}

impl SessionContext {
    /// Start a session with explicit settings, treated as configured
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
            notes_changed: AtomicBool::new(false),
            configured: AtomicBool::new(true),
        }
    }

    /// Start a session from the store's persisted settings
    ///
    /// A missing or unreadable settings file degrades to defaults with the
    /// session marked unconfigured, so callers can prompt for setup.
    pub async fn load(store: &FsStore) -> Self {
        let found = match store.read_settings().await {
            Ok(found) => found,
            Err(e) => {
                warn!("reading settings failed: {e}");
                None
            }
        };
        let configured = found.is_some();
        Self {
            settings: RwLock::new(found.unwrap_or_default()),
            notes_changed: AtomicBool::new(false),
            configured: AtomicBool::new(configured),
        }
    }

    /// Current settings, cloned so callers never hold the lock
    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a settings file has ever been found or written
    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::Relaxed)
    }

    /// Validate, persist, and adopt new settings
    pub async fn save_settings(
        &self,
        store: &FsStore,
        settings: Settings,
    ) -> Result<(), SettingsError> {
        if settings.name.trim().is_empty() {
            return Err(SettingsError::EmptyName);
        }
        store.write_settings(&settings).await?;
        *self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = settings;
        self.configured.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Record that the durable note set changed outside the cache's view
    pub fn mark_notes_changed(&self) {
        self.notes_changed.store(true, Ordering::Relaxed);
    }

    /// Consume the notes-changed signal, returning whether it was set
    pub fn take_notes_changed(&self) -> bool {
        self.notes_changed.swap(false, Ordering::Relaxed)
    }
}
