//! Enrichment service client — traits, wire types, and mock
//!
//! Defines the client traits and response types for the remote service
//! that turns raw notes into titles, summaries, and transcriptions, and
//! answers chat messages over them. Two implementations:
//! - `HttpClient`: multipart POSTs against the service (production)
//! - `MockClient`: returns preconfigured responses (testing)
//!
//! Clients never retry. A failed call is reported once; whether to try
//! again belongs to the caller.

mod http;
mod payload;

pub use http::HttpClient;
pub use payload::{build_chat_fields, build_note_data, ChatFields, MediaPart, NoteData, WireItem};

use crate::note::{Enrichment, NoteBody, NoteId};
use crate::session::Settings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A digest of one prior enrichment, sent as conditioning context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub title: String,
    pub summary: String,
    /// Human-formatted creation time of the summarized note
    pub timestamp: String,
}

/// Errors from service client operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// The service could not be reached (DNS, refused, timeout)
    #[error("network error: {0}")]
    Network(String),
    /// The service answered with a non-2xx status
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    /// The exchange body failed to encode or decode
    #[error("malformed response: {0}")]
    Parse(String),
    /// A media file referenced by the request could not be read
    #[error("media unavailable: {0}")]
    Media(String),
}

/// Client trait for fetching note enrichment
///
/// Abstracts over transport (HTTP, mock) so the cache doesn't depend on
/// how the service is reached.
#[async_trait]
pub trait EnrichmentClient: Send + Sync {
    /// Submit one note and its conditioning context for enrichment
    ///
    /// `media_dir` is where the body's media file names resolve.
    async fn fetch_enrichment(
        &self,
        id: NoteId,
        body: &NoteBody,
        media_dir: &Path,
        context: &[ContextEntry],
        settings: &Settings,
    ) -> Result<Enrichment, ClientError>;
}

/// One outgoing chat message
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutbound {
    Text(String),
    Audio { path: PathBuf, duration: u32 },
    Image { path: PathBuf },
}

/// A full chat exchange request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Digest of recent enriched notes the assistant may draw on
    pub working_memory: String,
    /// Opaque conversation state echoed back from the previous reply
    pub updated_messages: serde_json::Value,
    pub message: ChatOutbound,
    pub settings: Settings,
}

/// The service's answer to a chat exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub text_reply: String,
    /// Replacement conversation state for the next exchange
    #[serde(default)]
    pub updated_messages: serde_json::Value,
}

/// Client trait for the conversational endpoint
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ClientError>;
}

/// One recorded enrichment call, for assertions on dedup and context
#[derive(Debug, Clone)]
pub struct RecordedFetch {
    pub id: NoteId,
    pub context: Vec<ContextEntry>,
}

/// Mock client for testing — returns preconfigured responses and records
/// every call it receives.
#[derive(Default)]
pub struct MockClient {
    enrichments: HashMap<NoteId, Result<Enrichment, ClientError>>,
    chat_replies: Mutex<Vec<Result<ChatReply, ClientError>>>,
    fetches: Mutex<Vec<RecordedFetch>>,
    chats: Mutex<Vec<ChatRequest>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the enrichment returned for a specific note
    pub fn with_enrichment(mut self, id: NoteId, enrichment: Enrichment) -> Self {
        self.enrichments.insert(id, Ok(enrichment));
        self
    }

    /// Register a failure for a specific note
    pub fn with_fetch_failure(mut self, id: NoteId, error: ClientError) -> Self {
        self.enrichments.insert(id, Err(error));
        self
    }

    /// Queue a chat reply, consumed in order by `send_chat`
    pub fn with_chat_reply(self, reply: ChatReply) -> Self {
        self.chat_replies
            .lock()
            .unwrap()
            .push(Ok(reply));
        self
    }

    /// Queue a chat failure, consumed in order by `send_chat`
    pub fn with_chat_failure(self, error: ClientError) -> Self {
        self.chat_replies
            .lock()
            .unwrap()
            .push(Err(error));
        self
    }

    /// How many times enrichment was requested for `id`
    pub fn fetch_count(&self, id: NoteId) -> usize {
        self.fetches
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.id == id)
            .count()
    }

    /// Every enrichment call received, in arrival order
    pub fn fetches(&self) -> Vec<RecordedFetch> {
        self.fetches.lock().unwrap().clone()
    }

    /// Every chat request received, in arrival order
    pub fn chats(&self) -> Vec<ChatRequest> {
        self.chats.lock().unwrap().clone()
    }
}

#[async_trait]
impl EnrichmentClient for MockClient {
    async fn fetch_enrichment(
        &self,
        id: NoteId,
        _body: &NoteBody,
        _media_dir: &Path,
        context: &[ContextEntry],
        _settings: &Settings,
    ) -> Result<Enrichment, ClientError> {
        self.fetches.lock().unwrap().push(RecordedFetch {
            id,
            context: context.to_vec(),
        });
        match self.enrichments.get(&id) {
            Some(result) => result.clone(),
            None => Err(ClientError::Network(format!(
                "no mock enrichment for note {id}"
            ))),
        }
    }
}

#[async_trait]
impl ChatClient for MockClient {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ClientError> {
        self.chats.lock().unwrap().push(request.clone());
        let mut replies = self.chat_replies.lock().unwrap();
        if replies.is_empty() {
            return Err(ClientError::Network(
                "no mock chat reply queued".to_string(),
            ));
        }
        replies.remove(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::NoteItem;

    fn sample_enrichment() -> Enrichment {
        Enrichment {
            title: "Test".to_string(),
            summary: "A test note.".to_string(),
            raw_text: None,
        }
    }

    #[tokio::test]
    async fn mock_returns_registered_enrichment_and_records_the_call() {
        let id = NoteId::from(100);
        let client = MockClient::new().with_enrichment(id, sample_enrichment());

        let body = vec![NoteItem::Text { text: "hello".to_string() }];
        let result = client
            .fetch_enrichment(id, &body, Path::new("/tmp"), &[], &Settings::default())
            .await
            .unwrap();
        assert_eq!(result, sample_enrichment());
        assert_eq!(client.fetch_count(id), 1);
    }

    #[tokio::test]
    async fn mock_fails_for_unregistered_notes() {
        let client = MockClient::new();
        let body = vec![NoteItem::Text { text: "hello".to_string() }];
        let result = client
            .fetch_enrichment(
                NoteId::from(7),
                &body,
                Path::new("/tmp"),
                &[],
                &Settings::default(),
            )
            .await;
        assert!(matches!(result, Err(ClientError::Network(_))));
    }

    #[tokio::test]
    async fn mock_chat_replies_are_consumed_in_order() {
        let client = MockClient::new()
            .with_chat_reply(ChatReply {
                text_reply: "first".to_string(),
                updated_messages: serde_json::json!([1]),
            })
            .with_chat_failure(ClientError::Status {
                status: 500,
                message: "boom".to_string(),
            });

        let request = ChatRequest {
            working_memory: String::new(),
            updated_messages: serde_json::json!([]),
            message: ChatOutbound::Text("hi".to_string()),
            settings: Settings::default(),
        };
        assert_eq!(client.send_chat(&request).await.unwrap().text_reply, "first");
        assert!(matches!(
            client.send_chat(&request).await,
            Err(ClientError::Status { status: 500, .. })
        ));
        assert_eq!(client.chats().len(), 2);
    }
}
