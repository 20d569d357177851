//! Chat sessions grounded in the user's enriched notes
//!
//! A session holds a working memory digest of recent note enrichments,
//! a local transcript, and the opaque conversation state the service
//! threads through each exchange. The transcript is session-local and
//! never persisted.

use crate::client::{ChatClient, ChatOutbound, ChatRequest, ClientError};
use crate::note::format_note_timestamp;
use crate::session::SessionContext;
use crate::store::NoteStore;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// How many recent notes feed the working memory digest
const WORKING_MEMORY_NOTES: usize = 50;

/// Who said a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

/// What a transcript entry holds
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text(String),
    Audio { path: PathBuf, duration: u32 },
    Image { path: PathBuf },
}

/// One entry in the session transcript
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub speaker: Speaker,
    pub content: MessageContent,
}

impl ChatMessage {
    fn new(speaker: Speaker, content: MessageContent) -> Self {
        Self { id: Uuid::new_v4(), speaker, content }
    }
}

/// A conversation over the note corpus
pub struct ChatSession {
    store: Arc<dyn NoteStore>,
    client: Arc<dyn ChatClient>,
    session: Arc<SessionContext>,
    working_memory: String,
    transcript: Vec<ChatMessage>,
    /// Conversation state owned by the service, echoed verbatim
    updated_messages: Value,
}

impl ChatSession {
    pub fn new(
        store: Arc<dyn NoteStore>,
        client: Arc<dyn ChatClient>,
        session: Arc<SessionContext>,
    ) -> Self {
        Self {
            store,
            client,
            session,
            working_memory: String::new(),
            transcript: Vec::new(),
            updated_messages: Value::Array(Vec::new()),
        }
    }

    /// Rebuild working memory from the newest enriched notes
    ///
    /// Walks notes newest first, takes up to fifty, and renders each
    /// persisted enrichment as a dated title/summary block. Notes not
    /// yet enriched are skipped. Store trouble degrades to an empty
    /// digest rather than failing the chat.
    pub async fn load_working_memory(&mut self) {
        let ids = match self.store.list_note_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("listing notes for working memory failed: {e}");
                self.working_memory = String::new();
                return;
            }
        };

        let mut memory = String::new();
        for id in ids.into_iter().take(WORKING_MEMORY_NOTES) {
            let enrichment = match self.store.read_enrichment(id).await {
                Ok(Some(enrichment)) => enrichment,
                Ok(None) => continue,
                Err(e) => {
                    warn!("reading enrichment for note {id} failed: {e}");
                    continue;
                }
            };
            if enrichment.title.is_empty() || enrichment.summary.is_empty() {
                continue;
            }
            memory.push_str(&format!(
                "{}:\n<title>{}</title><summary>{}</summary>\n\n",
                format_note_timestamp(id),
                enrichment.title,
                enrichment.summary,
            ));
        }
        self.working_memory = memory.trim().to_string();
    }

    /// The current digest, as sent with each exchange
    pub fn working_memory(&self) -> &str {
        &self.working_memory
    }

    /// Everything said so far, oldest first
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Send a text message and return the assistant's reply
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<String, ClientError> {
        let text = text.into();
        self.exchange(
            MessageContent::Text(text.clone()),
            ChatOutbound::Text(text),
        )
        .await
    }

    /// Send a recorded audio clip
    pub async fn send_audio(
        &mut self,
        path: PathBuf,
        duration: u32,
    ) -> Result<String, ClientError> {
        self.exchange(
            MessageContent::Audio { path: path.clone(), duration },
            ChatOutbound::Audio { path, duration },
        )
        .await
    }

    /// Send a picture
    pub async fn send_image(&mut self, path: PathBuf) -> Result<String, ClientError> {
        self.exchange(
            MessageContent::Image { path: path.clone() },
            ChatOutbound::Image { path },
        )
        .await
    }

    /// One request/reply round trip
    ///
    /// The user's message joins the transcript before the call, so a
    /// failed exchange still shows what was asked. Conversation state
    /// only advances on success.
    async fn exchange(
        &mut self,
        local: MessageContent,
        outbound: ChatOutbound,
    ) -> Result<String, ClientError> {
        self.transcript.push(ChatMessage::new(Speaker::User, local));

        let request = ChatRequest {
            working_memory: self.working_memory.clone(),
            updated_messages: self.updated_messages.clone(),
            message: outbound,
            settings: self.session.settings(),
        };
        let reply = self.client.send_chat(&request).await?;

        self.updated_messages = reply.updated_messages;
        self.transcript.push(ChatMessage::new(
            Speaker::Assistant,
            MessageContent::Text(reply.text_reply.clone()),
        ));
        Ok(reply.text_reply)
    }
}
