//! HTTP transport for the enrichment service

use super::payload::{build_chat_fields, build_note_data, MediaPart};
use super::{ChatClient, ChatReply, ChatRequest, ClientError, ContextEntry, EnrichmentClient};
use crate::note::{Enrichment, NoteBody, NoteId};
use crate::session::Settings;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Summarizing a note with media can sit behind slow transcription, so
/// the default deadline is generous.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Multipart client for the summarization and chat endpoints
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpClient {
    /// Create a client against a service base URL, e.g. `http://localhost:8000`
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-request deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn summarize_url(&self) -> String {
        format!("{}/api/notes/summarize/", self.base_url)
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    async fn post_form<T>(&self, url: String, form: Form) -> Result<T, ClientError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ClientError> {
    serde_json::to_string(value).map_err(|e| ClientError::Parse(format!("encode request: {e}")))
}

async fn attach(form: Form, part: MediaPart) -> Result<Form, ClientError> {
    let bytes = tokio::fs::read(&part.path)
        .await
        .map_err(|e| ClientError::Media(format!("{}: {e}", part.path.display())))?;
    let file = Part::bytes(bytes)
        .file_name(part.file_name)
        .mime_str(part.content_type)
        .map_err(|e| ClientError::Parse(e.to_string()))?;
    Ok(form.part(part.field_name, file))
}

#[async_trait]
impl EnrichmentClient for HttpClient {
    async fn fetch_enrichment(
        &self,
        id: NoteId,
        body: &NoteBody,
        media_dir: &Path,
        context: &[ContextEntry],
        settings: &Settings,
    ) -> Result<Enrichment, ClientError> {
        let (note_data, media) = build_note_data(id, body, media_dir);
        debug!(
            "posting note {id} for enrichment ({} items, {} media parts, {} context entries)",
            note_data.items.len(),
            media.len(),
            context.len()
        );

        let mut form = Form::new()
            .text("noteData", to_json(&note_data)?)
            .text("settings", to_json(settings)?)
            .text("previousSummaries", to_json(&context)?);
        for part in media {
            form = attach(form, part).await?;
        }

        self.post_form(self.summarize_url(), form).await
    }
}

#[async_trait]
impl ChatClient for HttpClient {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ClientError> {
        let fields = build_chat_fields(&request.message);
        debug!("posting chat message of type {}", fields.message_type);

        let mut form = Form::new()
            .text("working_memory", request.working_memory.clone())
            .text("updated_messages", to_json(&request.updated_messages)?)
            .text("message_type", fields.message_type)
            .text("settings", to_json(&request.settings)?);
        if let Some(text) = fields.text {
            form = form.text("message_content", text);
        }
        if let Some(part) = fields.media {
            form = attach(form, part).await?;
        }
        if let Some(duration) = fields.duration {
            form = form.text("duration", duration.to_string());
        }

        self.post_form(self.chat_url(), form).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_urls_tolerate_trailing_slashes() {
        let client = HttpClient::new("http://localhost:8000/");
        assert_eq!(client.summarize_url(), "http://localhost:8000/api/notes/summarize/");
        assert_eq!(client.chat_url(), "http://localhost:8000/api/chat");
    }

    #[test]
    fn timeout_is_overridable() {
        let client = HttpClient::new("http://localhost:8000")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(client.timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn missing_media_file_fails_before_any_network_io() {
        let part = MediaPart {
            field_name: "file_0".to_string(),
            file_name: "file_0.jpg".to_string(),
            content_type: "image/jpeg",
            path: Path::new("/nonexistent/image-0.jpg").to_path_buf(),
        };
        let result = attach(Form::new(), part).await;
        assert!(matches!(result, Err(ClientError::Media(_))));
    }
}
