//! Wire payload assembly for the summarization and chat endpoints
//!
//! Pure construction of the form fields and media part descriptors the
//! HTTP layer uploads. Nothing here touches the network or reads files,
//! so tests can assert on exact payload shapes.

use super::ChatOutbound;
use crate::note::{MediaKind, NoteBody, NoteId, NoteItem};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// The `noteData` form field: the note as the service sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteData {
    /// The note id's decimal string, matching its directory name
    pub timestamp: String,
    pub items: Vec<WireItem>,
}

/// One body item as serialized into `noteData`
///
/// Media items are replaced by placeholders naming the multipart field
/// that carries their bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireItem {
    Text {
        text: String,
    },
    Image {
        #[serde(rename = "fieldName")]
        field_name: String,
    },
    Audio {
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<u32>,
        #[serde(rename = "fieldName")]
        field_name: String,
    },
}

/// A binary attachment to upload alongside the fields
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPart {
    /// Multipart field name (`file_<i>` or `message_content`)
    pub field_name: String,
    /// File name sent with the part
    pub file_name: String,
    pub content_type: &'static str,
    /// Where the bytes live on disk
    pub path: PathBuf,
}

/// Build the `noteData` field and the media parts it references
///
/// Placeholder field names are positional: the item at index `i` uploads
/// as `file_<i>`, so the service can reattach bytes to body slots.
pub fn build_note_data(id: NoteId, body: &NoteBody, media_dir: &Path) -> (NoteData, Vec<MediaPart>) {
    let mut items = Vec::with_capacity(body.len());
    let mut media = Vec::new();

    for (index, item) in body.iter().enumerate() {
        let wire = match item {
            NoteItem::Text { text } => WireItem::Text { text: text.clone() },
            NoteItem::Image { file } => {
                let field_name = format!("file_{index}");
                media.push(media_part(&field_name, MediaKind::Image, media_dir.join(file)));
                WireItem::Image { field_name }
            }
            NoteItem::Audio { file, duration } => {
                let field_name = format!("file_{index}");
                media.push(media_part(&field_name, MediaKind::Audio, media_dir.join(file)));
                WireItem::Audio { duration: *duration, field_name }
            }
        };
        items.push(wire);
    }

    (NoteData { timestamp: id.to_string(), items }, media)
}

fn media_part(field_name: &str, kind: MediaKind, path: PathBuf) -> MediaPart {
    MediaPart {
        field_name: field_name.to_string(),
        file_name: format!("{field_name}.{}", kind.extension()),
        content_type: kind.content_type(),
        path,
    }
}

/// Form fields for one chat exchange
#[derive(Debug, Clone, PartialEq)]
pub struct ChatFields {
    /// `message_type` field: text, audio, or image
    pub message_type: &'static str,
    /// Inline `message_content` when the message is text
    pub text: Option<String>,
    /// Attached `message_content` part when the message is media
    pub media: Option<MediaPart>,
    /// `duration` field, sent for audio messages
    pub duration: Option<u32>,
}

/// Classify an outgoing chat message into its form fields
pub fn build_chat_fields(message: &ChatOutbound) -> ChatFields {
    match message {
        ChatOutbound::Text(text) => ChatFields {
            message_type: "text",
            text: Some(text.clone()),
            media: None,
            duration: None,
        },
        ChatOutbound::Audio { path, duration } => ChatFields {
            message_type: "audio",
            text: None,
            media: Some(MediaPart {
                field_name: "message_content".to_string(),
                file_name: format!("audio.{}", MediaKind::Audio.extension()),
                content_type: MediaKind::Audio.content_type(),
                path: path.clone(),
            }),
            duration: Some(*duration),
        },
        ChatOutbound::Image { path } => ChatFields {
            message_type: "image",
            text: None,
            media: Some(MediaPart {
                field_name: "message_content".to_string(),
                file_name: format!("image.{}", MediaKind::Image.extension()),
                content_type: MediaKind::Image.content_type(),
                path: path.clone(),
            }),
            duration: None,
        },
    }
}
