//! Note bodies: the ordered item sequence a user authored

use serde::{Deserialize, Serialize};

/// The authored content of one note, in display order
pub type NoteBody = Vec<NoteItem>;

/// A single authored segment of a note
///
/// Media items name a file stored next to the body inside the note's
/// directory; the bytes themselves never live in the body file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NoteItem {
    Text {
        text: String,
    },
    Image {
        file: String,
    },
    Audio {
        file: String,
        /// Recording length in seconds, when the recorder reported one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<u32>,
    },
}

/// Media classification, fixing the wire content type and file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    pub fn content_type(&self) -> &'static str {
        match self {
            MediaKind::Image => "image/jpeg",
            MediaKind::Audio => "audio/m4a",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "jpg",
            MediaKind::Audio => "m4a",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_serialize_with_type_tag() {
        let item = NoteItem::Text { text: "hello".to_string() };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["text"], "hello");

        let item = NoteItem::Audio { file: "audio-1.m4a".to_string(), duration: Some(12) };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "audio");
        assert_eq!(json["duration"], 12);
    }

    #[test]
    fn audio_duration_is_optional_on_read() {
        let json = r#"{"type": "audio", "file": "audio-0.m4a"}"#;
        let item: NoteItem = serde_json::from_str(json).unwrap();
        assert_eq!(
            item,
            NoteItem::Audio { file: "audio-0.m4a".to_string(), duration: None }
        );
    }

    #[test]
    fn body_round_trips_mixed_items() {
        let body: NoteBody = vec![
            NoteItem::Text { text: "before".to_string() },
            NoteItem::Image { file: "image-1.jpg".to_string() },
            NoteItem::Text { text: "after".to_string() },
        ];
        let json = serde_json::to_string(&body).unwrap();
        let back: NoteBody = serde_json::from_str(&json).unwrap();
        assert_eq!(back, body);
    }
}
