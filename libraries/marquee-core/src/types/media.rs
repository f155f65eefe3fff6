//! Media category classification
use serde::{Deserialize, Serialize};

/// Broad media category of a track, derived from its MIME type
///
/// Only `Audio` can be rendered by the playback channel; everything else
/// is surfaced to the user as an unsupported item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    /// Streamable audio (mp3, aac, ogg, ...)
    #[default]
    Audio,
    /// Video content
    Video,
    /// Still image
    Image,
    /// Document (pdf, text, ...)
    Document,
    /// Anything the catalog could not classify
    Other,
}

impl MediaCategory {
    /// Classify a MIME type string such as `audio/mpeg`
    pub fn from_mime(mime: &str) -> Self {
        let top_level = mime
            .split('/')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match top_level.as_str() {
            "audio" => Self::Audio,
            "video" => Self::Video,
            "image" => Self::Image,
            "text" | "application" => Self::Document,
            _ => Self::Other,
        }
    }

    /// Whether the audio channel can play this category
    pub fn is_audio_playable(self) -> bool {
        matches!(self, Self::Audio)
    }

    /// Lowercase label used in logs and error messages
    pub fn label(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Image => "image",
            Self::Document => "document",
            Self::Other => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_mime_types() {
        assert_eq!(MediaCategory::from_mime("audio/mpeg"), MediaCategory::Audio);
        assert_eq!(MediaCategory::from_mime("Audio/OGG"), MediaCategory::Audio);
        assert_eq!(MediaCategory::from_mime("video/mp4"), MediaCategory::Video);
        assert_eq!(MediaCategory::from_mime("image/png"), MediaCategory::Image);
        assert_eq!(
            MediaCategory::from_mime("application/pdf"),
            MediaCategory::Document
        );
        assert_eq!(MediaCategory::from_mime(""), MediaCategory::Other);
    }

    #[test]
    fn only_audio_is_playable() {
        assert!(MediaCategory::Audio.is_audio_playable());
        assert!(!MediaCategory::Video.is_audio_playable());
        assert!(!MediaCategory::Image.is_audio_playable());
    }
}
