//! The message kinds the Cloud API delivers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The `type` field of an inbound message.
///
/// Types the dispatcher has no handler kind for (documents, reactions,
/// contacts, ...) are kept verbatim in [`MessageKind::Other`] so they can be
/// logged, but no handler ever matches them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    Text,
    Interactive,
    Image,
    Audio,
    Video,
    Sticker,
    Location,
    Unknown,
    Unsupported,
    Other(String),
}

impl MessageKind {
    /// Maps a wire `type` string onto a kind.
    pub fn from_wire(name: &str) -> Self {
        match name {
            "text" => Self::Text,
            "interactive" => Self::Interactive,
            "image" => Self::Image,
            "audio" => Self::Audio,
            "video" => Self::Video,
            "sticker" => Self::Sticker,
            "location" => Self::Location,
            "unknown" => Self::Unknown,
            "unsupported" => Self::Unsupported,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Interactive => "interactive",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Sticker => "sticker",
            Self::Location => "location",
            Self::Unknown => "unknown",
            Self::Unsupported => "unsupported",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for MessageKind {
    fn from(name: String) -> Self {
        Self::from_wire(&name)
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        kind.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_kinds_round_trip_through_wire_names() {
        for name in [
            "text",
            "interactive",
            "image",
            "audio",
            "video",
            "sticker",
            "location",
            "unknown",
            "unsupported",
        ] {
            let kind = MessageKind::from_wire(name);
            assert!(!matches!(kind, MessageKind::Other(_)), "{name}");
            assert_eq!(kind.as_str(), name);
        }
    }

    #[test]
    fn test_unlisted_kind_is_kept_verbatim() {
        let kind: MessageKind = serde_json::from_str("\"document\"").unwrap();
        assert_eq!(kind, MessageKind::Other("document".into()));
        assert_eq!(kind.to_string(), "document");
    }
}
