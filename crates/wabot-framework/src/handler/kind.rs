//! Handler kinds and their extraction table.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use wabot_core::{ExtractResult, Extracted, MessageKind, extract};

use crate::error::RegistrationError;

/// The closed set of handler kinds.
///
/// A kind decides which message kind a handler can match and how the
/// handler derives its text from the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// Text messages.
    Message,
    /// Button and list replies; each flag enables one reply subtype.
    InteractiveQuery {
        handle_button: bool,
        handle_list: bool,
    },
    Image,
    Audio,
    Video,
    Sticker,
    Location,
    Unknown,
    Unsupported,
}

impl HandlerKind {
    /// An interactive kind honouring both reply subtypes.
    pub const INTERACTIVE: Self = Self::InteractiveQuery {
        handle_button: true,
        handle_list: true,
    };

    /// The message kind this handler kind matches.
    pub fn message_kind(&self) -> MessageKind {
        match self {
            Self::Message => MessageKind::Text,
            Self::InteractiveQuery { .. } => MessageKind::Interactive,
            Self::Image => MessageKind::Image,
            Self::Audio => MessageKind::Audio,
            Self::Video => MessageKind::Video,
            Self::Sticker => MessageKind::Sticker,
            Self::Location => MessageKind::Location,
            Self::Unknown => MessageKind::Unknown,
            Self::Unsupported => MessageKind::Unsupported,
        }
    }

    /// Whether a message of `kind` can reach this handler.
    pub fn accepts(&self, kind: &MessageKind) -> bool {
        self.message_kind() == *kind
    }

    /// Runs this kind's extraction rule over a message.
    pub fn extract(&self, message: &Value) -> ExtractResult<Extracted> {
        match *self {
            Self::Message => extract::text(message),
            Self::InteractiveQuery {
                handle_button,
                handle_list,
            } => extract::interactive(message, handle_button, handle_list),
            Self::Image => extract::image(message),
            Self::Audio => extract::audio(message),
            Self::Video => extract::video(message),
            Self::Sticker => extract::sticker(message),
            Self::Location => extract::location(message),
            Self::Unknown | Self::Unsupported => extract::nothing(message),
        }
    }

    /// The kind's name as used in logs and in [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            Self::Message => "text",
            Self::InteractiveQuery { .. } => "interactive",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Sticker => "sticker",
            Self::Location => "location",
            Self::Unknown => "unknown",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HandlerKind {
    type Err = RegistrationError;

    /// Parses a kind name. `message` is accepted as an alias of `text`;
    /// `interactive` honours both reply subtypes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "message" => Ok(Self::Message),
            "interactive" | "interactive_query" => Ok(Self::INTERACTIVE),
            "image" => Ok(Self::Image),
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            "sticker" => Ok(Self::Sticker),
            "location" => Ok(Self::Location),
            "unknown" => Ok(Self::Unknown),
            "unsupported" => Ok(Self::Unsupported),
            _ => Err(RegistrationError::UnknownKind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind_names() {
        assert_eq!("message".parse::<HandlerKind>().unwrap(), HandlerKind::Message);
        assert_eq!("Text".parse::<HandlerKind>().unwrap(), HandlerKind::Message);
        assert_eq!(
            "interactive".parse::<HandlerKind>().unwrap(),
            HandlerKind::INTERACTIVE
        );
        assert!(matches!(
            "document".parse::<HandlerKind>(),
            Err(RegistrationError::UnknownKind(name)) if name == "document"
        ));
    }

    #[test]
    fn test_kind_accepts_only_its_message_kind() {
        assert!(HandlerKind::Image.accepts(&MessageKind::Image));
        assert!(!HandlerKind::Image.accepts(&MessageKind::Video));
        assert!(!HandlerKind::Message.accepts(&MessageKind::Other("document".into())));
    }
}
