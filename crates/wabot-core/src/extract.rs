//! Per-kind field extraction.
//!
//! Every handler kind owns one of the functions in this module. The
//! dispatcher calls the candidate's own function rather than a global one, so
//! two interactive handlers with different button/list settings can derive
//! different text from the same message.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ExtractError, ExtractResult};

/// Fields pulled out of a single message by a handler kind.
///
/// Everything except `text` is kind-specific and stays `None` (or `false`)
/// for kinds that do not carry it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    /// The text filters are evaluated against.
    pub text: String,
    /// Title of the chosen button or list row.
    pub interactive_title: Option<String>,
    pub media_mime_type: Option<String>,
    pub media_file_id: Option<String>,
    pub media_hash: Option<String>,
    pub media_voice: bool,
    pub loc_name: Option<String>,
    pub loc_address: Option<String>,
    pub loc_latitude: Option<f64>,
    pub loc_longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MediaObject {
    id: String,
    mime_type: String,
    sha256: String,
    caption: String,
    voice: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LocationObject {
    latitude: Option<f64>,
    longitude: Option<f64>,
    name: String,
    address: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReplyObject {
    id: String,
    title: String,
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// Deserializes `message[key]`, treating an absent or null key as empty.
fn object<T>(message: &Value, key: &'static str) -> ExtractResult<T>
where
    T: Default + for<'de> Deserialize<'de>,
{
    match message.get(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v) => T::deserialize(v).map_err(|e| ExtractError::InvalidField {
            field: key,
            reason: e.to_string(),
        }),
    }
}

fn media(message: &Value, key: &'static str, with_caption: bool) -> ExtractResult<Extracted> {
    let m: MediaObject = object(message, key)?;
    Ok(Extracted {
        text: if with_caption { m.caption } else { String::new() },
        media_mime_type: non_empty(m.mime_type),
        media_file_id: non_empty(m.id),
        media_hash: non_empty(m.sha256),
        media_voice: m.voice,
        ..Default::default()
    })
}

/// `text.body`.
pub fn text(message: &Value) -> ExtractResult<Extracted> {
    let body = message
        .pointer("/text/body")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Ok(Extracted {
        text: body.to_string(),
        ..Default::default()
    })
}

/// The id of the chosen button or list row, depending on which reply
/// subtypes the handler honours.
///
/// `interactive.type` is required; a message without it fails extraction.
pub fn interactive(
    message: &Value,
    handle_button: bool,
    handle_list: bool,
) -> ExtractResult<Extracted> {
    let interactive = message
        .get("interactive")
        .ok_or(ExtractError::MissingField("interactive"))?;
    let subtype = interactive
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ExtractError::MissingField("interactive.type"))?;

    let key = match subtype {
        "button_reply" if handle_button => "button_reply",
        "list_reply" if handle_list => "list_reply",
        _ => return Ok(Extracted::default()),
    };

    let reply: ReplyObject = object(interactive, key)?;
    Ok(Extracted {
        text: reply.id,
        interactive_title: non_empty(reply.title),
        ..Default::default()
    })
}

/// Caption plus media metadata.
pub fn image(message: &Value) -> ExtractResult<Extracted> {
    media(message, "image", true)
}

/// Caption plus media metadata.
pub fn video(message: &Value) -> ExtractResult<Extracted> {
    media(message, "video", true)
}

/// Media metadata and the voice-note flag; audio has no caption.
pub fn audio(message: &Value) -> ExtractResult<Extracted> {
    media(message, "audio", false)
}

/// Media metadata only.
pub fn sticker(message: &Value) -> ExtractResult<Extracted> {
    let mut data = media(message, "sticker", false)?;
    data.media_voice = false;
    Ok(data)
}

/// Location fields, with `"{name}\n{address}"` as text when an address is
/// present and a coordinate string otherwise.
pub fn location(message: &Value) -> ExtractResult<Extracted> {
    let loc: LocationObject = object(message, "location")?;

    let text = if loc.address.is_empty() {
        // TODO: confirm whether the `lat` slot should carry the latitude;
        // bots already in production pattern-match on this exact text.
        let long = loc.longitude.map(|v| v.to_string()).unwrap_or_default();
        format!("long - _{long}_\nlat - _{long}_")
    } else {
        format!("{}\n{}", loc.name, loc.address)
    };

    Ok(Extracted {
        text,
        loc_name: non_empty(loc.name),
        loc_address: non_empty(loc.address),
        loc_latitude: loc.latitude,
        loc_longitude: loc.longitude,
        ..Default::default()
    })
}

/// Kinds with no structured payload.
pub fn nothing(_message: &Value) -> ExtractResult<Extracted> {
    Ok(Extracted::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_body() {
        let msg = json!({"type": "text", "text": {"body": "hello"}});
        assert_eq!(text(&msg).unwrap().text, "hello");
    }

    #[test]
    fn test_text_without_body_is_empty() {
        let msg = json!({"type": "text"});
        assert_eq!(text(&msg).unwrap().text, "");
    }

    #[test]
    fn test_button_reply_honoured_only_when_enabled() {
        let msg = json!({
            "type": "interactive",
            "interactive": {
                "type": "button_reply",
                "button_reply": {"id": "confirm", "title": "Confirm"}
            }
        });

        let data = interactive(&msg, true, false).unwrap();
        assert_eq!(data.text, "confirm");
        assert_eq!(data.interactive_title.as_deref(), Some("Confirm"));

        assert_eq!(interactive(&msg, false, true).unwrap().text, "");
    }

    #[test]
    fn test_list_reply_honoured_only_when_enabled() {
        let msg = json!({
            "type": "interactive",
            "interactive": {
                "type": "list_reply",
                "list_reply": {"id": "option_1", "title": "Option 1"}
            }
        });

        assert_eq!(interactive(&msg, false, true).unwrap().text, "option_1");
        assert_eq!(interactive(&msg, true, false).unwrap().text, "");
    }

    #[test]
    fn test_interactive_without_subtype_fails() {
        let msg = json!({"type": "interactive", "interactive": {}});
        assert_eq!(
            interactive(&msg, true, true),
            Err(ExtractError::MissingField("interactive.type"))
        );
    }

    #[test]
    fn test_image_fields() {
        let msg = json!({
            "type": "image",
            "image": {
                "caption": "Test image",
                "mime_type": "image/jpeg",
                "sha256": "abc",
                "id": "image_123"
            }
        });

        let data = image(&msg).unwrap();
        assert_eq!(data.text, "Test image");
        assert_eq!(data.media_mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(data.media_file_id.as_deref(), Some("image_123"));
        assert_eq!(data.media_hash.as_deref(), Some("abc"));
    }

    #[test]
    fn test_audio_has_no_caption_but_voice_flag() {
        let msg = json!({
            "type": "audio",
            "audio": {
                "caption": "ignored",
                "mime_type": "audio/ogg; codecs=opus",
                "id": "audio_1",
                "voice": true
            }
        });

        let data = audio(&msg).unwrap();
        assert_eq!(data.text, "");
        assert!(data.media_voice);
        assert_eq!(data.media_file_id.as_deref(), Some("audio_1"));
    }

    #[test]
    fn test_mistyped_media_object_fails() {
        let msg = json!({"type": "video", "video": "not-an-object"});
        assert!(matches!(
            video(&msg),
            Err(ExtractError::InvalidField { field: "video", .. })
        ));
    }

    #[test]
    fn test_location_with_address() {
        let msg = json!({
            "type": "location",
            "location": {
                "latitude": 37.7749,
                "longitude": -122.4194,
                "name": "HQ",
                "address": "1 Market St"
            }
        });

        let data = location(&msg).unwrap();
        assert_eq!(data.text, "HQ\n1 Market St");
        assert_eq!(data.loc_latitude, Some(37.7749));
        assert_eq!(data.loc_longitude, Some(-122.4194));
    }

    #[test]
    fn test_location_without_address_uses_coordinate_text() {
        let msg = json!({
            "type": "location",
            "location": {"latitude": 37.7749, "longitude": -122.4194}
        });

        let data = location(&msg).unwrap();
        assert_eq!(data.text, "long - _-122.4194_\nlat - _-122.4194_");
        assert_eq!(data.loc_name, None);
    }
}
