//! Webhook payloads and their normalization.
//!
//! A Cloud API webhook delivers an `entry → changes → value` tree. Only the
//! first entry, the first change and the first message are ever looked at;
//! anything after them is ignored without error.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use crate::error::UpdateError;
use crate::kind::MessageKind;

/// An inbound webhook payload, exactly as the provider sent it.
#[derive(Clone, PartialEq)]
pub struct RawUpdate(Value);

impl RawUpdate {
    /// Wraps an already-parsed payload.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Parses a payload from request body bytes.
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes).map(Self)
    }

    /// Returns `true` for `null` and for empty objects, arrays and strings.
    ///
    /// Such payloads are refused at intake and never reach the dispatcher.
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Borrows the underlying JSON.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwraps the underlying JSON.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl fmt::Debug for RawUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawUpdate").field(&self.0).finish()
    }
}

impl From<Value> for RawUpdate {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl FromStr for RawUpdate {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).map(Self)
    }
}

/// The identity fields of one inbound message.
///
/// Produced by [`Normalizer::normalize`]; the dispatcher combines it with a
/// handler's own [`Extracted`](crate::extract::Extracted) fields to build the
/// [`Update`](crate::update::Update) the handler sees.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub sender_id: String,
    pub sender_display_name: String,
    pub message_id: Option<String>,
    pub message_kind: MessageKind,
    pub timestamp: Option<i64>,
    pub message: Arc<Value>,
    pub value: Arc<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Contact {
    wa_id: String,
    profile: Profile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Profile {
    name: String,
}

/// Checks an update's shape and recipient and pulls out its first message.
#[derive(Debug, Clone)]
pub struct Normalizer {
    phone_number_id: Arc<str>,
}

impl Normalizer {
    /// Creates a normalizer for the given provider-assigned identity.
    pub fn new(phone_number_id: impl Into<Arc<str>>) -> Self {
        Self {
            phone_number_id: phone_number_id.into(),
        }
    }

    /// The identity updates must be addressed to.
    pub fn phone_number_id(&self) -> &str {
        &self.phone_number_id
    }

    /// Validates `raw` and returns its first message's identity fields.
    pub fn normalize(&self, raw: &RawUpdate) -> Result<Inbound, UpdateError> {
        let value = raw
            .as_value()
            .pointer("/entry/0/changes/0/value")
            .filter(|v| v.is_object())
            .ok_or_else(|| UpdateError::malformed("missing entry[0].changes[0].value"))?;

        let recipient = match value.pointer("/metadata/phone_number_id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => return Err(UpdateError::malformed("missing metadata.phone_number_id")),
        };
        if recipient != *self.phone_number_id {
            return Err(UpdateError::ForeignRecipient {
                expected: self.phone_number_id.to_string(),
                got: recipient,
            });
        }

        let message = match value.get("messages") {
            None | Some(Value::Null) => return Err(UpdateError::NoMessage),
            Some(Value::Array(messages)) => match messages.first() {
                None => return Err(UpdateError::NoMessage),
                Some(m) if m.is_object() => m,
                Some(_) => return Err(UpdateError::malformed("messages[0] is not an object")),
            },
            Some(_) => return Err(UpdateError::malformed("messages is not an array")),
        };

        let contact = value
            .pointer("/contacts/0")
            .and_then(|c| Contact::deserialize(c).ok())
            .unwrap_or_default();

        let sender_id = if contact.wa_id.is_empty() {
            message
                .get("from")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        } else {
            contact.wa_id
        };

        let message_kind = MessageKind::from_wire(
            message
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown"),
        );

        let timestamp = match message.get("timestamp") {
            Some(Value::String(s)) => s.parse().ok(),
            Some(Value::Number(n)) => n.as_i64(),
            _ => None,
        };

        let message_id = message.get("id").and_then(Value::as_str).map(String::from);
        trace!(
            sender = %sender_id,
            message_id = message_id.as_deref().unwrap_or(""),
            kind = %message_kind,
            "Update normalized"
        );

        Ok(Inbound {
            sender_id,
            sender_display_name: contact.profile.name,
            message_id,
            message_kind,
            timestamp,
            message: Arc::new(message.clone()),
            value: Arc::new(value.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(recipient: Value, messages: Option<Value>) -> RawUpdate {
        let mut value = json!({
            "messaging_product": "whatsapp",
            "metadata": {"display_phone_number": "15550000000", "phone_number_id": recipient},
            "contacts": [{"profile": {"name": "Test User"}, "wa_id": "1234567890"}]
        });
        if let Some(messages) = messages {
            value["messages"] = messages;
        }
        RawUpdate::new(json!({
            "object": "whatsapp_business_account",
            "entry": [{"id": "waba", "changes": [{"field": "messages", "value": value}]}]
        }))
    }

    fn text_message() -> Value {
        json!([{
            "from": "1234567890",
            "id": "wamid.abc",
            "timestamp": "1700000000",
            "type": "text",
            "text": {"body": "hi"}
        }])
    }

    #[test]
    fn test_normalizes_first_message() {
        let normalizer = Normalizer::new("123456789");
        let inbound = normalizer
            .normalize(&payload(json!("123456789"), Some(text_message())))
            .unwrap();

        assert_eq!(inbound.sender_id, "1234567890");
        assert_eq!(inbound.sender_display_name, "Test User");
        assert_eq!(inbound.message_id.as_deref(), Some("wamid.abc"));
        assert_eq!(inbound.message_kind, MessageKind::Text);
        assert_eq!(inbound.timestamp, Some(1_700_000_000));
    }

    #[test]
    fn test_numeric_recipient_is_compared_as_string() {
        let normalizer = Normalizer::new("123456789");
        assert!(
            normalizer
                .normalize(&payload(json!(123456789), Some(text_message())))
                .is_ok()
        );
    }

    #[test]
    fn test_foreign_recipient() {
        let normalizer = Normalizer::new("123456789");
        let err = normalizer
            .normalize(&payload(json!("987654321"), Some(text_message())))
            .unwrap_err();
        assert_eq!(
            err,
            UpdateError::ForeignRecipient {
                expected: "123456789".into(),
                got: "987654321".into()
            }
        );
    }

    #[test]
    fn test_missing_value_path_is_malformed() {
        let normalizer = Normalizer::new("123456789");
        let err = normalizer
            .normalize(&RawUpdate::new(json!({"entry": []})))
            .unwrap_err();
        assert!(matches!(err, UpdateError::Malformed { .. }));
    }

    #[test]
    fn test_status_callback_has_no_message() {
        let normalizer = Normalizer::new("123456789");
        let err = normalizer
            .normalize(&payload(json!("123456789"), None))
            .unwrap_err();
        assert_eq!(err, UpdateError::NoMessage);

        let err = normalizer
            .normalize(&payload(json!("123456789"), Some(json!([]))))
            .unwrap_err();
        assert_eq!(err, UpdateError::NoMessage);
    }

    #[test]
    fn test_raw_update_emptiness() {
        assert!(RawUpdate::new(Value::Null).is_empty());
        assert!(RawUpdate::new(json!({})).is_empty());
        assert!(!"{\"object\":\"whatsapp_business_account\"}"
            .parse::<RawUpdate>()
            .unwrap()
            .is_empty());
    }
}
