//! The handler-facing update view.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ApiResult;
use crate::extract::Extracted;
use crate::kind::MessageKind;
use crate::messenger::{BoxedMessenger, TextOptions};
use crate::payload::Inbound;

/// One inbound message as a handler sees it.
///
/// The identity fields come from normalization; `message_text` and the
/// kind-specific fields come from the matched handler's own extraction, so
/// two handlers may see different text for the same message.
#[derive(Clone)]
pub struct Update {
    pub sender_id: String,
    pub sender_display_name: String,
    pub message_id: Option<String>,
    pub message_kind: MessageKind,
    pub timestamp: Option<i64>,
    pub message_text: String,
    pub interactive_title: Option<String>,
    pub media_mime_type: Option<String>,
    pub media_file_id: Option<String>,
    pub media_hash: Option<String>,
    pub media_voice: bool,
    pub loc_name: Option<String>,
    pub loc_address: Option<String>,
    pub loc_latitude: Option<f64>,
    pub loc_longitude: Option<f64>,
    message: Arc<Value>,
    value: Arc<Value>,
    messenger: BoxedMessenger,
}

impl Update {
    /// Merges an inbound message with a handler's extracted fields.
    pub fn new(inbound: &Inbound, data: Extracted, messenger: BoxedMessenger) -> Self {
        Self {
            sender_id: inbound.sender_id.clone(),
            sender_display_name: inbound.sender_display_name.clone(),
            message_id: inbound.message_id.clone(),
            message_kind: inbound.message_kind.clone(),
            timestamp: inbound.timestamp,
            message_text: data.text,
            interactive_title: data.interactive_title,
            media_mime_type: data.media_mime_type,
            media_file_id: data.media_file_id,
            media_hash: data.media_hash,
            media_voice: data.media_voice,
            loc_name: data.loc_name,
            loc_address: data.loc_address,
            loc_latitude: data.loc_latitude,
            loc_longitude: data.loc_longitude,
            message: Arc::clone(&inbound.message),
            value: Arc::clone(&inbound.value),
            messenger,
        }
    }

    /// The first message object, verbatim.
    pub fn raw_message(&self) -> &Value {
        &self.message
    }

    /// The `entry[0].changes[0].value` object, verbatim.
    pub fn raw_value(&self) -> &Value {
        &self.value
    }

    /// The outbound messenger.
    pub fn messenger(&self) -> &BoxedMessenger {
        &self.messenger
    }

    /// Replies to the sender, quoting this message.
    pub async fn reply_text(&self, body: &str) -> ApiResult<Value> {
        let options = match &self.message_id {
            Some(id) => TextOptions::reply_to(id.as_str()),
            None => TextOptions::default(),
        };
        self.messenger
            .send_text(&self.sender_id, body, options)
            .await
    }

    /// Sends media back to the sender.
    pub async fn reply_media(&self, link: &str, caption: Option<&str>) -> ApiResult<Value> {
        self.messenger
            .send_media(&self.sender_id, link, caption)
            .await
    }

    /// Marks this message as read. A message without an id is a no-op.
    pub async fn mark_as_read(&self) -> ApiResult<()> {
        match &self.message_id {
            Some(id) => self.messenger.mark_as_read(id).await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Update")
            .field("sender_id", &self.sender_id)
            .field("message_id", &self.message_id)
            .field("message_kind", &self.message_kind)
            .field("message_text", &self.message_text)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::messenger::Messenger;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMessenger {
        sent: Mutex<Vec<(String, String, Option<String>)>>,
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send_text(
            &self,
            recipient: &str,
            body: &str,
            options: TextOptions,
        ) -> ApiResult<Value> {
            self.sent
                .lock()
                .unwrap()
                .push((recipient.into(), body.into(), options.reply_to));
            Ok(json!({"messages": [{"id": "wamid.out"}]}))
        }

        async fn send_media(&self, _: &str, _: &str, _: Option<&str>) -> ApiResult<Value> {
            Err(ApiError::Other("unsupported".into()))
        }

        async fn mark_as_read(&self, _: &str) -> ApiResult<()> {
            Ok(())
        }
    }

    fn inbound() -> Inbound {
        let message = json!({"id": "wamid.in", "type": "text", "text": {"body": "ping"}});
        Inbound {
            sender_id: "1234567890".into(),
            sender_display_name: "Test User".into(),
            message_id: Some("wamid.in".into()),
            message_kind: MessageKind::Text,
            timestamp: None,
            message: Arc::new(message),
            value: Arc::new(json!({})),
        }
    }

    #[tokio::test]
    async fn test_reply_text_quotes_inbound_message() {
        let messenger = Arc::new(RecordingMessenger::default());
        let update = Update::new(
            &inbound(),
            Extracted {
                text: "ping".into(),
                ..Default::default()
            },
            messenger.clone(),
        );

        update.reply_text("pong").await.unwrap();

        let sent = messenger.sent.lock().unwrap();
        assert_eq!(
            sent.as_slice(),
            &[(
                "1234567890".to_string(),
                "pong".to_string(),
                Some("wamid.in".to_string())
            )]
        );
        assert_eq!(update.raw_message()["text"]["body"], "ping");
    }
}
