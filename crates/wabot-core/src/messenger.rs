//! The outbound messaging collaborator.
//!
//! The dispatcher never talks HTTP itself. Everything it (or a handler)
//! sends back to the provider goes through a [`Messenger`], which hosts
//! implement on top of whatever client they use.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// Options for [`Messenger::send_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOptions {
    /// Message id to quote in the reply.
    pub reply_to: Option<String>,
    /// Whether the provider should render link previews.
    pub preview_url: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            reply_to: None,
            preview_url: true,
        }
    }
}

impl TextOptions {
    /// Options quoting the given message.
    pub fn reply_to(message_id: impl Into<String>) -> Self {
        Self {
            reply_to: Some(message_id.into()),
            ..Default::default()
        }
    }
}

/// Outbound API surface consumed by the dispatcher and by handlers.
///
/// Implementations must be cheap to share: the dispatcher holds one behind an
/// `Arc` and hands clones to every update view.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends a text message to `recipient`.
    async fn send_text(&self, recipient: &str, body: &str, options: TextOptions)
    -> ApiResult<Value>;

    /// Sends media by link or previously uploaded id.
    async fn send_media(
        &self,
        recipient: &str,
        link: &str,
        caption: Option<&str>,
    ) -> ApiResult<Value>;

    /// Marks an inbound message as read. Best-effort.
    async fn mark_as_read(&self, message_id: &str) -> ApiResult<()>;
}

/// Type alias for a shared messenger.
pub type BoxedMessenger = Arc<dyn Messenger>;

/// A messenger with no outbound client attached.
///
/// Every call fails with [`ApiError::NotConnected`]. Used when a dispatcher is
/// built without a messenger, mostly in tests and offline replays.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledMessenger;

#[async_trait]
impl Messenger for DisabledMessenger {
    async fn send_text(&self, _: &str, _: &str, _: TextOptions) -> ApiResult<Value> {
        Err(ApiError::NotConnected)
    }

    async fn send_media(&self, _: &str, _: &str, _: Option<&str>) -> ApiResult<Value> {
        Err(ApiError::NotConnected)
    }

    async fn mark_as_read(&self, _: &str) -> ApiResult<()> {
        Err(ApiError::NotConnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_messenger_rejects_everything() {
        let messenger: BoxedMessenger = Arc::new(DisabledMessenger);
        assert!(matches!(
            messenger.send_text("1", "hi", TextOptions::default()).await,
            Err(ApiError::NotConnected)
        ));
        assert!(matches!(
            messenger.mark_as_read("wamid.1").await,
            Err(ApiError::NotConnected)
        ));
    }

    #[test]
    fn test_text_options_default_previews_links() {
        let options = TextOptions::reply_to("wamid.1");
        assert_eq!(options.reply_to.as_deref(), Some("wamid.1"));
        assert!(options.preview_url);
    }
}
