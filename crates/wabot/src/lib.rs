//! # wabot
//!
//! Update dispatching and conversation state for WhatsApp Cloud API bots.
//!
//! ## Architecture
//!
//! ```text
//! webhook ──▶ WhatsAppBot ──▶ IntakeQueue ──▶ Dispatcher ──▶ first matching Handler
//!             (serial or       (FIFO)          normalize,      │
//!              fan-out)                        mark as read,   └──▶ Messenger (replies)
//!                                              walk candidates
//! ```
//!
//! - **core**: payload normalization, per-kind extraction, the `Update` view
//!   and the outbound `Messenger` seam
//! - **framework**: handler builders, the registry, next-step conversations
//!   and the dispatcher
//! - **runtime**: configuration, logging and the `WhatsAppBot` host
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wabot::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bot = WhatsAppBot::builder().messenger(my_messenger()).build()?;
//!
//!     bot.register(on_message().pattern("(?i)hello").async_action(
//!         |update: Update, _| async move { update.reply_text("Hi!").await.map(drop) },
//!     )?);
//!
//!     for body in incoming_webhook_bodies() {
//!         bot.submit_update(RawUpdate::from_slice(&body)?).await;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use wabot_core as core;
pub use wabot_framework as framework;
pub use wabot_runtime as runtime;

/// Commonly used types for building bots.
pub mod prelude {
    // Host
    pub use wabot_runtime::{BotConfig, ExecutionMode, WhatsAppBot};

    // Handler registration
    pub use wabot_framework::{
        Action, Filter, Handler, HandlerError, HandlerResult, NextStep, UserContext, on_audio,
        on_image, on_interactive, on_location, on_message, on_sticker, on_unknown,
        on_unsupported, on_video,
    };

    // Updates and outbound calls
    pub use wabot_core::{
        BoxedMessenger, MessageKind, Messenger, RawUpdate, TextOptions, Update,
    };
}
