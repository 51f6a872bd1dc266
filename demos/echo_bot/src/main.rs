//! Echo Bot Example
//!
//! Replays WhatsApp Cloud API webhook payloads through a small bot. Outbound
//! calls are not sent anywhere; [`LoggingMessenger`] logs them instead.
//!
//! Handlers, in registration order:
//!
//! - `help` (persistent): answers `/help`, even mid-conversation
//! - `ask_name`: `/name` starts a two-step conversation
//! - `media`, `location`, `button`: describe what was received
//! - `echo`: repeats any other text
//!
//! # Usage
//!
//! ```bash
//! cd demos/echo_bot
//! cargo run --package echo-bot -- payloads/*.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use serde_json::{Value, json};
use tracing::{info, warn};

use wabot::core::ApiResult;
use wabot::framework::Dispatcher;
use wabot::prelude::*;
use wabot::runtime::ConfigLoader;

#[derive(Parser, Debug)]
#[command(name = "echo-bot", about = "Replay webhook payloads through an echo bot")]
struct Args {
    /// Configuration file; `wabot.toml` is searched for when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the configured phone number id.
    #[arg(long)]
    phone_number_id: Option<String>,

    /// Submit through the blocking path instead of the async one.
    #[arg(long)]
    blocking: bool,

    /// Webhook payload files (JSON), replayed in order.
    #[arg(required = true)]
    payloads: Vec<PathBuf>,
}

// ============================================================================
// Messenger
// ============================================================================

/// Logs outbound calls and answers like the Graph API would.
struct LoggingMessenger;

#[async_trait]
impl Messenger for LoggingMessenger {
    async fn send_text(&self, recipient: &str, body: &str, options: TextOptions) -> ApiResult<Value> {
        info!(
            to = recipient,
            reply_to = options.reply_to.as_deref().unwrap_or("-"),
            "send_text: {body}"
        );
        Ok(sent(recipient))
    }

    async fn send_media(
        &self,
        recipient: &str,
        link: &str,
        caption: Option<&str>,
    ) -> ApiResult<Value> {
        info!(to = recipient, link, caption = caption.unwrap_or(""), "send_media");
        Ok(sent(recipient))
    }

    async fn mark_as_read(&self, message_id: &str) -> ApiResult<()> {
        info!(message_id, "mark_as_read");
        Ok(())
    }
}

fn sent(recipient: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "contacts": [{"input": recipient, "wa_id": recipient}],
        "messages": [{"id": "wamid.outbound"}]
    })
}

// ============================================================================
// Handlers
// ============================================================================

async fn help(update: Update, _ctx: Option<UserContext>) -> HandlerResult {
    let help_text = "Echo Bot\n\
        /name  - let me learn your name\n\
        /help  - this help\n\
        anything else is echoed back";
    update.reply_text(help_text).await?;
    Ok(())
}

async fn ask_name(update: Update, dispatcher: Dispatcher) -> HandlerResult {
    update
        .reply_text("What's your name? Send 'cancel' to stop.")
        .await?;

    dispatcher.set_next_handler(
        &update.sender_id,
        NextStep::from_async("text", greet_by_name).end_action(Action::from_async(cancelled)),
    )?;
    Ok(())
}

async fn greet_by_name(update: Update, ctx: Option<UserContext>) -> HandlerResult {
    let profile = ctx
        .as_ref()
        .map(UserContext::sender_display_name)
        .unwrap_or_default();
    let name = update.message_text.trim();

    let reply = if profile.is_empty() || profile == name {
        format!("Nice to meet you, {name}!")
    } else {
        format!("Nice to meet you, {name}! Your profile says {profile}.")
    };
    update.reply_text(&reply).await?;
    Ok(())
}

async fn cancelled(update: Update, _ctx: Option<UserContext>) -> HandlerResult {
    update.reply_text("Okay, never mind.").await?;
    Ok(())
}

async fn media(update: Update, _ctx: Option<UserContext>) -> HandlerResult {
    let mime = update.media_mime_type.as_deref().unwrap_or("unknown type");
    let reply = if update.message_text.is_empty() {
        format!("Got your {} ({mime}).", update.message_kind)
    } else {
        format!(
            "Got your {} ({mime}): {}",
            update.message_kind, update.message_text
        )
    };
    update.reply_text(&reply).await?;
    Ok(())
}

fn location(update: Update, _ctx: Option<UserContext>) {
    info!(
        latitude = update.loc_latitude,
        longitude = update.loc_longitude,
        "Location received:\n{}",
        update.message_text
    );
}

async fn button(update: Update, _ctx: Option<UserContext>) -> HandlerResult {
    let title = update.interactive_title.as_deref().unwrap_or("?");
    update.reply_text(&format!("You picked '{title}'.")).await?;
    Ok(())
}

async fn echo(update: Update, _ctx: Option<UserContext>) -> HandlerResult {
    update.reply_text(&update.message_text).await?;
    Ok(())
}

fn register_handlers(bot: &WhatsAppBot) -> Result<()> {
    let dispatcher = bot.dispatcher().clone();

    bot.register(
        on_message()
            .pattern(r"(?i)/help\b")
            .persistent(true)
            .name("help")
            .async_action(help)?,
    );
    bot.register(
        on_message()
            .pattern(r"/name\b")
            .context(false)
            .name("ask_name")
            .async_action(move |update, _| ask_name(update, dispatcher.clone()))?,
    );
    bot.register_all([
        on_image().name("media").async_action(media)?,
        on_video().name("media").async_action(media)?,
        on_audio().name("media").async_action(media)?,
        on_location().name("location").action(location)?,
        on_interactive(true, true)
            .name("button")
            .async_action(button)?,
        on_message().name("echo").async_action(echo)?,
    ]);
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    let mut config = loader.load()?;
    if let Some(id) = args.phone_number_id {
        config.phone_number_id = id;
    }

    let bot = Arc::new(WhatsAppBot::from_config(
        &config,
        Arc::new(LoggingMessenger),
    )?);
    register_handlers(&bot)?;

    for path in &args.payloads {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let update = match RawUpdate::from_slice(&bytes) {
            Ok(update) => update,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unparsable payload");
                continue;
            }
        };

        info!(path = %path.display(), "Submitting update");
        if args.blocking {
            let bot = Arc::clone(&bot);
            tokio::task::spawn_blocking(move || bot.submit_update_blocking(update)).await?;
        } else {
            bot.submit_update(update).await;
        }
    }

    bot.wait_idle().await;
    if args.blocking {
        let bot = Arc::clone(&bot);
        tokio::task::spawn_blocking(move || bot.join_workers()).await?;
    }

    info!("Replay finished");
    Ok(())
}
