//! wabot runtime: hosting layer for the wabot framework.
//!
//! This crate provides:
//! - Configuration loading and validation (`config`)
//! - Logging setup driven by that configuration (`logging`)
//! - [`WhatsAppBot`], which owns a dispatcher and the intake queue and runs
//!   updates serially or fanned out over tokio tasks or OS threads
//!
//! ```ignore
//! use wabot_runtime::WhatsAppBot;
//! use wabot_framework::on_message;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bot = WhatsAppBot::builder().messenger(messenger).build()?;
//!     bot.register(on_message().pattern("(?i)hi").action(greet)?);
//!
//!     // For every webhook POST body:
//!     bot.submit_update(RawUpdate::from_slice(&body)?).await;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod config;
pub mod error;
pub mod logging;

// Re-exports
pub use bot::{BotBuilder, WhatsAppBot};
pub use config::{
    BotConfig, ConfigError, ConfigLoader, ConfigResult, DispatchSpans, ExecutionMode,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros and `Level`.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
