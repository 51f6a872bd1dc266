//! Configuration for wabot hosts.
//!
//! Settings come from TOML or YAML files, `WABOT_*` environment variables
//! and programmatic overrides, and are checked by [`validate_config`]
//! before a bot is built from them.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{
    BotConfig, ConversationConfig, DispatchSpans, ExecutionConfig, ExecutionMode, LogFormat,
    LogOutput, LoggingConfig,
};
pub use validation::validate_config;
