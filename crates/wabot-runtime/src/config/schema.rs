//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use wabot_framework::DEFAULT_END_KEYWORD;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Provider-assigned identity of this bot; updates addressed to any
    /// other phone number id are dropped.
    #[serde(default, deserialize_with = "string_or_number")]
    pub phone_number_id: String,

    /// Mark every accepted message as read before dispatching it.
    #[serde(default = "default_true")]
    pub mark_as_read: bool,

    /// How updates are executed.
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Conversation (next step) settings.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            phone_number_id: String::new(),
            mark_as_read: true,
            execution: ExecutionConfig::default(),
            conversation: ConversationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Phone number ids are digits; accept them written as numbers too.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Int(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Str(s) => s,
        Id::Int(n) => n.to_string(),
    })
}

// =============================================================================
// Execution
// =============================================================================

/// Execution settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Serial or fan-out.
    #[serde(default)]
    pub mode: ExecutionMode,
}

/// How queued updates are processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// One update at a time, in arrival order.
    #[default]
    Serial,
    /// Each update on its own task or thread.
    FanOut,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => f.write_str("serial"),
            Self::FanOut => f.write_str("fan-out"),
        }
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Default pattern that cancels a pending next step.
    #[serde(default = "default_end_keyword")]
    pub end_keyword: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            end_keyword: default_end_keyword(),
        }
    }
}

fn default_end_keyword() -> String {
    DEFAULT_END_KEYWORD.to_string()
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
///
/// ```toml
/// [logging]
/// level = "warn"
/// dispatch_level = "debug"
/// dispatch_spans = "close"
///
/// [logging.filters]
/// my_bot = "info"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level for every target (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Level for the dispatch crates (`wabot_core`, `wabot_framework`).
    /// Falls back to `level`.
    #[serde(default)]
    pub dispatch_level: Option<String>,

    /// Whether each update's `dispatch` span is logged as it opens and closes.
    #[serde(default)]
    pub dispatch_spans: DispatchSpans,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file, required when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Extra per-target levels, e.g. `my_bot = "trace"`. A target named here
    /// replaces the dispatch default for that target.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dispatch_level: None,
            dispatch_spans: DispatchSpans::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            thread_ids: false,
            file_location: false,
            filters: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// The base level as a `tracing` level, if it parses.
    pub fn tracing_level(&self) -> Option<tracing::Level> {
        self.level.parse().ok()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Span events logged for the per-update `dispatch` span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchSpans {
    #[default]
    Off,
    /// One line per finished update, with busy and idle time.
    Close,
    /// A line when an update starts and another when it finishes.
    Lifecycle,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// One JSON object per line.
    #[cfg(feature = "json-log")]
    Json,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}
