//! Logging setup on top of `tracing-subscriber`.
//!
//! The filter is built from three groups of directives, later ones being more
//! specific:
//!
//! 1. the base level, for every target;
//! 2. the dispatch crates ([`DISPATCH_TARGETS`]) at the dispatch level;
//! 3. per-target filters from the configuration.
//!
//! The per-update `dispatch` span is a debug span of `wabot_framework`. When
//! its span events are switched on, that target is raised to at least
//! `debug` so the span exists. `RUST_LOG`, when set, replaces everything.
//!
//! ```rust,ignore
//! use wabot_runtime::config::DispatchSpans;
//! use wabot_runtime::logging::LoggingBuilder;
//!
//! LoggingBuilder::new()
//!     .level(tracing::Level::WARN)
//!     .dispatch_spans(DispatchSpans::Close)
//!     .try_init()?;
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{Level, debug, warn};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{DispatchSpans, LogFormat, LogOutput, LoggingConfig};

/// Targets that log per-update work.
pub const DISPATCH_TARGETS: [&str; 2] = ["wabot_core", "wabot_framework"];

const SPAN_TARGET: &str = "wabot_framework";
const FALLBACK_FILE_NAME: &str = "wabot.log";

/// Installs the global subscriber described by `config`.
///
/// A subscriber that is already installed is kept.
pub fn init_from_config(config: &LoggingConfig) {
    if let Err(e) = LoggingBuilder::from_config(config).try_init() {
        debug!(error = %e, "Keeping the installed subscriber");
    }
}

/// Builds the global subscriber.
#[derive(Debug)]
pub struct LoggingBuilder {
    level: Level,
    dispatch_level: Option<Level>,
    dispatch_spans: DispatchSpans,
    filters: Vec<(String, String)>,
    format: LogFormat,
    output: LogOutput,
    file_path: Option<PathBuf>,
    thread_ids: bool,
    file_location: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            dispatch_level: None,
            dispatch_spans: DispatchSpans::Off,
            filters: Vec::new(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            thread_ids: false,
            file_location: false,
        }
    }
}

impl LoggingBuilder {
    /// Compact output on stdout at `info`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Unparsable levels fall back to `info` and the base level
    /// respectively; validated configs never carry one.
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            level: config.tracing_level().unwrap_or(Level::INFO),
            dispatch_level: config
                .dispatch_level
                .as_deref()
                .and_then(|level| level.parse().ok()),
            dispatch_spans: config.dispatch_spans,
            filters: config
                .filters
                .iter()
                .map(|(target, level)| (target.clone(), level.to_lowercase()))
                .collect(),
            format: config.format,
            output: config.output,
            file_path: config.file_path.clone(),
            thread_ids: config.thread_ids,
            file_location: config.file_location,
        }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn dispatch_level(mut self, level: Level) -> Self {
        self.dispatch_level = Some(level);
        self
    }

    pub fn dispatch_spans(mut self, spans: DispatchSpans) -> Self {
        self.dispatch_spans = spans;
        self
    }

    /// Sets the level for one target, overriding the dispatch default if
    /// the target is one of [`DISPATCH_TARGETS`].
    pub fn filter(mut self, target: impl Into<String>, level: Level) -> Self {
        self.filters
            .push((target.into(), level.as_str().to_lowercase()));
        self
    }

    /// The filter directives, in the order they are applied.
    fn directives(&self) -> Vec<String> {
        let mut directives = vec![self.level.as_str().to_lowercase()];

        for target in DISPATCH_TARGETS {
            if self.filters.iter().any(|(t, _)| t == target) {
                continue;
            }
            let mut level = self.dispatch_level.unwrap_or(self.level);
            // Greater is more verbose.
            if target == SPAN_TARGET && self.dispatch_spans != DispatchSpans::Off {
                level = level.max(Level::DEBUG);
            }
            directives.push(format!("{target}={}", level.as_str().to_lowercase()));
        }

        directives.extend(
            self.filters
                .iter()
                .map(|(target, level)| format!("{target}={level}")),
        );
        directives
    }

    fn env_filter(&self) -> EnvFilter {
        if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
            return EnvFilter::from_default_env();
        }
        EnvFilter::builder().parse_lossy(self.directives().join(","))
    }

    /// Returns the writer and whether a file was requested without a path.
    fn writer(&self) -> (BoxMakeWriter, bool) {
        match (self.output, &self.file_path) {
            (LogOutput::Stdout, _) => (BoxMakeWriter::new(std::io::stdout), false),
            (LogOutput::Stderr, _) => (BoxMakeWriter::new(std::io::stderr), false),
            (LogOutput::File, Some(path)) => {
                let dir = path
                    .parent()
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                let name = path
                    .file_name()
                    .unwrap_or_else(|| OsStr::new(FALLBACK_FILE_NAME));
                let appender = tracing_appender::rolling::never(dir, name);
                (BoxMakeWriter::new(appender), false)
            }
            (LogOutput::File, None) => (BoxMakeWriter::new(std::io::stderr), true),
        }
    }

    fn fmt_layer(&self, writer: BoxMakeWriter) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = fmt::layer::<Registry>()
            .with_writer(writer)
            .with_span_events(span_events(self.dispatch_spans))
            .with_thread_ids(self.thread_ids)
            .with_file(self.file_location)
            .with_line_number(self.file_location);

        match self.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Full => layer.boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
        }
    }

    /// Installs the subscriber. Fails if one is already set.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let (writer, missing_file) = self.writer();

        tracing_subscriber::registry()
            .with(self.fmt_layer(writer))
            .with(self.env_filter())
            .try_init()?;

        if missing_file {
            warn!("File output requested without a file path, logging to stderr");
        }
        debug!(directives = ?self.directives(), "Logging initialized");
        Ok(())
    }
}

fn span_events(spans: DispatchSpans) -> FmtSpan {
    match spans {
        DispatchSpans::Off => FmtSpan::NONE,
        DispatchSpans::Close => FmtSpan::CLOSE,
        DispatchSpans::Lifecycle => FmtSpan::NEW | FmtSpan::CLOSE,
    }
}
