//! Logging setup for Warden.
//!
//! One `tracing-subscriber` registry is built from [`LoggingConfig`]:
//! an `EnvFilter` (with `RUST_LOG` taking precedence over the configured
//! level), one fmt layer in the configured format and a writer for the
//! configured output.
//!
//! Dispatch emits a `dispatch` span per event and a `listener` span per
//! listener. Listener skip and finish decisions are logged at `trace` under
//! the `warden_framework::manager` target, so the cheapest way to see why a
//! listener did or did not run is [`LoggingBuilder::trace_listeners`]:
//!
//! ```rust,ignore
//! use warden_runtime::LoggingBuilder;
//!
//! LoggingBuilder::new().trace_listeners().init();
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig, SpanEventConfig};

/// Target of the listener walk's per-listener events.
const LISTENER_TARGET: &str = "warden_framework::manager";
const DEFAULT_LOG_FILE: &str = "warden.log";

/// Installs the global subscriber described by `config`.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

fn fmt_span(config: &SpanEventConfig) -> FmtSpan {
    [
        (config.new, FmtSpan::NEW),
        (config.enter, FmtSpan::ENTER),
        (config.exit, FmtSpan::EXIT),
        (config.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .fold(FmtSpan::NONE, |acc, (_, span)| acc | span)
}

/// Programmatic logging setup, for binaries that do not go through
/// [`WardenConfig`](crate::WardenConfig).
#[derive(Debug)]
pub struct LoggingBuilder {
    level: tracing::Level,
    directives: Vec<String>,
    span_events: SpanEventConfig,
    format: LogFormat,
    output: LogOutput,
    thread_ids: bool,
    file_location: bool,
    file_path: Option<PathBuf>,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::from_config(&LoggingConfig::default())
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        // Sorted so the resulting filter does not depend on map order
        let mut filters: Vec<_> = config.filters.iter().collect();
        filters.sort_by(|a, b| a.0.cmp(b.0));

        Self {
            level: config.level.to_tracing_level(),
            directives: filters
                .into_iter()
                .map(|(target, level)| format!("{target}={}", level.as_str()))
                .collect(),
            span_events: config.span_events.clone(),
            format: config.format,
            output: config.output,
            thread_ids: config.thread_ids,
            file_location: config.file_location,
            file_path: config.file_path.clone(),
        }
    }

    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }

    /// Adds an `EnvFilter` directive, e.g. `"warden_runtime=warn"`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Logs every listener's skip or finish decision, with the open and
    /// close of each `dispatch` and `listener` span.
    pub fn trace_listeners(mut self) -> Self {
        self.directives.push(format!("{LISTENER_TARGET}=trace"));
        self.span_events.new = true;
        self.span_events.close = true;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput, file_path: Option<PathBuf>) -> Self {
        self.output = output;
        self.file_path = file_path;
        self
    }

    /// Returns the directives in the order they will be applied.
    pub fn directives(&self) -> &[String] {
        &self.directives
    }

    fn build_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str().to_lowercase()));

        for directive in &self.directives {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(e) => eprintln!("Ignoring invalid log directive '{directive}': {e}"),
            }
        }
        filter
    }

    /// Returns the writer and, if the configured output was unusable, why.
    fn writer(&self) -> (BoxMakeWriter, Option<&'static str>) {
        match (&self.output, &self.file_path) {
            (LogOutput::Stdout, _) => (BoxMakeWriter::new(std::io::stdout), None),
            (LogOutput::Stderr, _) => (BoxMakeWriter::new(std::io::stderr), None),
            (LogOutput::File, Some(path)) => {
                let appender = tracing_appender::rolling::never(
                    path.parent().unwrap_or_else(|| Path::new(".")),
                    path.file_name().unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE)),
                );
                (BoxMakeWriter::new(appender), None)
            }
            (LogOutput::File, None) => (
                BoxMakeWriter::new(std::io::stdout),
                Some("File output requested without a path, logging to stdout"),
            ),
        }
    }

    fn fmt_layer(&self, writer: BoxMakeWriter) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_span_events(fmt_span(&self.span_events))
            .with_thread_ids(self.thread_ids)
            .with_file(self.file_location)
            .with_line_number(self.file_location);

        match self.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Full => layer.boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            #[cfg(not(feature = "json-log"))]
            LogFormat::Json => layer.compact().boxed(),
        }
    }

    /// Installs the subscriber, ignoring one that is already installed.
    pub fn init(self) {
        let _ = self.try_init();
    }

    pub fn try_init(self) -> Result<(), TryInitError> {
        let (writer, fallback) = self.writer();
        let result = tracing_subscriber::registry()
            .with(self.fmt_layer(writer))
            .with(self.build_filter())
            .try_init();

        if let Some(reason) = fallback {
            warn!("{reason}");
        }
        if cfg!(not(feature = "json-log")) && self.format == LogFormat::Json {
            warn!("JSON log format requires the `json-log` feature, using compact");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_span_events() {
        let lifecycle = SpanEventConfig {
            new: true,
            close: true,
            ..Default::default()
        };
        assert_eq!(fmt_span(&lifecycle), FmtSpan::NEW | FmtSpan::CLOSE);
        assert_eq!(fmt_span(&SpanEventConfig::default()), FmtSpan::NONE);
    }

    #[test]
    fn test_builder_from_config() {
        let mut config = LoggingConfig {
            level: LogLevel::Debug,
            thread_ids: true,
            ..Default::default()
        };
        config.filters.insert("warden_runtime".into(), LogLevel::Warn);
        config.filters.insert("warden_framework".into(), LogLevel::Trace);

        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, tracing::Level::DEBUG);
        assert!(builder.thread_ids);
        assert_eq!(
            builder.directives(),
            ["warden_framework=trace", "warden_runtime=warn"]
        );
    }

    #[test]
    fn test_trace_listeners() {
        let builder = LoggingBuilder::new()
            .directive("warden_runtime=warn")
            .trace_listeners();
        assert_eq!(
            builder.directives(),
            ["warden_runtime=warn", "warden_framework::manager=trace"]
        );
        assert_eq!(fmt_span(&builder.span_events), FmtSpan::NEW | FmtSpan::CLOSE);
    }

    #[test]
    fn test_file_output_without_path_falls_back() {
        let builder = LoggingBuilder::new().output(LogOutput::File, None);
        assert!(builder.writer().1.is_some());

        let builder = LoggingBuilder::new().output(LogOutput::Stderr, None);
        assert!(builder.writer().1.is_none());
    }
}
