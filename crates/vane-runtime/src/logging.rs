//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! # Configuration-Based Initialization
//!
//! ```rust,ignore
//! use vane_runtime::{config::load_config, logging};
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//! ```
//!
//! # Manual Initialization
//!
//! ```rust,ignore
//! use vane_runtime::logging::LoggingBuilder;
//!
//! LoggingBuilder::new()
//!     .directive("vane_agent=debug")
//!     .init();
//! ```
//!
//! `RUST_LOG` replaces the configured base level when set; per-module
//! directives are added on top of either.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{Subscriber, warn};
use tracing_appender::rolling;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::{LogFormat, LogOutput, LogRotation, LoggingConfig};

/// Directives applied before any configured ones, keeping the HTTP stack quiet.
const DEFAULT_DIRECTIVES: &[&str] = &["hyper=warn", "tower=warn"];

/// Initializes logging from a [`LoggingConfig`].
///
/// Does nothing if a global subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

/// Assembles the global subscriber: one fmt layer plus an [`EnvFilter`].
#[derive(Default)]
pub struct LoggingBuilder {
    directives: Vec<String>,
    level: Option<tracing::Level>,
    format: LogFormat,
    output: LogOutput,
    file_path: Option<PathBuf>,
    rotation: LogRotation,
    hide_target: bool,
    thread_ids: bool,
    source_location: bool,
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut filters: Vec<_> = config.filters.iter().collect();
        filters.sort_by(|a, b| a.0.cmp(b.0));

        Self {
            directives: filters
                .into_iter()
                .map(|(module, level)| format!("{module}={level}"))
                .collect(),
            level: Some(config.level.to_tracing_level()),
            format: config.format,
            output: config.output,
            file_path: config.file_path.clone(),
            rotation: config.rotation,
            hide_target: false,
            thread_ids: config.thread_ids,
            source_location: config.file_location,
        }
    }

    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Adds a filter directive such as `vane_api=trace`.
    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Writes to `path`, rotated per [`rotation`](Self::rotation).
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = LogOutput::File;
        self.file_path = Some(path.into());
        self
    }

    pub fn rotation(mut self, rotation: LogRotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn hide_target(mut self) -> Self {
        self.hide_target = true;
        self
    }

    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.thread_ids = enabled;
        self
    }

    pub fn with_source_location(mut self, enabled: bool) -> Self {
        self.source_location = enabled;
        self
    }

    /// `RUST_LOG` if set, else the base level; then the quiet defaults and
    /// every configured directive. Unparsable directives are skipped.
    fn build_filter(&self) -> EnvFilter {
        let base = self.level.unwrap_or(tracing::Level::INFO);
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(base.to_string().to_lowercase()));

        DEFAULT_DIRECTIVES
            .iter()
            .copied()
            .chain(self.directives.iter().map(String::as_str))
            .filter_map(|d| d.parse::<Directive>().ok())
            .fold(filter, EnvFilter::add_directive)
    }

    fn file_appender(&self, path: &Path) -> rolling::RollingFileAppender {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let name = path.file_name().unwrap_or_else(|| OsStr::new("vane.log"));
        match self.rotation {
            LogRotation::Never => rolling::never(dir, name),
            LogRotation::Hourly => rolling::hourly(dir, name),
            LogRotation::Daily => rolling::daily(dir, name),
        }
    }

    /// The configured writer, or `None` when file output has no path.
    fn writer(&self) -> Option<BoxMakeWriter> {
        Some(match self.output {
            LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
            LogOutput::File => BoxMakeWriter::new(self.file_appender(self.file_path.as_deref()?)),
        })
    }

    fn layer<S>(&self, writer: BoxMakeWriter) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(self.output != LogOutput::File)
            .with_target(!self.hide_target)
            .with_thread_ids(self.thread_ids)
            .with_file(self.source_location)
            .with_line_number(self.source_location);

        match self.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            #[cfg(not(feature = "json-log"))]
            LogFormat::Json => layer.boxed(),
            LogFormat::Full => layer.boxed(),
        }
    }

    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the global subscriber, failing if one is already set.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let (writer, missing_path) = match self.writer() {
            Some(writer) => (writer, false),
            None => (BoxMakeWriter::new(std::io::stdout), true),
        };

        tracing_subscriber::registry()
            .with(self.layer(writer))
            .with(self.build_filter())
            .try_init()?;

        if missing_path {
            warn!("File output requested but no file path configured, logging to stdout");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_from_config_collects_module_filters() {
        let config = LoggingConfig {
            level: LogLevel::Warn,
            filters: HashMap::from([
                ("vane_api".to_string(), LogLevel::Trace),
                ("vane_agent".to_string(), LogLevel::Debug),
            ]),
            ..Default::default()
        };
        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, Some(tracing::Level::WARN));
        assert_eq!(builder.directives, ["vane_agent=debug", "vane_api=trace"]);
    }

    #[test]
    fn test_build_filter_accepts_directives() {
        let filter = LoggingBuilder::new()
            .with_level(tracing::Level::DEBUG)
            .directive("vane_core=trace")
            .directive("not a directive ===")
            .build_filter();
        let rendered = filter.to_string();
        assert!(rendered.contains("vane_core=trace"), "{rendered}");
        assert!(rendered.contains("hyper=warn"), "{rendered}");
    }

    #[test]
    fn test_file_output_without_path_has_no_writer() {
        let builder = LoggingBuilder::new().output(LogOutput::File);
        assert!(builder.writer().is_none());

        let dir = tempfile::tempdir().unwrap();
        let builder = LoggingBuilder::new().file(dir.path().join("vane.log"));
        assert!(builder.writer().is_some());
    }
}
