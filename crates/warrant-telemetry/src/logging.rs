//! Logging configuration and global subscriber installation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{TelemetryError, TelemetryResult};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRotation {
    /// Once a day.
    #[default]
    Daily,
    /// Once an hour.
    Hourly,
    /// Never; a single file grows forever.
    Never,
}

impl From<FileRotation> for Rotation {
    fn from(rotation: FileRotation) -> Self {
        match rotation {
            FileRotation::Daily => Rotation::DAILY,
            FileRotation::Hourly => Rotation::HOURLY,
            FileRotation::Never => Rotation::NEVER,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human-oriented.
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    /// Newline-delimited JSON.
    Json,
    /// The default `tracing-subscriber` format.
    Full,
}

/// Where log lines go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Standard output.
    Stdout,
    /// Standard error.
    #[default]
    Stderr,
    /// Rolling files in this directory.
    File(PathBuf),
}

/// Rolling file settings, used when the target is [`LogTarget::File`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLogConfig {
    /// File name prefix (`warrant` gives `warrant.2025-06-04.log`).
    pub prefix: String,
    /// Rollover cadence.
    pub rotation: FileRotation,
    /// Files to keep; 0 keeps everything.
    pub max_files: usize,
}

impl Default for FileLogConfig {
    fn default() -> Self {
        Self {
            prefix: "warrant".to_string(),
            rotation: FileRotation::default(),
            max_files: 0,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base filter (`info`, `warrant_authz=debug,info`, ...).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Output target.
    pub target: LogTarget,
    /// Rolling file settings.
    pub file: FileLogConfig,
    /// Include timestamps.
    pub timestamps: bool,
    /// Include source file and line.
    pub file_info: bool,
    /// Use ANSI colors (ignored for files).
    pub ansi: bool,
    /// Extra filter directives layered over `level`.
    pub directives: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            file: FileLogConfig::default(),
            timestamps: true,
            file_info: false,
            ansi: true,
            directives: Vec::new(),
        }
    }
}

impl LogConfig {
    /// A default config at `level`.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    /// Set the format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the target.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Write to rolling files in `directory`.
    #[must_use]
    pub fn with_file_logging(mut self, directory: impl Into<PathBuf>, rotation: FileRotation) -> Self {
        self.target = LogTarget::File(directory.into());
        self.file.rotation = rotation;
        self.ansi = false;
        self
    }

    /// Add a filter directive.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Omit timestamps.
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Disable colors.
    #[must_use]
    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    fn build_filter(&self) -> TelemetryResult<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.level)
            .map_err(|e| TelemetryError::ConfigError(e.to_string()))?;
        for directive in &self.directives {
            let directive = directive
                .parse()
                .map_err(|e: tracing_subscriber::filter::ParseError| {
                    TelemetryError::ConfigError(format!("invalid directive {directive:?}: {e}"))
                })?;
            filter = filter.add_directive(directive);
        }
        Ok(filter)
    }

    fn build_writer(&self) -> TelemetryResult<(BoxMakeWriter, bool)> {
        match &self.target {
            LogTarget::Stdout => Ok((BoxMakeWriter::new(std::io::stdout), self.ansi)),
            LogTarget::Stderr => Ok((BoxMakeWriter::new(std::io::stderr), self.ansi)),
            LogTarget::File(dir) => {
                std::fs::create_dir_all(dir)?;
                let mut builder = RollingFileAppender::builder()
                    .rotation(self.file.rotation.into())
                    .filename_prefix(&self.file.prefix)
                    .filename_suffix("log");
                if self.file.max_files > 0 {
                    builder = builder.max_log_files(self.file.max_files);
                }
                let appender = builder
                    .build(dir)
                    .map_err(|e| TelemetryError::InitError(e.to_string()))?;
                Ok((BoxMakeWriter::new(appender), false))
            },
        }
    }

    fn build_layer(&self) -> TelemetryResult<BoxedLayer> {
        let (writer, ansi) = self.build_writer()?;
        let base = fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_file(self.file_info)
            .with_line_number(self.file_info);

        let layer = match (self.format, self.timestamps) {
            (LogFormat::Json, true) => base.json().boxed(),
            (LogFormat::Json, false) => base.json().without_time().boxed(),
            (LogFormat::Pretty, true) => base.pretty().boxed(),
            (LogFormat::Pretty, false) => base.pretty().without_time().boxed(),
            (LogFormat::Compact, true) => base.compact().boxed(),
            (LogFormat::Compact, false) => base.compact().without_time().boxed(),
            (LogFormat::Full, true) => base.boxed(),
            (LogFormat::Full, false) => base.without_time().boxed(),
        };
        Ok(layer)
    }
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Returns an error if the filter is invalid, the log directory cannot be
/// created, or a global subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.build_filter()?;
    let layer = config.build_layer()?;
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::InitError(e.to_string()))
}

/// Install the default subscriber (`info`, stderr, pretty).
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::default())
}
