//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A config file (or the merged tree) is not valid TOML for [`Config`](crate::Config).
    #[error("failed to parse config {path}: {source}")]
    ParseError {
        /// File path, or a `<...>` marker for in-memory sources.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// An environment override could not be applied.
    #[error("invalid environment override {var}: {message}")]
    EnvError {
        /// Variable name.
        var: String,
        /// What was wrong with the value.
        message: String,
    },

    /// A value is out of range or inconsistent.
    #[error("invalid value for {field}: {message}")]
    ValidationError {
        /// Dotted field path (`rollback.window_hours`).
        field: String,
        /// What was wrong.
        message: String,
    },

    /// The platform config directory could not be determined.
    #[error("could not determine the user config directory")]
    NoConfigDir,
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
