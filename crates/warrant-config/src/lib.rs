#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for Warrant.
//!
//! # Usage
//!
//! ```rust,no_run
//! use warrant_config::Config;
//!
//! // defaults → config file → WARRANT_* environment overrides → validation
//! let config = Config::load(None).unwrap();
//! println!("rollback window: {}h", config.rollback.window_hours);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment variables** (`WARRANT_*`)
//! 2. **Config file** (explicit path, `WARRANT_CONFIG`, or
//!    `{config_dir}/warrant/config.toml`)
//! 3. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! # Design
//!
//! This crate has **no dependencies on other internal warrant crates**.
//! Conversion into service settings happens in the kernel's config bridge.

/// Environment variable overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// TOML tree merging.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

// Re-export primary types at the crate root.
pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// See [`loader::load`] for the algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the config file is malformed or the final
    /// configuration fails validation.
    pub fn load(path: Option<&std::path::Path>) -> ConfigResult<Self> {
        loader::load(path)
    }

    /// Parse a TOML document layered over the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the document does not parse or fails
    /// validation.
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        loader::load_str(content)
    }

    /// Check the configuration against the validation rules.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::ValidationError`] found.
    pub fn validate(&self) -> ConfigResult<()> {
        validate::validate(self)
    }
}
