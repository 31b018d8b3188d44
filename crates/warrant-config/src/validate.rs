//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that cross-field invariants hold.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Accepted `authorization.hours_window` values.
pub const HOURS_WINDOW_MODES: &[&str] = &["non_wrapping", "wrap_midnight"];
/// Accepted `authorization.week_starts_on` values.
pub const WEEK_STARTS: &[&str] = &["sunday", "monday"];
/// Accepted `storage.backend` values.
pub const STORAGE_BACKENDS: &[&str] = &["memory", "surrealkv"];
/// Accepted `logging.target` values.
pub const LOG_TARGETS: &[&str] = &["stderr", "stdout", "file"];
/// Accepted `logging.rotation` values.
pub const LOG_ROTATIONS: &[&str] = &["daily", "hourly", "never"];

/// Upper bound on `rollback.window_hours` (one year).
const MAX_WINDOW_HOURS: u64 = 8_760;
/// Upper bound on `rollback.undo_timeout_secs` (one hour).
const MAX_UNDO_TIMEOUT_SECS: u64 = 3_600;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_authorization(config)?;
    validate_audit(config)?;
    validate_rollback(config)?;
    validate_storage(config)?;
    validate_logging(config)?;
    Ok(())
}

fn one_of(field: &str, value: &str, accepted: &[&str]) -> ConfigResult<()> {
    if accepted.contains(&value) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        field: field.to_owned(),
        message: format!(
            "unsupported value '{value}'; expected one of: {}",
            accepted.join(", ")
        ),
    })
}

fn validate_authorization(config: &Config) -> ConfigResult<()> {
    let a = &config.authorization;
    one_of("authorization.hours_window", &a.hours_window, HOURS_WINDOW_MODES)?;
    one_of("authorization.week_starts_on", &a.week_starts_on, WEEK_STARTS)
}

fn validate_audit(config: &Config) -> ConfigResult<()> {
    let a = &config.audit;

    if a.max_page_size == 0 {
        return Err(ConfigError::ValidationError {
            field: "audit.max_page_size".to_owned(),
            message: "must be at least 1".to_owned(),
        });
    }

    if a.default_page_size == 0 || a.default_page_size > a.max_page_size {
        return Err(ConfigError::ValidationError {
            field: "audit.default_page_size".to_owned(),
            message: format!(
                "{} is out of range; must be between 1 and max_page_size ({})",
                a.default_page_size, a.max_page_size
            ),
        });
    }

    if a.recent_failures_limit == 0 {
        return Err(ConfigError::ValidationError {
            field: "audit.recent_failures_limit".to_owned(),
            message: "must be at least 1".to_owned(),
        });
    }

    Ok(())
}

fn validate_rollback(config: &Config) -> ConfigResult<()> {
    let r = &config.rollback;

    if r.window_hours == 0 || r.window_hours > MAX_WINDOW_HOURS {
        return Err(ConfigError::ValidationError {
            field: "rollback.window_hours".to_owned(),
            message: format!(
                "{} is out of range; must be between 1 and {MAX_WINDOW_HOURS}",
                r.window_hours
            ),
        });
    }

    if r.undo_timeout_secs == 0 || r.undo_timeout_secs > MAX_UNDO_TIMEOUT_SECS {
        return Err(ConfigError::ValidationError {
            field: "rollback.undo_timeout_secs".to_owned(),
            message: format!(
                "{} is out of range; must be between 1 and {MAX_UNDO_TIMEOUT_SECS}",
                r.undo_timeout_secs
            ),
        });
    }

    Ok(())
}

fn validate_storage(config: &Config) -> ConfigResult<()> {
    let s = &config.storage;
    one_of("storage.backend", &s.backend, STORAGE_BACKENDS)?;

    if s.backend == "surrealkv" && s.path.as_ref().is_none_or(|p| p.as_os_str().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: "storage.path".to_owned(),
            message: "required when backend is 'surrealkv'".to_owned(),
        });
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        });
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        });
    }

    let l = &config.logging;
    one_of("logging.target", &l.target, LOG_TARGETS)?;
    one_of("logging.rotation", &l.rotation, LOG_ROTATIONS)?;
    if l.target == "file" && l.directory.as_ref().is_none_or(|d| d.as_os_str().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: "logging.directory".to_owned(),
            message: "required when target is 'file'".to_owned(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::ValidationError { field, .. } => field,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_hours_window() {
        let mut config = Config::default();
        config.authorization.hours_window = "sometimes".to_owned();
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "authorization.hours_window"
        );
    }

    #[test]
    fn test_invalid_week_start() {
        let mut config = Config::default();
        config.authorization.week_starts_on = "friday".to_owned();
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "authorization.week_starts_on"
        );
    }

    #[test]
    fn test_default_page_size_above_max() {
        let mut config = Config::default();
        config.audit.default_page_size = 600;
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "audit.default_page_size"
        );
    }

    #[test]
    fn test_zero_rollback_window() {
        let mut config = Config::default();
        config.rollback.window_hours = 0;
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "rollback.window_hours"
        );
    }

    #[test]
    fn test_zero_undo_timeout() {
        let mut config = Config::default();
        config.rollback.undo_timeout_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_surrealkv_requires_path() {
        let mut config = Config::default();
        config.storage.backend = "surrealkv".to_owned();
        assert_eq!(field_of(validate(&config).unwrap_err()), "storage.path");

        config.storage.path = Some("/var/lib/warrant".into());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_backend() {
        let mut config = Config::default();
        config.storage.backend = "postgres".to_owned();
        assert_eq!(field_of(validate(&config).unwrap_err()), "storage.backend");
    }

    #[test]
    fn test_invalid_log_level_and_format() {
        let mut config = Config::default();
        config.logging.level = "loud".to_owned();
        assert_eq!(field_of(validate(&config).unwrap_err()), "logging.level");

        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert_eq!(field_of(validate(&config).unwrap_err()), "logging.format");
    }

    #[test]
    fn test_file_log_target_requires_directory() {
        let mut config = Config::default();
        config.logging.target = "file".to_owned();
        assert_eq!(field_of(validate(&config).unwrap_err()), "logging.directory");

        config.logging.directory = Some("/var/log/warrant".into());
        assert!(validate(&config).is_ok());

        config.logging.rotation = "weekly".to_owned();
        assert_eq!(field_of(validate(&config).unwrap_err()), "logging.rotation");
    }
}
