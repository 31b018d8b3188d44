//! Bridge from `warrant_config::Config` to service settings.
//!
//! The config crate has no dependencies on other internal crates. This
//! module translates its sections into the settings types of the audit,
//! authorization and rollback services and the telemetry `LogConfig`.
//! Unknown strings fall back to the defaults; [`Config::validate`] rejects
//! them before they get here.

use chrono::Weekday;
use warrant_audit::AuditSettings;
use warrant_authz::{AuthzSettings, HoursWindowMode};
use warrant_config::Config;
use warrant_rollback::RollbackSettings;
use warrant_telemetry::{FileRotation, LogConfig, LogFormat, LogTarget};

/// Convert the `[authorization]` section to [`AuthzSettings`].
#[must_use]
pub fn to_authz_settings(cfg: &Config) -> AuthzSettings {
    let hours_window = match cfg.authorization.hours_window.as_str() {
        "wrap_midnight" => HoursWindowMode::WrapMidnight,
        _ => HoursWindowMode::NonWrapping,
    };

    let week_starts_on = match cfg.authorization.week_starts_on.as_str() {
        "monday" => Weekday::Mon,
        _ => Weekday::Sun,
    };

    AuthzSettings {
        hours_window,
        week_starts_on,
    }
}

/// Convert the `[audit]` section to [`AuditSettings`].
#[must_use]
pub fn to_audit_settings(cfg: &Config) -> AuditSettings {
    AuditSettings {
        default_page_size: cfg.audit.default_page_size,
        max_page_size: cfg.audit.max_page_size,
        recent_failures_limit: cfg.audit.recent_failures_limit,
    }
}

/// Convert the `[rollback]` section to [`RollbackSettings`].
#[must_use]
pub fn to_rollback_settings(cfg: &Config) -> RollbackSettings {
    let hours = i64::try_from(cfg.rollback.window_hours).unwrap_or(i64::MAX);
    RollbackSettings {
        window: chrono::Duration::try_hours(hours).unwrap_or(chrono::Duration::MAX),
        undo_timeout: std::time::Duration::from_secs(cfg.rollback.undo_timeout_secs),
    }
}

/// Convert the `[logging]` section to [`LogConfig`].
#[must_use]
pub fn to_log_config(cfg: &Config) -> LogConfig {
    let format = match cfg.logging.format.as_str() {
        "pretty" => LogFormat::Pretty,
        "json" => LogFormat::Json,
        "full" => LogFormat::Full,
        _ => LogFormat::Compact,
    };

    let rotation = match cfg.logging.rotation.as_str() {
        "hourly" => FileRotation::Hourly,
        "never" => FileRotation::Never,
        _ => FileRotation::Daily,
    };

    let mut log_config = LogConfig::new(&cfg.logging.level).with_format(format);
    log_config = match (cfg.logging.target.as_str(), &cfg.logging.directory) {
        ("file", Some(directory)) => log_config.with_file_logging(directory, rotation),
        ("stdout", _) => log_config.with_target(LogTarget::Stdout),
        _ => log_config.with_target(LogTarget::Stderr),
    };

    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }

    log_config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_defaults() {
        let cfg = Config::default();
        assert_eq!(to_authz_settings(&cfg), AuthzSettings::default());
        assert_eq!(to_audit_settings(&cfg), AuditSettings::default());
        assert_eq!(to_rollback_settings(&cfg), RollbackSettings::default());
    }

    #[test]
    fn authz_settings_follow_config() {
        let mut cfg = Config::default();
        cfg.authorization.hours_window = "wrap_midnight".to_owned();
        cfg.authorization.week_starts_on = "monday".to_owned();

        let settings = to_authz_settings(&cfg);
        assert_eq!(settings.hours_window, HoursWindowMode::WrapMidnight);
        assert_eq!(settings.week_starts_on, Weekday::Mon);
    }

    #[test]
    fn rollback_settings_follow_config() {
        let mut cfg = Config::default();
        cfg.rollback.window_hours = 2;
        cfg.rollback.undo_timeout_secs = 5;

        let settings = to_rollback_settings(&cfg);
        assert_eq!(settings.window, chrono::Duration::hours(2));
        assert_eq!(settings.undo_timeout, std::time::Duration::from_secs(5));
    }

    #[test]
    fn log_config_carries_format_and_directives() {
        let mut cfg = Config::default();
        cfg.logging.level = "debug".to_owned();
        cfg.logging.format = "json".to_owned();
        cfg.logging.directives = vec!["warrant_authz=trace".to_owned()];

        let log = to_log_config(&cfg);
        assert_eq!(log.level, "debug");
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.directives, vec!["warrant_authz=trace".to_owned()]);
    }

    #[test]
    fn log_format_defaults_to_compact() {
        let cfg = Config::default();
        assert_eq!(to_log_config(&cfg).format, LogFormat::Compact);
    }

    #[test]
    fn file_target_uses_directory_and_rotation() {
        let mut cfg = Config::default();
        cfg.logging.target = "file".to_owned();
        cfg.logging.directory = Some("/var/log/warrant".into());
        cfg.logging.rotation = "hourly".to_owned();

        let log = to_log_config(&cfg);
        assert_eq!(log.target, LogTarget::File("/var/log/warrant".into()));
        assert_eq!(log.file.rotation, FileRotation::Hourly);
        assert!(!log.ansi);
    }

    #[test]
    fn target_defaults_to_stderr() {
        assert_eq!(to_log_config(&Config::default()).target, LogTarget::Stderr);
    }
}
