//! `WARRANT_*` environment overrides.
//!
//! Overrides are applied after the config file, so they win over both the
//! file and the embedded defaults.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::set_path;

/// Prefix shared by every recognised variable.
pub const ENV_PREFIX: &str = "WARRANT_";

/// Names the config file to load when no path is passed explicitly.
pub const CONFIG_PATH_VAR: &str = "WARRANT_CONFIG";

#[derive(Debug, Clone, Copy)]
enum ValueKind {
    Str,
    Int,
    /// Comma-separated list of strings.
    List,
}

/// (variable, dotted config path, value kind).
const OVERRIDES: &[(&str, &str, ValueKind)] = &[
    ("WARRANT_AUTHORIZATION_HOURS_WINDOW", "authorization.hours_window", ValueKind::Str),
    ("WARRANT_AUTHORIZATION_WEEK_STARTS_ON", "authorization.week_starts_on", ValueKind::Str),
    ("WARRANT_AUDIT_DEFAULT_PAGE_SIZE", "audit.default_page_size", ValueKind::Int),
    ("WARRANT_AUDIT_MAX_PAGE_SIZE", "audit.max_page_size", ValueKind::Int),
    ("WARRANT_AUDIT_RECENT_FAILURES_LIMIT", "audit.recent_failures_limit", ValueKind::Int),
    ("WARRANT_ROLLBACK_WINDOW_HOURS", "rollback.window_hours", ValueKind::Int),
    ("WARRANT_ROLLBACK_UNDO_TIMEOUT_SECS", "rollback.undo_timeout_secs", ValueKind::Int),
    ("WARRANT_STORAGE_BACKEND", "storage.backend", ValueKind::Str),
    ("WARRANT_STORAGE_PATH", "storage.path", ValueKind::Str),
    ("WARRANT_LOG_LEVEL", "logging.level", ValueKind::Str),
    ("WARRANT_LOG_FORMAT", "logging.format", ValueKind::Str),
    ("WARRANT_LOG_DIRECTIVES", "logging.directives", ValueKind::List),
    ("WARRANT_LOG_TARGET", "logging.target", ValueKind::Str),
    ("WARRANT_LOG_DIRECTORY", "logging.directory", ValueKind::Str),
    ("WARRANT_LOG_ROTATION", "logging.rotation", ValueKind::Str),
];

/// Snapshot the `WARRANT_*` variables of the current process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .collect()
}

/// Apply every recognised override present in `env` to `merged`.
///
/// Returns the number of overrides applied. Empty values are ignored.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if an integer variable does not parse.
pub fn apply_env_overrides(
    merged: &mut toml::Value,
    env: &HashMap<String, String>,
) -> ConfigResult<usize> {
    let mut applied: usize = 0;
    for (var, path, kind) in OVERRIDES {
        let Some(raw) = env.get(*var).map(|v| v.trim()).filter(|v| !v.is_empty()) else {
            continue;
        };

        let value = match kind {
            ValueKind::Str => toml::Value::String(raw.to_owned()),
            ValueKind::Int => {
                let n: i64 = raw.parse().map_err(|_| ConfigError::EnvError {
                    var: (*var).to_owned(),
                    message: format!("expected an integer, got '{raw}'"),
                })?;
                toml::Value::Integer(n)
            },
            ValueKind::List => toml::Value::Array(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| toml::Value::String(s.to_owned()))
                    .collect(),
            ),
        };

        debug!(var, path, "applying environment override");
        set_path(merged, path, value);
        applied = applied.saturating_add(1);
    }
    Ok(applied)
}
