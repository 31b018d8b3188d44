//! Layered configuration loading.
//!
//! Layers, lowest precedence first:
//!
//! 1. the embedded `defaults.toml`
//! 2. one config file: the explicit path, else `$WARRANT_CONFIG`, else
//!    `config.toml` in the platform config directory (skipped if absent)
//! 3. `WARRANT_*` environment overrides
//!
//! The merged tree is deserialized into [`Config`] and validated.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{CONFIG_PATH_VAR, apply_env_overrides, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::deep_merge;
use crate::types::Config;
use crate::validate;

const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Config files larger than this are refused unread.
const SIZE_LIMIT: u64 = 1_048_576;

/// Load configuration from defaults, a config file and the process
/// environment.
///
/// `path` names the config file. When `None`, `WARRANT_CONFIG` is consulted,
/// then `config.toml` in the platform config directory for `warrant`. A
/// missing file is not an error.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is malformed, an environment
/// override is invalid, or the final configuration fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<Config> {
    load_with_env(path, &collect_env_vars())
}

/// [`load`] with an explicit environment snapshot.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env(path: Option<&Path>, env: &HashMap<String, String>) -> ConfigResult<Config> {
    let mut merged = parse(DEFAULTS_TOML, "<embedded defaults>")?;

    let file = match path {
        Some(p) => Some(p.to_path_buf()),
        None => env
            .get(CONFIG_PATH_VAR)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .or_else(user_config_path),
    };

    if let Some(file) = file {
        match read_capped(&file)? {
            Some(content) => {
                let overlay = parse(&content, &file.display().to_string())?;
                deep_merge(&mut merged, &overlay);
                info!(path = %file.display(), "Loaded config file");
            },
            None => debug!(path = %file.display(), "No config file, using defaults"),
        }
    }

    let applied = apply_env_overrides(&mut merged, env)?;
    if applied > 0 {
        debug!(count = applied, "Applied environment overrides");
    }

    finish(merged, "<merged config>")
}

/// Load a config from a TOML string layered over the embedded defaults.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the string does not parse or the result
/// fails validation.
pub fn load_str(content: &str) -> ConfigResult<Config> {
    let mut merged = parse(DEFAULTS_TOML, "<embedded defaults>")?;
    deep_merge(&mut merged, &parse(content, "<string>")?);
    finish(merged, "<string>")
}

/// Load one file over the defaults, ignoring the environment.
///
/// Unlike [`load`], a missing file is an error here.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is missing, unreadable, too large,
/// malformed or invalid.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let Some(content) = read_capped(path)? else {
        return Err(ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
    };
    let mut merged = parse(DEFAULTS_TOML, "<embedded defaults>")?;
    deep_merge(&mut merged, &parse(&content, &path.display().to_string())?);
    finish(merged, &path.display().to_string())
}

/// `{config_dir}/config.toml` for the `warrant` project, if the platform
/// has a config directory.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "warrant")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Read `path`, `None` if it does not exist.
///
/// One read, no prior existence check; the size cap is applied to what was
/// read.
fn read_capped(path: &Path) -> ConfigResult<Option<String>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source,
            });
        },
    };

    let len = u64::try_from(content.len()).unwrap_or(u64::MAX);
    if len > SIZE_LIMIT {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!("config file is {len} bytes, over the {SIZE_LIMIT} byte limit"),
        });
    }
    Ok(Some(content))
}

fn parse(content: &str, origin: &str) -> ConfigResult<toml::Value> {
    toml::from_str(content).map_err(|source| ConfigError::ParseError {
        path: origin.to_owned(),
        source,
    })
}

fn finish(merged: toml::Value, origin: &str) -> ConfigResult<Config> {
    let config: Config = merged
        .try_into()
        .map_err(|source: toml::de::Error| ConfigError::ParseError {
            path: origin.to_owned(),
            source,
        })?;
    validate::validate(&config)?;
    Ok(config)
}
