//! Configuration struct definitions.
//!
//! Every section is `#[serde(default)]`, so a file only needs the keys it
//! changes. Enumerated settings are plain strings checked by
//! [`validate`](crate::validate::validate); the services parse them into
//! their own types at startup.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Condition evaluation knobs.
    pub authorization: AuthorizationSection,
    /// Audit log paging.
    pub audit: AuditSection,
    /// Rollback window and undo timeout.
    pub rollback: RollbackSection,
    /// Storage backend selection.
    pub storage: StorageSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// AuthorizationSection
// ---------------------------------------------------------------------------

/// Authorization condition evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationSection {
    /// Allowed-hours window semantics: `"non_wrapping"` or `"wrap_midnight"`.
    pub hours_window: String,
    /// First day of the week for weekly limits: `"sunday"` or `"monday"`.
    pub week_starts_on: String,
}

impl Default for AuthorizationSection {
    fn default() -> Self {
        Self {
            hours_window: "non_wrapping".to_owned(),
            week_starts_on: "sunday".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// AuditSection
// ---------------------------------------------------------------------------

/// Audit log query limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    /// Page size when a query gives none.
    pub default_page_size: usize,
    /// Upper bound on any requested page size.
    pub max_page_size: usize,
    /// Entries returned by `get_recent_failures` when no limit is given.
    pub recent_failures_limit: usize,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 500,
            recent_failures_limit: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// RollbackSection
// ---------------------------------------------------------------------------

/// Rollback eligibility and execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollbackSection {
    /// Hours after an action during which it may be undone.
    pub window_hours: u64,
    /// Seconds an undo handler may run before the rollback fails.
    pub undo_timeout_secs: u64,
}

impl Default for RollbackSection {
    fn default() -> Self {
        Self {
            window_hours: 24,
            undo_timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// StorageSection
// ---------------------------------------------------------------------------

/// Storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// `"memory"` or `"surrealkv"`.
    pub backend: String,
    /// Data directory for `surrealkv`.
    pub path: Option<PathBuf>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: "memory".to_owned(),
            path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["warrant_authz=debug"]`).
    pub directives: Vec<String>,
    /// `"stderr"`, `"stdout"` or `"file"`.
    pub target: String,
    /// Log directory; required when `target = "file"`.
    pub directory: Option<PathBuf>,
    /// File rollover: `"daily"`, `"hourly"` or `"never"`.
    pub rotation: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            target: "stderr".to_owned(),
            directory: None,
            rotation: "daily".to_owned(),
        }
    }
}
