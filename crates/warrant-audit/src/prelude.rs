//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warrant_audit::prelude::*;` to import all essential types.

// Errors
pub use crate::{AuditError, AuditResult};

// Entry types
pub use crate::{ActionMode, ActionRecord, AuditEntry};

// Service
pub use crate::{AuditQuery, AuditService, AuditSettings, AuditStats};

// Storage
pub use crate::{AuditStorage, KvAuditStorage};
