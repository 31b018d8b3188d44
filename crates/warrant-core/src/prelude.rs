//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warrant_core::prelude::*;` to import all essential types.

// Identifiers and time
pub use crate::{
    AuditEntryId, AuthorizationId, ConsentEntryId, Metadata, RollbackId, Timestamp, UserId,
};

// Actions
pub use crate::{ActionClass, ActionType, RollbackStrategy};

// Time source
pub use crate::{Clock, SystemClock};

// Capabilities
pub use crate::{ActionExecutor, CapabilityError, CapabilityResult, RollbackData, UndoAction};
