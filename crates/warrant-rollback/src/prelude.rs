//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warrant_rollback::prelude::*;` to import all essential types.

// Errors
pub use crate::{RollbackError, RollbackResult};

// Records
pub use crate::{Rollback, RollbackEligibility, RollbackStatus, RollbackVerification};

// Service
pub use crate::{ExecuteOptions, RollbackService, RollbackSettings, UndoRegistry};

// Storage
pub use crate::{KvRollbackStore, RollbackStore};
