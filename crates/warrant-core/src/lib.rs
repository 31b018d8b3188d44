//! Warrant Core - Foundation types and traits for the Warrant action-control core.
//!
//! This crate provides:
//! - Identifier newtypes and the [`Timestamp`] wrapper
//! - [`ActionClass`] / [`ActionType`] and the static [`RollbackStrategy`] table
//! - The injectable [`Clock`]
//! - Traits for host-injected capabilities ([`ActionExecutor`], [`UndoAction`])
//!
//! # Example
//!
//! ```
//! use warrant_core::{ActionClass, ActionType, RollbackStrategy};
//!
//! let class = ActionClass::parse("create_task");
//! assert_eq!(class.action_type(), ActionType::Task);
//! assert_eq!(class.rollback_strategy(), RollbackStrategy::DirectUndo);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod action;
pub mod capability;
pub mod clock;
pub mod types;

pub use action::{ActionClass, ActionType, RollbackStrategy};
pub use capability::{
    ActionExecutor, CapabilityError, CapabilityResult, RollbackData, UndoAction,
};
pub use clock::{Clock, SystemClock, start_of_local_day, start_of_local_week};
pub use types::{
    AuditEntryId, AuthorizationId, ConsentEntryId, Metadata, RollbackId, Timestamp, UserId,
    confidence_percent,
};
