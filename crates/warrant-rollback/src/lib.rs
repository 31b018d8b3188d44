//! Warrant Rollback - Eligibility and execution of compensating actions.
//!
//! This crate provides:
//! - [`RollbackService`]: `can_rollback`, `execute_rollback`, `verify_rollback`
//! - [`Rollback`] records with a `pending → in_progress → completed | failed`
//!   lifecycle
//! - [`UndoRegistry`], mapping action classes onto host-injected undo handlers
//! - [`RollbackStore`] with an atomic per-entry claim, so at most one
//!   non-failed rollback exists for any audit entry
//!
//! # Eligibility
//!
//! An audit entry can be rolled back when it exists, succeeded, its class has
//! a strategy other than `not_supported`, and the rollback window (24 hours
//! by default) has not passed.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod registry;
mod rollback;
mod service;
mod store;

pub use error::{RollbackError, RollbackResult};
pub use registry::UndoRegistry;
pub use rollback::{
    Rollback, RollbackEligibility, RollbackStatus, RollbackVerification, rollback_data_for,
};
pub use service::{ExecuteOptions, RollbackService, RollbackSettings};
pub use store::{KvRollbackStore, RollbackStore};
