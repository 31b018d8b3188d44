//! Warrant Audit - Append-only ledger of every attempted assistant action.
//!
//! This crate provides:
//! - [`AuditEntry`], one immutable row per attempted action
//! - [`ActionRecord`], the caller-side description of an attempt
//! - [`AuditService`] with ledger queries and aggregate statistics
//! - [`AuditStorage`] and its [`KvStore`](warrant_storage::KvStore) implementation
//!
//! Each entry carries a `_rollbackEligible` marker in its output, computed
//! when it is logged: the action succeeded and its class has a rollback
//! strategy other than `not_supported`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use warrant_audit::{ActionRecord, AuditService, AuditSettings, KvAuditStorage};
//! use warrant_core::{ActionClass, AuthorizationId, SystemClock, UserId};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let audit = AuditService::new(
//!     Arc::new(KvAuditStorage::in_memory()),
//!     Arc::new(SystemClock),
//!     AuditSettings::default(),
//! );
//!
//! let entry = audit
//!     .log_proxy_action(
//!         ActionRecord::new(UserId::new("u1"), ActionClass::CreateTask, "Create task")
//!             .with_authorization(AuthorizationId::new())
//!             .succeeded(serde_json::json!({ "taskId": "t-1" })),
//!     )
//!     .await
//!     .unwrap();
//! assert!(entry.rollback_eligible());
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod entry;
mod error;
mod service;
mod storage;

pub use entry::{ActionMode, ActionRecord, AuditEntry, ROLLBACK_ELIGIBLE_KEY, is_rollback_eligible};
pub use error::{AuditError, AuditResult};
pub use service::{AuditQuery, AuditService, AuditSettings, AuditStats};
pub use storage::{AuditStorage, KvAuditStorage};
