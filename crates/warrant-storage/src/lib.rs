//! Warrant Storage: namespaced key-value persistence.
//!
//! Every logical table of the control plane (`authorizations`, `audit_log`,
//! `rollbacks`, `consent_history`) is laid out as a set of namespaces in a
//! [`KvStore`]. Stores are always injected; nothing in the workspace holds a
//! process-wide storage singleton, so several service instances can share
//! (or not share) one backend freely.
//!
//! # Backends
//!
//! | Backend | Feature | Use |
//! |---------|---------|-----|
//! | [`MemoryKvStore`] | always | tests, ephemeral deployments |
//! | `SurrealKvStore` | `kv` | embedded, ACID, persistent |
//!
//! # Feature Flags
//!
//! - **`kv`**: `SurrealKV` persistent key-value store

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod kv;
mod scoped;

pub use error::{StorageError, StorageResult};
pub use kv::{KvStore, MemoryKvStore};
pub use scoped::ScopedKvStore;

#[cfg(feature = "kv")]
pub use kv::SurrealKvStore;
