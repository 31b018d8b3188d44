//! Warrant Test - Shared test utilities for the Warrant crates.
//!
//! This crate provides a controllable clock, mock capabilities and fixtures
//! that can be used across the workspace as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! warrant-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use warrant_test::{FixedClock, RecordingUndo};
//!
//! #[tokio::test]
//! async fn test_undo_runs_once() {
//!     let clock = Arc::new(FixedClock::default());
//!     let undo = RecordingUndo::new();
//!     // ... wire into a RollbackService and roll back an entry
//!     assert_eq!(undo.call_count(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod clock;
pub mod fixtures;
pub mod mocks;

pub use clock::FixedClock;
pub use fixtures::*;
pub use mocks::{EchoExecutor, RecordingUndo, UndoBehavior};
