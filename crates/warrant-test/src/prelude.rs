//! Prelude module - commonly used test helpers.
//!
//! Use `use warrant_test::prelude::*;` to import all essential helpers.

pub use crate::{EchoExecutor, FixedClock, RecordingUndo, UndoBehavior};
pub use crate::{init_test_tracing, memory_store, test_user_id};
