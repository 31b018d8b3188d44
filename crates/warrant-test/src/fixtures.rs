//! Test fixtures for common types.

use std::sync::Arc;
use warrant_core::UserId;
use warrant_storage::{KvStore, MemoryKvStore};

/// A test user ID.
#[must_use]
pub fn test_user_id() -> UserId {
    UserId::new("user-test")
}

/// A fresh, empty in-memory key-value store.
#[must_use]
pub fn memory_store() -> Arc<dyn KvStore> {
    Arc::new(MemoryKvStore::new())
}

/// Route `tracing` output through the test harness writer.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
