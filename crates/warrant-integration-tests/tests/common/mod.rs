//! Shared test harness for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use warrant_audit::{ActionRecord, AuditEntry};
use warrant_authz::{Authorization, Conditions, GrantRequest};
use warrant_config::Config;
use warrant_core::{ActionClass, AuthorizationId, UserId};
use warrant_kernel::Warrant;
use warrant_test::{FixedClock, RecordingUndo, memory_store};

/// Classes with an undo path, all served by one recording handler.
pub fn undoable() -> Vec<ActionClass> {
    vec![
        ActionClass::CreateCalendarEvent,
        ActionClass::UpdateCalendarEvent,
        ActionClass::DeleteCalendarEvent,
        ActionClass::CreateGithubIssue,
        ActionClass::UpdateGithubIssue,
        ActionClass::CreateTask,
        ActionClass::UpdateTask,
    ]
}

/// A [`Warrant`] over an in-memory store with a hand-driven clock.
pub struct Harness {
    /// The assembled services.
    pub warrant: Warrant,
    /// The clock every service reads.
    pub clock: Arc<FixedClock>,
    /// Undo handler registered for every class in [`undoable`].
    pub undo: RecordingUndo,
}

impl Harness {
    /// Default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Explicit configuration.
    pub fn with_config(config: Config) -> Self {
        Self::with_clock(config, FixedClock::default())
    }

    /// Explicit configuration and starting clock.
    pub fn with_clock(config: Config, clock: FixedClock) -> Self {
        let clock = Arc::new(clock);
        let undo = RecordingUndo::new();

        let mut builder = Warrant::builder()
            .config(config)
            .store(memory_store())
            .clock(clock.clone());
        for class in undoable() {
            builder = builder.undo_handler(class, Arc::new(undo.clone()));
        }

        Self {
            warrant: builder.build().unwrap(),
            clock,
            undo,
        }
    }

    /// Grant `class` to `user` with `conditions`.
    pub async fn grant(
        &self,
        user: &UserId,
        class: ActionClass,
        conditions: Conditions,
    ) -> Authorization {
        self.warrant
            .authorizations()
            .grant_authorization(GrantRequest::new(user.clone(), class).with_conditions(conditions))
            .await
            .unwrap()
    }

    /// Whether `user` may perform `class` right now.
    pub async fn allowed(&self, user: &UserId, class: &ActionClass, confidence: Option<f64>) -> bool {
        self.warrant
            .authorizations()
            .check_authorization(user, class, confidence, &serde_json::Map::new())
            .await
            .authorized
    }

    /// Record a successful proxy action directly in the ledger.
    pub async fn log_success(
        &self,
        user: &UserId,
        class: ActionClass,
        output: serde_json::Value,
    ) -> AuditEntry {
        self.warrant
            .audit()
            .log_proxy_action(
                ActionRecord::new(user.clone(), class, "test action")
                    .with_authorization(AuthorizationId::new())
                    .succeeded(output),
            )
            .await
            .unwrap()
    }

    /// Record a failed proxy action directly in the ledger.
    pub async fn log_failure(&self, user: &UserId, class: ActionClass) -> AuditEntry {
        self.warrant
            .audit()
            .log_proxy_action(
                ActionRecord::new(user.clone(), class, "test action")
                    .with_authorization(AuthorizationId::new())
                    .failed("provider error"),
            )
            .await
            .unwrap()
    }
}

/// Alice, the default test user.
pub fn alice() -> UserId {
    UserId::new("alice")
}

/// Mallory, who holds no grants of Alice's.
pub fn mallory() -> UserId {
    UserId::new("mallory")
}
