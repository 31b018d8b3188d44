//! Mock capability implementations for testing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use warrant_core::{
    ActionClass, ActionExecutor, CapabilityError, CapabilityResult, RollbackData, UndoAction,
};

/// How a [`RecordingUndo`] responds to calls.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UndoBehavior {
    /// Report success.
    #[default]
    Succeed,
    /// Report failure with this message.
    Fail(String),
    /// Never complete (until cancelled or timed out by the caller).
    Hang,
    /// Complete successfully after sleeping.
    Delay(Duration),
}

/// Undo handler that records every call it receives.
///
/// Uses `std::sync::Mutex` internally so it can be configured without a
/// runtime.
#[derive(Debug, Clone, Default)]
pub struct RecordingUndo {
    behavior: Arc<Mutex<UndoBehavior>>,
    calls: Arc<Mutex<Vec<(ActionClass, RollbackData)>>>,
}

impl RecordingUndo {
    /// A handler that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler that fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new().with_behavior(UndoBehavior::Fail(message.into()))
    }

    /// A handler that never completes.
    #[must_use]
    pub fn hanging() -> Self {
        Self::new().with_behavior(UndoBehavior::Hang)
    }

    /// Set the behavior.
    #[must_use]
    pub fn with_behavior(self, behavior: UndoBehavior) -> Self {
        self.set_behavior(behavior);
        self
    }

    /// Change the behavior of this handler and every clone of it.
    pub fn set_behavior(&self, behavior: UndoBehavior) {
        if let Ok(mut guard) = self.behavior.lock() {
            *guard = behavior;
        }
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Every call received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(ActionClass, RollbackData)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn behavior(&self) -> UndoBehavior {
        self.behavior
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl UndoAction for RecordingUndo {
    async fn undo(&self, action_class: &ActionClass, data: &RollbackData) -> CapabilityResult<()> {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push((action_class.clone(), data.clone()));
        }
        match self.behavior() {
            UndoBehavior::Succeed => Ok(()),
            UndoBehavior::Fail(message) => Err(CapabilityError::Failed(message)),
            UndoBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            },
            UndoBehavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            },
        }
    }
}

/// Executor that answers every call with a fixed output, or the input itself.
#[derive(Debug, Clone, Default)]
pub struct EchoExecutor {
    output: Option<serde_json::Value>,
    failure: Option<String>,
    calls: Arc<Mutex<Vec<(ActionClass, serde_json::Value)>>>,
}

impl EchoExecutor {
    /// An executor that returns its input.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An executor that returns `output` for every call.
    #[must_use]
    pub fn returning(output: serde_json::Value) -> Self {
        Self {
            output: Some(output),
            ..Self::default()
        }
    }

    /// An executor whose every call fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Every call received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(ActionClass, serde_json::Value)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ActionExecutor for EchoExecutor {
    async fn perform(
        &self,
        action_class: &ActionClass,
        input: &serde_json::Value,
    ) -> CapabilityResult<serde_json::Value> {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push((action_class.clone(), input.clone()));
        }
        if let Some(message) = &self.failure {
            return Err(CapabilityError::Failed(message.clone()));
        }
        Ok(self.output.clone().unwrap_or_else(|| input.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warrant_core::RollbackStrategy;

    fn data() -> RollbackData {
        RollbackData {
            original_input: json!({}),
            original_output: json!({ "taskId": "t-1" }),
            strategy: RollbackStrategy::DirectUndo,
            resource_id: Some("t-1".to_string()),
            instructions: "Delete the created task".to_string(),
        }
    }

    #[tokio::test]
    async fn test_recording_undo_records_and_fails_on_request() {
        let undo = RecordingUndo::new();
        undo.undo(&ActionClass::CreateTask, &data()).await.unwrap();
        assert_eq!(undo.call_count(), 1);

        undo.set_behavior(UndoBehavior::Fail("gone".to_string()));
        let err = undo.undo(&ActionClass::CreateTask, &data()).await.unwrap_err();
        assert_eq!(err.to_string(), "gone");
        assert_eq!(undo.calls()[1].0, ActionClass::CreateTask);
    }

    #[tokio::test]
    async fn test_echo_executor() {
        let echo = EchoExecutor::new();
        let out = echo
            .perform(&ActionClass::SendEmail, &json!({ "to": "a@b.c" }))
            .await
            .unwrap();
        assert_eq!(out, json!({ "to": "a@b.c" }));

        let failing = EchoExecutor::failing("smtp down");
        assert!(failing.perform(&ActionClass::SendEmail, &json!({})).await.is_err());
        assert_eq!(failing.call_count(), 1);
    }
}
