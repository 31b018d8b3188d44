//! Per-action-class undo handlers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use warrant_core::{ActionClass, UndoAction};

/// Maps action classes onto the host-injected [`UndoAction`] that reverses them.
///
/// Only classes whose strategy is not `not_supported` need a handler.
///
/// # Example
///
/// ```rust,ignore
/// let registry = UndoRegistry::new()
///     .with(ActionClass::CreateTask, Arc::new(tasks_client))
///     .with(ActionClass::CreateCalendarEvent, Arc::new(calendar_client));
/// ```
#[derive(Clone, Default)]
pub struct UndoRegistry {
    handlers: HashMap<ActionClass, Arc<dyn UndoAction>>,
}

impl UndoRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `action_class`, replacing any previous one.
    pub fn register(&mut self, action_class: ActionClass, handler: Arc<dyn UndoAction>) {
        self.handlers.insert(action_class, handler);
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, action_class: ActionClass, handler: Arc<dyn UndoAction>) -> Self {
        self.register(action_class, handler);
        self
    }

    /// The handler for `action_class`.
    #[must_use]
    pub fn get(&self, action_class: &ActionClass) -> Option<Arc<dyn UndoAction>> {
        self.handlers.get(action_class).map(Arc::clone)
    }

    /// Whether a handler is registered for `action_class`.
    #[must_use]
    pub fn contains(&self, action_class: &ActionClass) -> bool {
        self.handlers.contains_key(action_class)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for UndoRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<&str> = self.handlers.keys().map(ActionClass::as_str).collect();
        classes.sort_unstable();
        f.debug_struct("UndoRegistry")
            .field("classes", &classes)
            .finish()
    }
}
