//! The guarded proxy-action flow.
//!
//! check → execute → audit, in that order and at most once each:
//!
//! 1. [`AuthorizationService::check_authorization`](warrant_authz::AuthorizationService::check_authorization)
//! 2. on denial, return [`ProxyOutcome::Denied`]; nothing runs and nothing
//!    is written to the audit log
//! 3. otherwise run the injected [`ActionExecutor`]
//! 4. record the outcome, success or failure, with exactly one
//!    [`log_proxy_action`](warrant_audit::AuditService::log_proxy_action)

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{Instrument, info, warn};
use warrant_audit::{ActionRecord, AuditEntry};
use warrant_authz::NO_AUTHORIZATION_REASON;
use warrant_core::{ActionClass, ActionExecutor, Metadata, UserId};
use warrant_telemetry::RequestContext;

use crate::error::KernelResult;
use crate::warrant::Warrant;

/// An action the assistant wants to take on the user's behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyRequest {
    /// User the action is for.
    pub user_id: UserId,
    /// Class of the action.
    pub action_class: ActionClass,
    /// Human description, recorded in the audit log.
    pub action: String,
    /// Input passed to the executor.
    pub input: serde_json::Value,
    /// Assistant confidence in `[0, 1]`.
    pub confidence: Option<f64>,
    /// Context evaluated by grant conditions (`recipient`, `calendarId`).
    pub metadata: Metadata,
    /// Persona the assistant is acting as.
    pub persona: Option<String>,
    /// Model that proposed the action.
    pub model_used: Option<String>,
    /// Tokens spent deciding on the action.
    pub tokens_used: Option<u64>,
}

impl ProxyRequest {
    /// A request with no input, confidence or metadata.
    #[must_use]
    pub fn new(user_id: UserId, action_class: ActionClass, action: impl Into<String>) -> Self {
        Self {
            user_id,
            action_class,
            action: action.into(),
            input: serde_json::Value::Null,
            confidence: None,
            metadata: Metadata::new(),
            persona: None,
            model_used: None,
            tokens_used: None,
        }
    }

    /// Set the executor input.
    #[must_use]
    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = input;
        self
    }

    /// Set the confidence score.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Add one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Set the persona.
    #[must_use]
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    /// Set the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_used = Some(model.into());
        self
    }

    /// Set the token usage.
    #[must_use]
    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.tokens_used = Some(tokens);
        self
    }
}

/// What happened to a [`ProxyRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyOutcome {
    /// The check failed; the executor was not called.
    Denied {
        /// Denial reason from the authorization check.
        reason: String,
    },
    /// The executor ran; `entry` records whether it succeeded.
    Executed {
        /// The audit entry written for the attempt.
        entry: Box<AuditEntry>,
    },
}

impl ProxyOutcome {
    /// Whether the executor ran.
    #[must_use]
    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed { .. })
    }

    /// The audit entry, if the executor ran.
    #[must_use]
    pub fn entry(&self) -> Option<&AuditEntry> {
        match self {
            Self::Executed { entry } => Some(entry),
            Self::Denied { .. } => None,
        }
    }

    /// The denial reason, if the request was denied.
    #[must_use]
    pub fn denial_reason(&self) -> Option<&str> {
        match self {
            Self::Denied { reason } => Some(reason),
            Self::Executed { .. } => None,
        }
    }
}

impl Warrant {
    /// Run `request` through check → execute → audit.
    ///
    /// An executor failure is not an error: it is recorded as a failed
    /// attempt and returned as [`ProxyOutcome::Executed`].
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Audit`](crate::KernelError::Audit) if the
    /// executed action could not be recorded.
    pub async fn execute_proxy_action(
        &self,
        request: ProxyRequest,
        executor: &dyn ActionExecutor,
    ) -> KernelResult<ProxyOutcome> {
        let ctx = RequestContext::new()
            .with_user(request.user_id.clone())
            .with_action_class(request.action_class.clone())
            .with_operation("execute_proxy_action");
        let span = ctx.span();

        self.run_proxy_action(request, executor, &ctx)
            .instrument(span)
            .await
    }

    async fn run_proxy_action(
        &self,
        request: ProxyRequest,
        executor: &dyn ActionExecutor,
        ctx: &RequestContext,
    ) -> KernelResult<ProxyOutcome> {
        let decision = self
            .authorizations()
            .check_authorization(
                &request.user_id,
                &request.action_class,
                request.confidence,
                &request.metadata,
            )
            .await;

        let authorization_id = match decision.authorization_id {
            Some(id) if decision.authorized => id,
            _ => {
                let reason = decision
                    .reason
                    .unwrap_or_else(|| NO_AUTHORIZATION_REASON.to_owned());
                info!(reason = %reason, "Proxy action not executed");
                return Ok(ProxyOutcome::Denied { reason });
            },
        };

        let started = Instant::now();
        let result = executor
            .perform(&request.action_class, &request.input)
            .await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut record = ActionRecord::new(request.user_id, request.action_class, request.action)
            .with_authorization(authorization_id)
            .with_input(request.input)
            .with_latency_ms(latency_ms);
        if let Some(confidence) = request.confidence {
            record = record.with_confidence(confidence);
        }
        if let Some(persona) = request.persona {
            record = record.with_persona(persona);
        }
        if let Some(model) = request.model_used {
            record = record.with_model(model);
        }
        if let Some(tokens) = request.tokens_used {
            record = record.with_tokens(tokens);
        }

        let record = match result {
            Ok(output) => record.succeeded(output),
            Err(e) => {
                warn!(error = %e, "Proxy action failed");
                record.failed(e.to_string())
            },
        };

        let entry = self.audit().log_proxy_action(record).await?;
        info!(
            audit_entry_id = %entry.id,
            success = entry.success,
            elapsed_ms = ctx.elapsed_ms(),
            "Proxy action recorded"
        );
        Ok(ProxyOutcome::Executed {
            entry: Box::new(entry),
        })
    }
}
