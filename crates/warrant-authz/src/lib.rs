//! Warrant Authz - Authorization grants, policy evaluation and consent.
//!
//! This crate provides:
//! - [`Authorization`] grants with optional [`Conditions`]
//! - [`AuthorizationStore`] and its key-value implementation
//! - [`AuthorizationService`]: grant, check and revoke
//! - [`ConsentService`]: the append-only consent ledger and dashboard
//!
//! # Decision model
//!
//! Conditions are ANDed within one grant and grants are ORed: the action is
//! allowed as soon as any active grant for the (user, action class) pair has
//! all of its conditions satisfied. Everything else is a denial carrying a
//! human-readable reason; checks never return an error.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use warrant_audit::{AuditService, AuditSettings, KvAuditStorage};
//! use warrant_authz::{
//!     ActionCounter, AuthorizationService, AuthorizationStore, AuthzSettings, Conditions,
//!     ConsentService, GrantRequest, KvAuthorizationStore, KvConsentStorage,
//! };
//! use warrant_core::{ActionClass, Clock, Metadata, SystemClock, UserId};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let clock: Arc<dyn Clock> = Arc::new(SystemClock);
//! let store: Arc<dyn AuthorizationStore> = Arc::new(KvAuthorizationStore::in_memory());
//! let consent = Arc::new(ConsentService::new(
//!     Arc::new(KvConsentStorage::in_memory()),
//!     Arc::clone(&store),
//!     Arc::clone(&clock),
//! ));
//! let audit: Arc<dyn ActionCounter> = Arc::new(AuditService::new(
//!     Arc::new(KvAuditStorage::in_memory()),
//!     Arc::clone(&clock),
//!     AuditSettings::default(),
//! ));
//! let authz = AuthorizationService::new(store, consent, audit, clock, AuthzSettings::default());
//!
//! let user = UserId::new("u1");
//! authz
//!     .grant_authorization(
//!         GrantRequest::new(user.clone(), ActionClass::SendEmail)
//!             .with_conditions(Conditions::new().confidence_threshold(0.9)),
//!     )
//!     .await
//!     .unwrap();
//!
//! let decision = authz
//!     .check_authorization(&user, &ActionClass::SendEmail, Some(0.95), &Metadata::new())
//!     .await;
//! assert!(decision.authorized);
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod authorization;
mod conditions;
mod consent;
mod error;
mod service;
mod store;

pub use authorization::{AllowedHours, Authorization, Conditions, GrantMethod, GrantRequest, Scope};
pub use conditions::{ActionCounter, CALENDAR_KEY, HoursWindowMode, RECIPIENT_KEY};
pub use consent::{
    ChangeType, ConsentDashboard, ConsentHistoryEntry, ConsentService, ConsentStorage,
    DASHBOARD_HISTORY_LIMIT, KvConsentStorage, SYSTEM_ACTOR,
};
pub use error::{AuthzError, AuthzResult};
pub use service::{
    AuthorizationDecision, AuthorizationService, AuthzSettings, NO_AUTHORIZATION_REASON,
};
pub use store::{AuthorizationStore, KvAuthorizationStore};
