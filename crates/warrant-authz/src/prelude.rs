//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warrant_authz::prelude::*;` to import all essential types.

// Errors
pub use crate::{AuthzError, AuthzResult};

// Grants
pub use crate::{Authorization, Conditions, GrantMethod, GrantRequest, Scope};

// Decisions
pub use crate::{AuthorizationDecision, AuthorizationService, AuthzSettings, HoursWindowMode};

// Consent
pub use crate::{ChangeType, ConsentDashboard, ConsentHistoryEntry, ConsentService};

// Storage
pub use crate::{AuthorizationStore, ConsentStorage, KvAuthorizationStore, KvConsentStorage};
