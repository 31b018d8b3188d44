#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::module_name_repetitions)]

//! Warrant Kernel - composition root of the action-control core.
//!
//! The kernel owns no policy. It opens one storage backend, builds the
//! audit, consent, authorization and rollback services over it, and runs the
//! guarded proxy flow: an action is executed only after a successful
//! authorization check and is recorded in the audit log exactly once.
//!
//! # Example
//!
//! ```rust,no_run
//! use warrant_config::Config;
//! use warrant_core::{ActionClass, UserId};
//! use warrant_authz::GrantRequest;
//! use warrant_kernel::{ProxyRequest, Warrant};
//!
//! # async fn run(executor: &dyn warrant_core::ActionExecutor) -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(None)?;
//! warrant_kernel::init_logging(&config)?;
//! let warrant = Warrant::open(&config)?;
//!
//! let user = UserId::new("user-1");
//! warrant
//!     .authorizations()
//!     .grant_authorization(GrantRequest::new(user.clone(), ActionClass::CreateTask))
//!     .await?;
//!
//! let outcome = warrant
//!     .execute_proxy_action(
//!         ProxyRequest::new(user, ActionClass::CreateTask, "Create task 'Buy milk'"),
//!         executor,
//!     )
//!     .await?;
//! assert!(outcome.is_executed());
//! # Ok(())
//! # }
//! ```

pub mod prelude;

pub mod config_bridge;
mod error;
mod proxy;
mod warrant;

pub use error::{KernelError, KernelResult};
pub use proxy::{ProxyOutcome, ProxyRequest};
pub use warrant::{Warrant, WarrantBuilder, open_store};

/// Install the global log subscriber described by `[logging]`.
///
/// # Errors
///
/// Returns [`KernelError::Telemetry`] if the filter is invalid or a
/// subscriber is already installed.
pub fn init_logging(config: &warrant_config::Config) -> KernelResult<()> {
    warrant_telemetry::setup_logging(&config_bridge::to_log_config(config))?;
    Ok(())
}
