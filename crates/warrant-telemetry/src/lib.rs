//! Warrant Telemetry - Logging and request correlation.
//!
//! This crate provides:
//! - [`LogConfig`] and [`setup_logging`], built on `tracing-subscriber` with
//!   rolling files from `tracing-appender`
//! - [`RequestContext`] for correlating the events of one host request
//!
//! # Example
//!
//! ```rust,no_run
//! use warrant_telemetry::{LogConfig, LogFormat, RequestContext, setup_logging};
//!
//! # fn main() -> Result<(), warrant_telemetry::TelemetryError> {
//! setup_logging(
//!     &LogConfig::new("info")
//!         .with_format(LogFormat::Json)
//!         .with_directive("warrant_authz=debug"),
//! )?;
//!
//! let ctx = RequestContext::new().with_operation("execute_proxy_action");
//! let _guard = ctx.span().entered();
//! tracing::info!("handling request");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::RequestContext;
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
