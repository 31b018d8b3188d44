//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warrant_kernel::prelude::*;` to import the façade, the proxy
//! flow types and the configuration.

// Façade
pub use crate::{Warrant, WarrantBuilder};

// Proxy flow
pub use crate::{ProxyOutcome, ProxyRequest};

// Errors
pub use crate::{KernelError, KernelResult};

// Configuration
pub use warrant_config::Config;
