//! The [`Warrant`] façade and its builder.

use std::sync::Arc;

use tracing::info;
use warrant_audit::{AuditService, KvAuditStorage};
use warrant_authz::{
    ActionCounter, AuthorizationService, AuthorizationStore, ConsentService,
    KvAuthorizationStore, KvConsentStorage,
};
use warrant_config::{Config, StorageSection};
use warrant_core::{ActionClass, Clock, SystemClock, UndoAction};
use warrant_rollback::{KvRollbackStore, RollbackService, UndoRegistry};
use warrant_storage::{KvStore, MemoryKvStore};

use crate::config_bridge::{to_audit_settings, to_authz_settings, to_rollback_settings};
use crate::error::{KernelError, KernelResult};

/// The assembled control plane.
///
/// All services share one [`KvStore`] and one [`Clock`]. Several instances
/// may coexist in a process; nothing here is global.
pub struct Warrant {
    config: Config,
    clock: Arc<dyn Clock>,
    audit: Arc<AuditService>,
    consent: Arc<ConsentService>,
    authorizations: Arc<AuthorizationService>,
    rollbacks: Arc<RollbackService>,
}

impl Warrant {
    /// Start building an instance.
    #[must_use]
    pub fn builder() -> WarrantBuilder {
        WarrantBuilder::default()
    }

    /// Build an instance from configuration alone: the storage backend is
    /// opened from `[storage]`, time comes from the system clock, and no
    /// undo handlers are registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the backend
    /// cannot be opened.
    pub fn open(config: &Config) -> KernelResult<Self> {
        Self::builder().config(config.clone()).build()
    }

    /// The configuration this instance was built from.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared clock.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The audit ledger.
    #[must_use]
    pub fn audit(&self) -> &Arc<AuditService> {
        &self.audit
    }

    /// The consent ledger.
    #[must_use]
    pub fn consent(&self) -> &Arc<ConsentService> {
        &self.consent
    }

    /// Grants, checks and revocations.
    #[must_use]
    pub fn authorizations(&self) -> &Arc<AuthorizationService> {
        &self.authorizations
    }

    /// Rollback eligibility and execution.
    #[must_use]
    pub fn rollbacks(&self) -> &Arc<RollbackService> {
        &self.rollbacks
    }
}

impl std::fmt::Debug for Warrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Warrant")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Warrant`].
#[derive(Default)]
pub struct WarrantBuilder {
    config: Config,
    store: Option<Arc<dyn KvStore>>,
    clock: Option<Arc<dyn Clock>>,
    registry: UndoRegistry,
}

impl WarrantBuilder {
    /// Use this configuration (defaults otherwise).
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Use this store instead of opening one from `[storage]`.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use this clock instead of [`SystemClock`].
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the undo handler registry.
    #[must_use]
    pub fn undo_registry(mut self, registry: UndoRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register one undo handler.
    #[must_use]
    pub fn undo_handler(mut self, action_class: ActionClass, handler: Arc<dyn UndoAction>) -> Self {
        self.registry.register(action_class, handler);
        self
    }

    /// Validate the configuration and wire the services.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Config`] if the configuration is invalid, or
    /// [`KernelError::Storage`] if no store was given and the configured
    /// backend cannot be opened.
    pub fn build(self) -> KernelResult<Warrant> {
        self.config.validate()?;

        let store = match self.store {
            Some(store) => store,
            None => open_store(&self.config.storage)?,
        };
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let audit = Arc::new(AuditService::new(
            Arc::new(KvAuditStorage::new(Arc::clone(&store))),
            Arc::clone(&clock),
            to_audit_settings(&self.config),
        ));

        let grants: Arc<dyn AuthorizationStore> =
            Arc::new(KvAuthorizationStore::new(Arc::clone(&store)));
        let consent = Arc::new(ConsentService::new(
            Arc::new(KvConsentStorage::new(Arc::clone(&store))),
            Arc::clone(&grants),
            Arc::clone(&clock),
        ));

        let counter: Arc<dyn ActionCounter> = audit.clone();
        let authorizations = Arc::new(AuthorizationService::new(
            grants,
            Arc::clone(&consent),
            counter,
            Arc::clone(&clock),
            to_authz_settings(&self.config),
        ));

        let rollbacks = Arc::new(RollbackService::new(
            Arc::clone(&audit),
            Arc::new(KvRollbackStore::new(store)),
            self.registry,
            Arc::clone(&clock),
            to_rollback_settings(&self.config),
        ));

        info!(
            backend = %self.config.storage.backend,
            window_hours = self.config.rollback.window_hours,
            "Warrant initialized"
        );

        Ok(Warrant {
            config: self.config,
            clock,
            audit,
            consent,
            authorizations,
            rollbacks,
        })
    }
}

impl std::fmt::Debug for WarrantBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarrantBuilder")
            .field("config", &self.config)
            .field("has_store", &self.store.is_some())
            .field("has_clock", &self.clock.is_some())
            .field("undo_handlers", &self.registry.len())
            .finish()
    }
}

/// Open the backend named by `[storage]`.
///
/// # Errors
///
/// Returns an error if the backend is unknown, is `surrealkv` without a path
/// (or without the `kv` feature), or cannot be opened.
pub fn open_store(storage: &StorageSection) -> KernelResult<Arc<dyn KvStore>> {
    match storage.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryKvStore::new())),
        "surrealkv" => open_surrealkv(storage),
        other => Err(unsupported_backend(other)),
    }
}

#[cfg(feature = "kv")]
fn open_surrealkv(storage: &StorageSection) -> KernelResult<Arc<dyn KvStore>> {
    let Some(path) = storage.path.as_ref() else {
        return Err(KernelError::Config(
            warrant_config::ConfigError::ValidationError {
                field: "storage.path".to_owned(),
                message: "required when backend is 'surrealkv'".to_owned(),
            },
        ));
    };
    info!(path = %path.display(), "opening SurrealKV store");
    Ok(Arc::new(warrant_storage::SurrealKvStore::open(path)?))
}

#[cfg(not(feature = "kv"))]
fn open_surrealkv(_storage: &StorageSection) -> KernelResult<Arc<dyn KvStore>> {
    Err(unsupported_backend("surrealkv"))
}

fn unsupported_backend(name: &str) -> KernelError {
    KernelError::Config(warrant_config::ConfigError::ValidationError {
        field: "storage.backend".to_owned(),
        message: format!("backend '{name}' is not available in this build"),
    })
}
