//! Reconciliation - probe, create if missing, then configure
//!
//! Both managed resources follow the same shape, so the control flow lives in
//! [`reconcile`] and each resource kind only supplies its operations through
//! the [`Reconciler`] trait.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::backend::{BackendResult, LockStoreBackend, ObjectStoreBackend};
use crate::error::BackendError;
use crate::outcome::{ExistenceProbeResult, ReconcileResult, Stage};
use crate::policy::PolicyDocument;
use crate::resource::{LockTableParams, ObjectStoreParams, ResourceKind, ResourceSpec};
use crate::step::{ConfigurationStep, PublicAccessBlock};

/// Resource-specific operations plugged into [`reconcile`]
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Name of the managed resource
    fn name(&self) -> &str;

    /// Kind label used in logs
    fn kind(&self) -> &'static str;

    async fn probe(&self) -> ExistenceProbeResult;

    async fn create(&self) -> BackendResult<()>;

    /// Steps applied after a fresh creation, in order
    fn steps(&self) -> &[ConfigurationStep] {
        &[]
    }

    async fn apply(&self, step: ConfigurationStep) -> BackendResult<()> {
        Err(BackendError::new(format!(
            "{} is not a configuration step of a {}",
            step,
            self.kind()
        )))
    }
}

/// Bring one resource to its desired state
///
/// An existing resource is left untouched. A missing one is created exactly
/// once and then configured step by step; the first failure stops the run
/// and earlier steps are not rolled back.
pub async fn reconcile<R: Reconciler + ?Sized>(reconciler: &R) -> ReconcileResult {
    let name = reconciler.name();
    let kind = reconciler.kind();

    match reconciler.probe().await {
        ExistenceProbeResult::Exists => {
            info!("{} {} already exists, skipping creation", kind, name);
            return ReconcileResult::AlreadyPresent;
        }
        ExistenceProbeResult::ProbeError(cause) => {
            warn!("Could not check whether {} {} exists: {}", kind, name, cause);
            return ReconcileResult::failed(Stage::Probe, cause);
        }
        ExistenceProbeResult::NotFound => {
            debug!("{} {} not found", kind, name);
        }
    }

    if let Err(cause) = reconciler.create().await {
        warn!("Failed to create {} {}: {}", kind, name, cause);
        return ReconcileResult::failed(Stage::Create, cause);
    }
    info!("{} {} created", kind, name);

    for step in reconciler.steps() {
        if let Err(cause) = reconciler.apply(*step).await {
            warn!("Failed to apply {} to {} {}: {}", step, kind, name, cause);
            return ReconcileResult::failed(Stage::Configure(*step), cause);
        }
        info!("{} applied to {} {}", step, kind, name);
    }

    ReconcileResult::CreatedAndConfigured
}

/// Reconciles the state bucket
pub struct ObjectStoreReconciler<'a> {
    backend: &'a dyn ObjectStoreBackend,
    bucket: &'a str,
    params: &'a ObjectStoreParams,
}

impl<'a> ObjectStoreReconciler<'a> {
    pub fn new(
        backend: &'a dyn ObjectStoreBackend,
        bucket: &'a str,
        params: &'a ObjectStoreParams,
    ) -> Self {
        Self {
            backend,
            bucket,
            params,
        }
    }
}

#[async_trait]
impl Reconciler for ObjectStoreReconciler<'_> {
    fn name(&self) -> &str {
        self.bucket
    }

    fn kind(&self) -> &'static str {
        "object store"
    }

    async fn probe(&self) -> ExistenceProbeResult {
        self.backend.probe(self.bucket).await
    }

    async fn create(&self) -> BackendResult<()> {
        self.backend.create(self.bucket, &self.params.region).await
    }

    fn steps(&self) -> &[ConfigurationStep] {
        &ConfigurationStep::OBJECT_STORE
    }

    async fn apply(&self, step: ConfigurationStep) -> BackendResult<()> {
        match step {
            ConfigurationStep::Versioning => self.backend.put_versioning(self.bucket).await,
            ConfigurationStep::Encryption => {
                self.backend
                    .put_encryption(self.bucket, self.params.encryption)
                    .await
            }
            ConfigurationStep::PublicAccessBlock => {
                self.backend
                    .put_public_access_block(self.bucket, &PublicAccessBlock::all_blocked())
                    .await
            }
            ConfigurationStep::AccessPolicy => {
                let policy = PolicyDocument::for_state_bucket(self.bucket, &self.params.principal);
                self.backend.put_policy(self.bucket, &policy).await
            }
        }
    }
}

/// Reconciles the lock table; creation is its only step
pub struct LockTableReconciler<'a> {
    backend: &'a dyn LockStoreBackend,
    table: &'a str,
    params: &'a LockTableParams,
}

impl<'a> LockTableReconciler<'a> {
    pub fn new(
        backend: &'a dyn LockStoreBackend,
        table: &'a str,
        params: &'a LockTableParams,
    ) -> Self {
        Self {
            backend,
            table,
            params,
        }
    }
}

#[async_trait]
impl Reconciler for LockTableReconciler<'_> {
    fn name(&self) -> &str {
        self.table
    }

    fn kind(&self) -> &'static str {
        "lock table"
    }

    async fn probe(&self) -> ExistenceProbeResult {
        self.backend.probe(self.table).await
    }

    async fn create(&self) -> BackendResult<()> {
        self.backend.create(self.table, self.params).await
    }
}

/// Client handles for the target environment, constructed once and shared
#[derive(Clone)]
pub struct Backends {
    object_stores: Arc<dyn ObjectStoreBackend>,
    lock_stores: Arc<dyn LockStoreBackend>,
}

impl Backends {
    pub fn new(
        object_stores: Arc<dyn ObjectStoreBackend>,
        lock_stores: Arc<dyn LockStoreBackend>,
    ) -> Self {
        Self {
            object_stores,
            lock_stores,
        }
    }

    /// Reconcile one resource with the backend matching its kind
    pub async fn reconcile(&self, spec: &ResourceSpec) -> ReconcileResult {
        match &spec.kind {
            ResourceKind::ObjectStore(params) => {
                let reconciler =
                    ObjectStoreReconciler::new(self.object_stores.as_ref(), &spec.name, params);
                reconcile(&reconciler).await
            }
            ResourceKind::LockTable(params) => {
                let reconciler =
                    LockTableReconciler::new(self.lock_stores.as_ref(), &spec.name, params);
                reconcile(&reconciler).await
            }
        }
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}
