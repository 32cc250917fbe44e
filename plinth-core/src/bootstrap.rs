//! Concurrent reconciliation of the whole state backend

use log::info;

use crate::error::{BootstrapError, ReconcileError};
use crate::outcome::ReconcileResult;
use crate::reconcile::Backends;
use crate::resource::ResourceSpec;

/// The two resources that make up a state backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPlan {
    pub object_store: ResourceSpec,
    pub lock_table: ResourceSpec,
}

/// Outcome for one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReport {
    pub spec: ResourceSpec,
    pub result: ReconcileResult,
}

/// Outcome of a bootstrap, available only once every reconciler finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub resources: Vec<ResourceReport>,
}

impl BootstrapReport {
    /// Whether the infrastructure tool may use the backend
    pub fn is_ready(&self) -> bool {
        self.resources.iter().all(|r| r.result.is_ready())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ResourceReport> {
        self.resources.iter().filter(|r| r.result.is_failed())
    }

    pub fn errors(&self) -> Vec<ReconcileError> {
        self.failures()
            .filter_map(|r| r.result.clone().into_error(&r.spec.name))
            .collect()
    }

    /// Fail with every resource's error unless the backend is usable
    pub fn ensure_ready(&self) -> Result<(), BootstrapError> {
        let errors = self.errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(BootstrapError { errors })
        }
    }

    pub fn result_for(&self, name: &str) -> Option<&ReconcileResult> {
        self.resources
            .iter()
            .find(|r| r.spec.name == name)
            .map(|r| &r.result)
    }
}

/// Reconcile the bucket and the lock table concurrently and wait for both
///
/// The two reconcilers share nothing, so a failure of one never changes the
/// outcome of the other.
pub async fn bootstrap(backends: &Backends, plan: &BootstrapPlan) -> BootstrapReport {
    info!(
        "Reconciling {} {} and {} {}",
        plan.object_store.kind_label(),
        plan.object_store.name,
        plan.lock_table.kind_label(),
        plan.lock_table.name
    );

    let (object_store, lock_table) = tokio::join!(
        backends.reconcile(&plan.object_store),
        backends.reconcile(&plan.lock_table),
    );

    BootstrapReport {
        resources: vec![
            ResourceReport {
                spec: plan.object_store.clone(),
                result: object_store,
            },
            ResourceReport {
                spec: plan.lock_table.clone(),
                result: lock_table,
            },
        ],
    }
}
