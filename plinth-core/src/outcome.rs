//! Probe and reconciliation outcomes

use crate::error::{BackendError, ReconcileError};
use crate::step::ConfigurationStep;

/// Outcome of checking whether a resource exists
///
/// Only `NotFound` authorizes creation. A probe that fails for any other
/// reason is a `ProbeError`, never an implicit absence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExistenceProbeResult {
    Exists,
    NotFound,
    ProbeError(BackendError),
}

impl ExistenceProbeResult {
    pub fn exists(&self) -> bool {
        matches!(self, Self::Exists)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// The step of a reconciliation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Probe,
    Create,
    Configure(ConfigurationStep),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Probe => "probe",
            Self::Create => "create",
            Self::Configure(step) => step.name(),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one full reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileResult {
    /// The resource already existed; nothing was created or configured
    AlreadyPresent,
    /// The resource was created and every configuration step succeeded
    CreatedAndConfigured,
    /// The reconciliation stopped at `stage`; earlier steps stay applied
    Failed { stage: Stage, cause: BackendError },
}

impl ReconcileResult {
    pub(crate) fn failed(stage: Stage, cause: BackendError) -> Self {
        Self::Failed { stage, cause }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Whether the resource can be used by the infrastructure tool
    pub fn is_ready(&self) -> bool {
        !self.is_failed()
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Failed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Convert a failure into the error taxonomy, attributing it to `resource`
    pub fn into_error(self, resource: &str) -> Option<ReconcileError> {
        let Self::Failed { stage, cause } = self else {
            return None;
        };
        let resource = resource.to_string();
        Some(match stage {
            Stage::Probe => ReconcileError::Probe { resource, cause },
            Stage::Create => ReconcileError::Creation { resource, cause },
            Stage::Configure(step) => ReconcileError::Configuration {
                resource,
                step,
                cause,
            },
        })
    }
}
