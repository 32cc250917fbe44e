//! Backend error and the reconciliation error taxonomy

use thiserror::Error;

use crate::step::ConfigurationStep;

/// Error reported by a backend call, independent of any SDK
///
/// `code` carries the service's machine-readable error code when one was
/// returned (e.g. `AccessDenied`); transport failures have none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub code: Option<String>,
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Whether this error carries the given service error code
    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for BackendError {}

/// Why a reconciliation did not complete
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// Existence of the resource could not be determined
    #[error("Could not determine whether {resource} exists: {cause}")]
    Probe {
        resource: String,
        #[source]
        cause: BackendError,
    },

    /// The create call was rejected, including a lost creation race
    #[error("Failed to create {resource}: {cause}")]
    Creation {
        resource: String,
        #[source]
        cause: BackendError,
    },

    /// A post-creation configuration step failed
    #[error("Failed to apply {step} to {resource}: {cause}")]
    Configuration {
        resource: String,
        step: ConfigurationStep,
        #[source]
        cause: BackendError,
    },
}

impl ReconcileError {
    /// The underlying backend error
    pub fn cause(&self) -> &BackendError {
        match self {
            Self::Probe { cause, .. }
            | Self::Creation { cause, .. }
            | Self::Configuration { cause, .. } => cause,
        }
    }

    /// Name of the resource that failed
    pub fn resource(&self) -> &str {
        match self {
            Self::Probe { resource, .. }
            | Self::Creation { resource, .. }
            | Self::Configuration { resource, .. } => resource,
        }
    }
}

/// Every resource that a bootstrap left unusable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Bootstrap failed:\n{}", render_errors(.errors))]
pub struct BootstrapError {
    pub errors: Vec<ReconcileError>,
}

fn render_errors(errors: &[ReconcileError]) -> String {
    errors
        .iter()
        .map(|e| format!("  {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
