//! Plinth Core
//!
//! Reconciliation core for the remote backend of an infrastructure tool: the
//! bucket that holds serialized state and the table that holds state locks.
//!
//! # Overview
//!
//! - **ResourceSpec**: names a managed resource and carries its kind-specific parameters
//! - **ObjectStoreBackend / LockStoreBackend**: capability traits a target environment implements
//! - **Reconciler**: the shared "probe, create if missing, configure" algorithm
//! - **bootstrap**: runs both reconcilers concurrently and waits for both outcomes
//!
//! # Example
//!
//! ```ignore
//! use plinth_core::{BootstrapConfig, Backends, bootstrap};
//!
//! let plan = BootstrapConfig::from_file("plinth.json")?.plan()?;
//! let backends = Backends::new(object_stores, lock_stores);
//!
//! let report = bootstrap(&backends, &plan).await;
//! if !report.is_ready() {
//!     // do not touch the state backend
//! }
//! ```

pub mod backend;
pub mod backends;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod outcome;
pub mod policy;
pub mod reconcile;
pub mod resource;
pub mod step;

pub use backend::{BackendResult, LockStoreBackend, ObjectStoreBackend};
pub use bootstrap::{BootstrapPlan, BootstrapReport, ResourceReport, bootstrap};
pub use config::{BootstrapConfig, ConfigError, ValidationError};
pub use error::{BackendError, BootstrapError, ReconcileError};
pub use outcome::{ExistenceProbeResult, ReconcileResult, Stage};
pub use policy::PolicyDocument;
pub use reconcile::{Backends, LockTableReconciler, ObjectStoreReconciler, Reconciler, reconcile};
pub use resource::{
    AttributeType, BillingMode, KeyAttribute, LockTableParams, ObjectStoreParams, Principal,
    ResourceKind, ResourceSpec,
};
pub use step::{ConfigurationStep, EncryptionAlgorithm, PublicAccessBlock};
