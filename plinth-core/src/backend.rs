//! Capability traits of the target environment
//!
//! Any conforming backend (real cloud service, emulator, in-memory fake)
//! implements these. Backend-specific error codes are translated into
//! [`ExistenceProbeResult`] and [`BackendError`] by the implementation, so
//! the reconcilers never inspect raw error strings.

use async_trait::async_trait;

use crate::error::BackendError;
use crate::outcome::ExistenceProbeResult;
use crate::policy::PolicyDocument;
use crate::resource::LockTableParams;
use crate::step::{EncryptionAlgorithm, PublicAccessBlock};

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Object storage service holding the state bucket
#[async_trait]
pub trait ObjectStoreBackend: Send + Sync {
    /// Metadata-only existence check. Must not mutate anything.
    async fn probe(&self, bucket: &str) -> ExistenceProbeResult;

    /// Create the bucket in `region`
    ///
    /// A bucket that appeared concurrently is reported as an error.
    async fn create(&self, bucket: &str, region: &str) -> BackendResult<()>;

    async fn put_versioning(&self, bucket: &str) -> BackendResult<()>;

    async fn put_encryption(
        &self,
        bucket: &str,
        algorithm: EncryptionAlgorithm,
    ) -> BackendResult<()>;

    async fn put_public_access_block(
        &self,
        bucket: &str,
        config: &PublicAccessBlock,
    ) -> BackendResult<()>;

    /// Attach `policy`, replacing any existing policy
    async fn put_policy(&self, bucket: &str, policy: &PolicyDocument) -> BackendResult<()>;
}

/// Keyed record store holding the lock table
#[async_trait]
pub trait LockStoreBackend: Send + Sync {
    /// Describe-style existence check. Must not mutate anything.
    async fn probe(&self, table: &str) -> ExistenceProbeResult;

    /// Create the table with a single hash key
    async fn create(&self, table: &str, params: &LockTableParams) -> BackendResult<()>;
}
