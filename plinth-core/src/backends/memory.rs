//! In-memory environment for rehearsals and tests
//!
//! Each store keeps its own state, records every call it receives, and can be
//! told to fail a given operation. Error codes mirror the ones the real
//! services return for the same situations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::backend::{BackendResult, LockStoreBackend, ObjectStoreBackend};
use crate::error::BackendError;
use crate::outcome::ExistenceProbeResult;
use crate::policy::PolicyDocument;
use crate::resource::{BillingMode, KeyAttribute, LockTableParams};
use crate::step::{EncryptionAlgorithm, PublicAccessBlock};

/// Code returned when creating a bucket this account already owns
pub const BUCKET_ALREADY_OWNED: &str = "BucketAlreadyOwnedByYou";
/// Code returned when configuring a bucket that does not exist
pub const NO_SUCH_BUCKET: &str = "NoSuchBucket";
/// Code returned when creating a table that already exists
pub const RESOURCE_IN_USE: &str = "ResourceInUseException";

/// A call received by an in-memory store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Probe,
    Create,
    PutVersioning,
    PutEncryption,
    PutPublicAccessBlock,
    PutPolicy,
}

#[derive(Debug, Default)]
struct Journal {
    calls: Vec<Operation>,
    failures: HashMap<Operation, BackendError>,
}

impl Journal {
    /// Record `op` and return the injected failure for it, if any
    fn record(&mut self, op: Operation) -> BackendResult<()> {
        self.calls.push(op);
        match self.failures.get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn count(&self, op: Operation) -> usize {
        self.calls.iter().filter(|c| **c == op).count()
    }
}

/// What the in-memory object store knows about a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRecord {
    pub region: String,
    pub versioning: bool,
    pub encryption: Option<EncryptionAlgorithm>,
    pub public_access_block: Option<PublicAccessBlock>,
    pub policy: Option<PolicyDocument>,
}

impl BucketRecord {
    /// A bare bucket with nothing configured
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            versioning: false,
            encryption: None,
            public_access_block: None,
            policy: None,
        }
    }
}

#[derive(Debug, Default)]
struct ObjectStoreState {
    buckets: HashMap<String, BucketRecord>,
    journal: Journal,
}

impl ObjectStoreState {
    fn bucket_mut(&mut self, bucket: &str) -> BackendResult<&mut BucketRecord> {
        self.buckets.get_mut(bucket).ok_or_else(|| {
            BackendError::new(format!("The specified bucket does not exist: {}", bucket))
                .with_code(NO_SUCH_BUCKET)
        })
    }
}

/// In-memory object storage service
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    state: Arc<Mutex<ObjectStoreState>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a bucket that exists before any reconciliation
    pub async fn insert_bucket(&self, bucket: impl Into<String>, record: BucketRecord) {
        self.state.lock().await.buckets.insert(bucket.into(), record);
    }

    pub async fn bucket(&self, bucket: &str) -> Option<BucketRecord> {
        self.state.lock().await.buckets.get(bucket).cloned()
    }

    /// Make every subsequent `op` call fail with `error`
    pub async fn fail_on(&self, op: Operation, error: BackendError) {
        self.state.lock().await.journal.failures.insert(op, error);
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.journal.failures.clear();
    }

    /// Every call received so far, in order
    pub async fn calls(&self) -> Vec<Operation> {
        self.state.lock().await.journal.calls.clone()
    }

    pub async fn call_count(&self, op: Operation) -> usize {
        self.state.lock().await.journal.count(op)
    }
}

#[async_trait]
impl ObjectStoreBackend for MemoryObjectStore {
    async fn probe(&self, bucket: &str) -> ExistenceProbeResult {
        let mut state = self.state.lock().await;
        if let Err(error) = state.journal.record(Operation::Probe) {
            return ExistenceProbeResult::ProbeError(error);
        }
        if state.buckets.contains_key(bucket) {
            ExistenceProbeResult::Exists
        } else {
            ExistenceProbeResult::NotFound
        }
    }

    async fn create(&self, bucket: &str, region: &str) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        state.journal.record(Operation::Create)?;
        if state.buckets.contains_key(bucket) {
            return Err(BackendError::new(
                "Your previous request to create the named bucket succeeded and you already own it.",
            )
            .with_code(BUCKET_ALREADY_OWNED));
        }
        state
            .buckets
            .insert(bucket.to_string(), BucketRecord::new(region));
        Ok(())
    }

    async fn put_versioning(&self, bucket: &str) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        state.journal.record(Operation::PutVersioning)?;
        state.bucket_mut(bucket)?.versioning = true;
        Ok(())
    }

    async fn put_encryption(
        &self,
        bucket: &str,
        algorithm: EncryptionAlgorithm,
    ) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        state.journal.record(Operation::PutEncryption)?;
        state.bucket_mut(bucket)?.encryption = Some(algorithm);
        Ok(())
    }

    async fn put_public_access_block(
        &self,
        bucket: &str,
        config: &PublicAccessBlock,
    ) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        state.journal.record(Operation::PutPublicAccessBlock)?;
        state.bucket_mut(bucket)?.public_access_block = Some(*config);
        Ok(())
    }

    async fn put_policy(&self, bucket: &str, policy: &PolicyDocument) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        state.journal.record(Operation::PutPolicy)?;
        state.bucket_mut(bucket)?.policy = Some(policy.clone());
        Ok(())
    }
}

/// What the in-memory lock store knows about a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRecord {
    pub hash_key: KeyAttribute,
    pub billing_mode: BillingMode,
}

#[derive(Debug, Default)]
struct LockStoreState {
    tables: HashMap<String, TableRecord>,
    journal: Journal,
}

/// In-memory keyed record store
#[derive(Debug, Clone, Default)]
pub struct MemoryLockStore {
    state: Arc<Mutex<LockStoreState>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table that exists before any reconciliation
    pub async fn insert_table(&self, table: impl Into<String>, record: TableRecord) {
        self.state.lock().await.tables.insert(table.into(), record);
    }

    pub async fn table(&self, table: &str) -> Option<TableRecord> {
        self.state.lock().await.tables.get(table).cloned()
    }

    /// Make every subsequent `op` call fail with `error`
    pub async fn fail_on(&self, op: Operation, error: BackendError) {
        self.state.lock().await.journal.failures.insert(op, error);
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.journal.failures.clear();
    }

    pub async fn calls(&self) -> Vec<Operation> {
        self.state.lock().await.journal.calls.clone()
    }

    pub async fn call_count(&self, op: Operation) -> usize {
        self.state.lock().await.journal.count(op)
    }
}

#[async_trait]
impl LockStoreBackend for MemoryLockStore {
    async fn probe(&self, table: &str) -> ExistenceProbeResult {
        let mut state = self.state.lock().await;
        if let Err(error) = state.journal.record(Operation::Probe) {
            return ExistenceProbeResult::ProbeError(error);
        }
        if state.tables.contains_key(table) {
            ExistenceProbeResult::Exists
        } else {
            ExistenceProbeResult::NotFound
        }
    }

    async fn create(&self, table: &str, params: &LockTableParams) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        state.journal.record(Operation::Create)?;
        if state.tables.contains_key(table) {
            return Err(
                BackendError::new(format!("Table already exists: {}", table))
                    .with_code(RESOURCE_IN_USE),
            );
        }
        state.tables.insert(
            table.to_string(),
            TableRecord {
                hash_key: params.key_attribute.clone(),
                billing_mode: params.billing_mode,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bucket_lifecycle() {
        let store = MemoryObjectStore::new();
        assert_eq!(store.probe("b").await, ExistenceProbeResult::NotFound);

        store.create("b", "eu-west-1").await.unwrap();
        assert_eq!(store.probe("b").await, ExistenceProbeResult::Exists);

        store.put_versioning("b").await.unwrap();
        let record = store.bucket("b").await.unwrap();
        assert_eq!(record.region, "eu-west-1");
        assert!(record.versioning);
        assert!(record.encryption.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_create_is_rejected() {
        let store = MemoryObjectStore::new();
        store.create("b", "eu-west-1").await.unwrap();

        let err = store.create("b", "eu-west-1").await.unwrap_err();
        assert!(err.has_code(BUCKET_ALREADY_OWNED));
    }

    #[tokio::test]
    async fn test_configuring_missing_bucket_fails() {
        let store = MemoryObjectStore::new();
        let err = store.put_versioning("missing").await.unwrap_err();
        assert!(err.has_code(NO_SUCH_BUCKET));
    }

    #[tokio::test]
    async fn test_injected_failure_is_recorded() {
        let store = MemoryObjectStore::new();
        store
            .fail_on(
                Operation::Probe,
                BackendError::new("denied").with_code("AccessDenied"),
            )
            .await;

        match store.probe("b").await {
            ExistenceProbeResult::ProbeError(e) => assert!(e.has_code("AccessDenied")),
            other => panic!("Expected ProbeError, got {:?}", other),
        }
        assert_eq!(store.calls().await, vec![Operation::Probe]);

        store.clear_failures().await;
        assert_eq!(store.probe("b").await, ExistenceProbeResult::NotFound);
        assert_eq!(store.call_count(Operation::Probe).await, 2);
    }

    #[tokio::test]
    async fn test_table_lifecycle() {
        let store = MemoryLockStore::new();
        assert!(store.probe("locks").await.is_not_found());

        store
            .create("locks", &LockTableParams::default())
            .await
            .unwrap();
        assert!(store.probe("locks").await.exists());

        let err = store
            .create("locks", &LockTableParams::default())
            .await
            .unwrap_err();
        assert!(err.has_code(RESOURCE_IN_USE));
        assert_eq!(store.call_count(Operation::Create).await, 2);
    }
}
