//! Backend selection

use std::sync::Arc;

use clap::ValueEnum;
use log::info;
use plinth_core::backends::{MemoryLockStore, MemoryObjectStore};
use plinth_core::{Backends, BootstrapConfig};
use plinth_provider_aws::{AwsContext, DynamoDbLockStore, S3ObjectStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// S3 and DynamoDB
    Aws,
    /// Throwaway in-memory environment, for rehearsing a run
    Memory,
}

/// Construct the client handles for `kind` once, for every reconciler to share
pub async fn create_backends(kind: BackendKind, config: &BootstrapConfig) -> Backends {
    match kind {
        BackendKind::Aws => {
            let region = config.region();
            info!("Using AWS backends in {}", region);
            let ctx = AwsContext::new(&region, config.endpoint_url.as_deref()).await;
            Backends::new(
                Arc::new(S3ObjectStore::from_context(&ctx)),
                Arc::new(DynamoDbLockStore::from_context(&ctx)),
            )
        }
        BackendKind::Memory => {
            info!("Using in-memory backends");
            Backends::new(
                Arc::new(MemoryObjectStore::new()),
                Arc::new(MemoryLockStore::new()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plinth_core::{ReconcileResult, bootstrap};

    #[tokio::test]
    async fn test_memory_backends_bootstrap() {
        let config = BootstrapConfig {
            state_bucket: Some("rehearsal-state".to_string()),
            principal: Some("218585377303".to_string()),
            ..BootstrapConfig::default()
        };
        let plan = config.plan().unwrap();
        let backends = create_backends(BackendKind::Memory, &config).await;

        let report = bootstrap(&backends, &plan).await;
        assert!(report.is_ready());
        assert!(
            report
                .resources
                .iter()
                .all(|r| r.result == ReconcileResult::CreatedAndConfigured)
        );
    }
}
