//! S3 backend for the state bucket

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::types::{
    BucketLocationConstraint, BucketVersioningStatus, CreateBucketConfiguration,
    PublicAccessBlockConfiguration, ServerSideEncryption, ServerSideEncryptionByDefault,
    ServerSideEncryptionConfiguration, ServerSideEncryptionRule, VersioningConfiguration,
};
use log::debug;
use plinth_core::{
    BackendError, BackendResult, EncryptionAlgorithm, ExistenceProbeResult, ObjectStoreBackend,
    PolicyDocument, PublicAccessBlock,
};

use crate::context::AwsContext;
use crate::error::{HEAD_BUCKET, backend_error, http_status, invalid_request};

/// Region that rejects an explicit location constraint
const DEFAULT_BUCKET_REGION: &str = "us-east-1";

/// S3-backed object store
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_context(ctx: &AwsContext) -> Self {
        Self::new(ctx.s3_client())
    }
}

#[async_trait]
impl ObjectStoreBackend for S3ObjectStore {
    async fn probe(&self, bucket: &str) -> ExistenceProbeResult {
        debug!("HeadBucket {}", bucket);
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => ExistenceProbeResult::Exists,
            Err(err) if err.as_service_error().is_some_and(HeadBucketError::is_not_found) => {
                ExistenceProbeResult::NotFound
            }
            Err(err) => HEAD_BUCKET.classify(backend_error(&err), http_status(&err)),
        }
    }

    async fn create(&self, bucket: &str, region: &str) -> BackendResult<()> {
        debug!("CreateBucket {} in {}", bucket, region);
        let mut request = self.client.create_bucket().bucket(bucket);

        if let Some(constraint) = location_constraint(region) {
            let config = CreateBucketConfiguration::builder()
                .location_constraint(constraint)
                .build();
            request = request.create_bucket_configuration(config);
        }

        request.send().await.map_err(|e| backend_error(&e))?;
        Ok(())
    }

    async fn put_versioning(&self, bucket: &str) -> BackendResult<()> {
        debug!("PutBucketVersioning {}", bucket);
        let versioning_config = VersioningConfiguration::builder()
            .status(BucketVersioningStatus::Enabled)
            .build();

        self.client
            .put_bucket_versioning()
            .bucket(bucket)
            .versioning_configuration(versioning_config)
            .send()
            .await
            .map_err(|e| backend_error(&e))?;
        Ok(())
    }

    async fn put_encryption(
        &self,
        bucket: &str,
        algorithm: EncryptionAlgorithm,
    ) -> BackendResult<()> {
        debug!("PutBucketEncryption {} ({})", bucket, algorithm.as_str());
        let by_default = ServerSideEncryptionByDefault::builder()
            .sse_algorithm(sse_algorithm(algorithm))
            .build()
            .map_err(|e| invalid_request("Failed to build encryption default", e))?;
        let rule = ServerSideEncryptionRule::builder()
            .apply_server_side_encryption_by_default(by_default)
            .build();
        let config = ServerSideEncryptionConfiguration::builder()
            .rules(rule)
            .build()
            .map_err(|e| invalid_request("Failed to build encryption configuration", e))?;

        self.client
            .put_bucket_encryption()
            .bucket(bucket)
            .server_side_encryption_configuration(config)
            .send()
            .await
            .map_err(|e| backend_error(&e))?;
        Ok(())
    }

    async fn put_public_access_block(
        &self,
        bucket: &str,
        config: &PublicAccessBlock,
    ) -> BackendResult<()> {
        debug!("PutPublicAccessBlock {}", bucket);
        let public_access_block = PublicAccessBlockConfiguration::builder()
            .block_public_acls(config.block_public_acls)
            .ignore_public_acls(config.ignore_public_acls)
            .block_public_policy(config.block_public_policy)
            .restrict_public_buckets(config.restrict_public_buckets)
            .build();

        self.client
            .put_public_access_block()
            .bucket(bucket)
            .public_access_block_configuration(public_access_block)
            .send()
            .await
            .map_err(|e| backend_error(&e))?;
        Ok(())
    }

    async fn put_policy(&self, bucket: &str, policy: &PolicyDocument) -> BackendResult<()> {
        debug!("PutBucketPolicy {}", bucket);
        let document = policy
            .to_json()
            .map_err(|e| BackendError::new(format!("Failed to render bucket policy: {}", e)))?;

        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(document)
            .send()
            .await
            .map_err(|e| backend_error(&e))?;
        Ok(())
    }
}

/// Location constraint for `region`, none for the legacy default region
fn location_constraint(region: &str) -> Option<BucketLocationConstraint> {
    if region == DEFAULT_BUCKET_REGION {
        None
    } else {
        Some(BucketLocationConstraint::from(region))
    }
}

fn sse_algorithm(algorithm: EncryptionAlgorithm) -> ServerSideEncryption {
    match algorithm {
        EncryptionAlgorithm::Aes256 => ServerSideEncryption::Aes256,
        EncryptionAlgorithm::Kms => ServerSideEncryption::AwsKms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::error::ErrorMetadata;
    use aws_sdk_s3::operation::create_bucket::CreateBucketOutput;
    use aws_sdk_s3::operation::head_bucket::HeadBucketOutput;
    use aws_sdk_s3::operation::put_bucket_encryption::PutBucketEncryptionOutput;
    use aws_sdk_s3::operation::put_bucket_policy::PutBucketPolicyOutput;
    use aws_sdk_s3::operation::put_bucket_versioning::PutBucketVersioningOutput;
    use aws_sdk_s3::operation::put_public_access_block::PutPublicAccessBlockOutput;
    use aws_sdk_s3::types::error::NotFound;
    use aws_smithy_mocks::{RuleMode, mock, mock_client};
    use plinth_core::Principal;

    #[test]
    fn test_location_constraint() {
        assert!(location_constraint("us-east-1").is_none());
        assert_eq!(
            location_constraint("eu-west-1"),
            Some(BucketLocationConstraint::EuWest1)
        );
        assert_eq!(
            location_constraint("ap-northeast-1").map(|c| c.as_str().to_string()),
            Some("ap-northeast-1".to_string())
        );
    }

    #[test]
    fn test_sse_algorithm_matches_core_identifier() {
        for algorithm in [EncryptionAlgorithm::Aes256, EncryptionAlgorithm::Kms] {
            assert_eq!(sse_algorithm(algorithm).as_str(), algorithm.as_str());
        }
    }

    #[tokio::test]
    async fn test_probe_existing_bucket() {
        let head = mock!(Client::head_bucket)
            .match_requests(|req| req.bucket() == Some("tf-state"))
            .then_output(|| HeadBucketOutput::builder().build());
        let store = S3ObjectStore::new(mock_client!(aws_sdk_s3, [&head]));

        assert_eq!(store.probe("tf-state").await, ExistenceProbeResult::Exists);
        assert_eq!(head.num_calls(), 1);
    }

    #[tokio::test]
    async fn test_probe_missing_bucket() {
        let head = mock!(Client::head_bucket)
            .then_error(|| HeadBucketError::NotFound(NotFound::builder().build()));
        let store = S3ObjectStore::new(mock_client!(aws_sdk_s3, [&head]));

        assert_eq!(store.probe("tf-state").await, ExistenceProbeResult::NotFound);
    }

    #[tokio::test]
    async fn test_probe_forbidden_bucket_is_an_error() {
        let head = mock!(Client::head_bucket).then_error(|| {
            HeadBucketError::generic(
                ErrorMetadata::builder()
                    .code("Forbidden")
                    .message("Forbidden")
                    .build(),
            )
        });
        let store = S3ObjectStore::new(mock_client!(aws_sdk_s3, [&head]));

        match store.probe("tf-state").await {
            ExistenceProbeResult::ProbeError(cause) => assert!(cause.has_code("Forbidden")),
            other => panic!("Expected ProbeError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_sends_location_constraint() {
        let create = mock!(Client::create_bucket)
            .match_requests(|req| {
                req.bucket() == Some("tf-state")
                    && req
                        .create_bucket_configuration()
                        .and_then(|c| c.location_constraint())
                        == Some(&BucketLocationConstraint::EuWest1)
            })
            .then_output(|| CreateBucketOutput::builder().build());
        let store = S3ObjectStore::new(mock_client!(aws_sdk_s3, [&create]));

        assert!(store.create("tf-state", "eu-west-1").await.is_ok());
        assert_eq!(create.num_calls(), 1);
    }

    #[tokio::test]
    async fn test_create_in_us_east_1_omits_configuration() {
        let create = mock!(Client::create_bucket)
            .match_requests(|req| req.create_bucket_configuration().is_none())
            .then_output(|| CreateBucketOutput::builder().build());
        let store = S3ObjectStore::new(mock_client!(aws_sdk_s3, [&create]));

        assert!(store.create("tf-state", "us-east-1").await.is_ok());
        assert_eq!(create.num_calls(), 1);
    }

    #[tokio::test]
    async fn test_configuration_requests() {
        let versioning = mock!(Client::put_bucket_versioning)
            .match_requests(|req| {
                req.versioning_configuration().and_then(|c| c.status())
                    == Some(&BucketVersioningStatus::Enabled)
            })
            .then_output(|| PutBucketVersioningOutput::builder().build());
        let encryption = mock!(Client::put_bucket_encryption)
            .match_requests(|req| {
                req.server_side_encryption_configuration()
                    .and_then(|c| c.rules().first())
                    .and_then(|r| r.apply_server_side_encryption_by_default())
                    .map(|d| d.sse_algorithm())
                    == Some(&ServerSideEncryption::AwsKms)
            })
            .then_output(|| PutBucketEncryptionOutput::builder().build());
        let public_access = mock!(Client::put_public_access_block)
            .match_requests(|req| {
                req.public_access_block_configuration().is_some_and(|c| {
                    c.block_public_acls() == Some(true)
                        && c.ignore_public_acls() == Some(true)
                        && c.block_public_policy() == Some(true)
                        && c.restrict_public_buckets() == Some(true)
                })
            })
            .then_output(|| PutPublicAccessBlockOutput::builder().build());
        let policy = mock!(Client::put_bucket_policy)
            .match_requests(|req| {
                req.policy()
                    .and_then(|body| serde_json::from_str::<PolicyDocument>(body).ok())
                    .is_some_and(|doc| {
                        doc.statement[0].resource
                            == vec!["arn:aws:s3:::tf-state", "arn:aws:s3:::tf-state/*"]
                            && doc.grants(&Principal::parse("218585377303").unwrap())
                    })
            })
            .then_output(|| PutBucketPolicyOutput::builder().build());
        let store = S3ObjectStore::new(mock_client!(
            aws_sdk_s3,
            RuleMode::MatchAny,
            [&versioning, &encryption, &public_access, &policy]
        ));

        let principal = Principal::parse("218585377303").unwrap();
        assert!(store.put_versioning("tf-state").await.is_ok());
        assert!(
            store
                .put_encryption("tf-state", EncryptionAlgorithm::Kms)
                .await
                .is_ok()
        );
        assert!(
            store
                .put_public_access_block("tf-state", &PublicAccessBlock::all_blocked())
                .await
                .is_ok()
        );
        assert!(
            store
                .put_policy(
                    "tf-state",
                    &PolicyDocument::for_state_bucket("tf-state", &principal)
                )
                .await
                .is_ok()
        );

        for rule in [&versioning, &encryption, &public_access, &policy] {
            assert_eq!(rule.num_calls(), 1);
        }
    }

    #[tokio::test]
    async fn test_service_error_keeps_code() {
        let create = mock!(Client::create_bucket).then_error(|| {
            aws_sdk_s3::operation::create_bucket::CreateBucketError::generic(
                ErrorMetadata::builder()
                    .code("BucketAlreadyExists")
                    .message("The requested bucket name is not available")
                    .build(),
            )
        });
        let store = S3ObjectStore::new(mock_client!(aws_sdk_s3, [&create]));

        let err = store.create("tf-state", "eu-west-1").await.unwrap_err();
        assert!(err.has_code("BucketAlreadyExists"));
        assert_eq!(err.message, "The requested bucket name is not available");
    }
}
