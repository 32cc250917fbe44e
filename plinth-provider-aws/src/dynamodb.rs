//! DynamoDB backend for the lock table

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode as DynamoBillingMode, KeySchemaElement, KeyType,
    ProvisionedThroughput, ScalarAttributeType,
};
use log::debug;
use plinth_core::{
    AttributeType, BackendResult, BillingMode, ExistenceProbeResult, LockStoreBackend,
    LockTableParams,
};

use crate::context::AwsContext;
use crate::error::{DESCRIBE_TABLE, backend_error, http_status, invalid_request};

/// DynamoDB-backed lock store
#[derive(Debug, Clone)]
pub struct DynamoDbLockStore {
    client: Client,
}

impl DynamoDbLockStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_context(ctx: &AwsContext) -> Self {
        Self::new(ctx.dynamodb_client())
    }
}

#[async_trait]
impl LockStoreBackend for DynamoDbLockStore {
    async fn probe(&self, table: &str) -> ExistenceProbeResult {
        debug!("DescribeTable {}", table);
        match self.client.describe_table().table_name(table).send().await {
            Ok(_) => ExistenceProbeResult::Exists,
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(DescribeTableError::is_resource_not_found_exception) =>
            {
                ExistenceProbeResult::NotFound
            }
            Err(err) => DESCRIBE_TABLE.classify(backend_error(&err), http_status(&err)),
        }
    }

    async fn create(&self, table: &str, params: &LockTableParams) -> BackendResult<()> {
        let key = &params.key_attribute;
        debug!(
            "CreateTable {} with hash key {}:{}",
            table,
            key.name,
            key.attribute_type.as_str()
        );

        let key_schema = KeySchemaElement::builder()
            .attribute_name(&key.name)
            .key_type(KeyType::Hash)
            .build()
            .map_err(|e| invalid_request("Failed to build key schema", e))?;
        let definition = AttributeDefinition::builder()
            .attribute_name(&key.name)
            .attribute_type(scalar_type(key.attribute_type))
            .build()
            .map_err(|e| invalid_request("Failed to build attribute definition", e))?;

        let mut request = self
            .client
            .create_table()
            .table_name(table)
            .key_schema(key_schema)
            .attribute_definitions(definition);

        request = match params.billing_mode {
            BillingMode::PayPerRequest => request.billing_mode(DynamoBillingMode::PayPerRequest),
            BillingMode::Provisioned { read, write } => {
                let throughput = ProvisionedThroughput::builder()
                    .read_capacity_units(read)
                    .write_capacity_units(write)
                    .build()
                    .map_err(|e| invalid_request("Failed to build provisioned throughput", e))?;
                request
                    .billing_mode(DynamoBillingMode::Provisioned)
                    .provisioned_throughput(throughput)
            }
        };

        request.send().await.map_err(|e| backend_error(&e))?;
        Ok(())
    }
}

fn scalar_type(attribute_type: AttributeType) -> ScalarAttributeType {
    match attribute_type {
        AttributeType::String => ScalarAttributeType::S,
        AttributeType::Number => ScalarAttributeType::N,
        AttributeType::Binary => ScalarAttributeType::B,
    }
}
