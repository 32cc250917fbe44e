//! AWS backends for plinth
//!
//! The state bucket lives in S3 and the lock table in DynamoDB. All
//! knowledge of AWS error codes is confined to [`error`].

pub mod context;
pub mod dynamodb;
pub mod error;
pub mod s3;

pub use context::AwsContext;
pub use dynamodb::DynamoDbLockStore;
pub use error::suggestion_for_code;
pub use s3::S3ObjectStore;
