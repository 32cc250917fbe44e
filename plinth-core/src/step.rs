//! Post-creation configuration steps for the state bucket

use serde::{Deserialize, Serialize};

/// A named, idempotent operation applied to a freshly created object store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigurationStep {
    Versioning,
    Encryption,
    PublicAccessBlock,
    AccessPolicy,
}

impl ConfigurationStep {
    /// Object-store steps in the order they must be applied.
    ///
    /// Public access is blocked only after versioning and encryption are in
    /// place, and the policy is attached last.
    pub const OBJECT_STORE: [ConfigurationStep; 4] = [
        ConfigurationStep::Versioning,
        ConfigurationStep::Encryption,
        ConfigurationStep::PublicAccessBlock,
        ConfigurationStep::AccessPolicy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Versioning => "versioning",
            Self::Encryption => "encryption",
            Self::PublicAccessBlock => "public-access-block",
            Self::AccessPolicy => "policy",
        }
    }
}

impl std::fmt::Display for ConfigurationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Default server-side encryption algorithm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionAlgorithm {
    /// Storage-managed keys (SSE-S3)
    #[default]
    Aes256,
    /// Keys held by the key management service (SSE-KMS)
    Kms,
}

impl EncryptionAlgorithm {
    /// Algorithm identifier as understood by the storage service
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aes256 => "AES256",
            Self::Kms => "aws:kms",
        }
    }
}

/// The four public-access-blocking switches of a bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublicAccessBlock {
    pub block_public_acls: bool,
    pub ignore_public_acls: bool,
    pub block_public_policy: bool,
    pub restrict_public_buckets: bool,
}

impl PublicAccessBlock {
    /// Every switch enabled
    pub const fn all_blocked() -> Self {
        Self {
            block_public_acls: true,
            ignore_public_acls: true,
            block_public_policy: true,
            restrict_public_buckets: true,
        }
    }

    pub fn is_fully_blocked(&self) -> bool {
        *self == Self::all_blocked()
    }
}
