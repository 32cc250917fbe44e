//! Resource definitions for the managed state backend

use serde::{Deserialize, Serialize};

use crate::step::EncryptionAlgorithm;

/// Identifies a managed resource and carries its kind-specific parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSpec {
    /// Globally agreed name (bucket name or table name)
    pub name: String,
    pub kind: ResourceKind,
}

impl ResourceSpec {
    pub fn object_store(name: impl Into<String>, params: ObjectStoreParams) -> Self {
        Self {
            name: name.into(),
            kind: ResourceKind::ObjectStore(params),
        }
    }

    pub fn lock_table(name: impl Into<String>, params: LockTableParams) -> Self {
        Self {
            name: name.into(),
            kind: ResourceKind::LockTable(params),
        }
    }

    /// Short label for reports (e.g. "object store")
    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            ResourceKind::ObjectStore(_) => "object store",
            ResourceKind::LockTable(_) => "lock table",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    ObjectStore(ObjectStoreParams),
    LockTable(LockTableParams),
}

/// Parameters of the state bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreParams {
    /// Region the bucket is created in (e.g. "eu-west-1")
    pub region: String,
    /// Identity granted access by the bucket policy
    pub principal: Principal,
    pub encryption: EncryptionAlgorithm,
}

/// Parameters of the lock table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockTableParams {
    pub key_attribute: KeyAttribute,
    pub billing_mode: BillingMode,
}

/// The single hash key of the lock table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub attribute_type: AttributeType,
}

impl KeyAttribute {
    /// Attribute name the infrastructure tool writes lock IDs under
    pub const DEFAULT_NAME: &'static str = "LockID";

    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute_type: AttributeType::String,
        }
    }
}

impl Default for KeyAttribute {
    fn default() -> Self {
        Self::string(Self::DEFAULT_NAME)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    #[default]
    String,
    Number,
    Binary,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Binary => "binary",
        }
    }
}

/// Capacity mode of the lock table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingMode {
    #[default]
    PayPerRequest,
    Provisioned { read: i64, write: i64 },
}

/// Partition assumed for a bare account ID
pub const DEFAULT_PARTITION: &str = "aws";

/// A fully qualified account-level identity (e.g. `arn:aws:iam::123456789012:root`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal(String);

impl Principal {
    /// Accept a 12-digit account ID or a full ARN
    ///
    /// An account ID expands to the account's root identity.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.len() == 12 && value.chars().all(|c| c.is_ascii_digit()) {
            return Some(Self(format!("arn:{}:iam::{}:root", DEFAULT_PARTITION, value)));
        }
        let mut parts = value.splitn(6, ':');
        let well_formed = parts.next() == Some("arn")
            && parts.next().is_some_and(|p| !p.is_empty())
            && parts.next() == Some("iam")
            && parts.next() == Some("")
            && parts
                .next()
                .is_some_and(|a| a.len() == 12 && a.chars().all(|c| c.is_ascii_digit()))
            && parts.next().is_some_and(|r| !r.is_empty());
        if well_formed {
            Some(Self(value.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ARN partition of the identity (e.g. `aws`, `aws-us-gov`)
    pub fn partition(&self) -> &str {
        self.0.split(':').nth(1).unwrap_or(DEFAULT_PARTITION)
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
