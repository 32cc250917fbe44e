//! Bootstrap configuration
//!
//! Read from a JSON file, overridden by command-line flags, and validated as a
//! whole before any backend is contacted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bootstrap::BootstrapPlan;
use crate::resource::{
    AttributeType, BillingMode, KeyAttribute, LockTableParams, ObjectStoreParams, Principal,
    ResourceSpec,
};
use crate::step::EncryptionAlgorithm;

pub const DEFAULT_REGION: &str = "eu-west-1";
pub const DEFAULT_LOCK_TABLE: &str = "terraform-state-locks";

/// A single problem found while validating the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration:\n{}", render_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn render_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Everything needed to bootstrap the state backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootstrapConfig {
    /// Region of the bucket and table (e.g. `eu-west-1`)
    pub region: String,
    /// Globally unique name of the state bucket
    pub state_bucket: Option<String>,
    pub lock_table: String,
    /// Account ID or ARN granted access to the state bucket
    pub principal: Option<String>,
    pub key_attribute: String,
    pub key_type: AttributeType,
    pub billing_mode: BillingMode,
    pub encryption: EncryptionAlgorithm,
    /// Custom service endpoint, for emulators
    pub endpoint_url: Option<String>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            state_bucket: None,
            lock_table: DEFAULT_LOCK_TABLE.to_string(),
            principal: None,
            key_attribute: KeyAttribute::DEFAULT_NAME.to_string(),
            key_type: AttributeType::String,
            billing_mode: BillingMode::PayPerRequest,
            encryption: EncryptionAlgorithm::Aes256,
            endpoint_url: None,
        }
    }
}

impl BootstrapConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Region as sent to the services, surrounding whitespace removed
    pub fn region(&self) -> String {
        self.region.trim().to_string()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.plan().map(|_| ())
    }

    /// Build the resource specs, reporting every invalid field at once
    pub fn plan(&self) -> Result<BootstrapPlan, ConfigError> {
        let mut errors = Vec::new();

        let region = self.region();
        if region.is_empty()
            || !region
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            errors.push(ValidationError::new(
                "region",
                format!("'{}' is not a valid region", self.region),
            ));
        }

        let bucket = match self.state_bucket.as_deref() {
            None => {
                errors.push(ValidationError::new("state_bucket", "is required"));
                None
            }
            Some(name) => match validate_bucket_name(name) {
                Ok(()) => Some(name.to_string()),
                Err(message) => {
                    errors.push(ValidationError::new("state_bucket", message));
                    None
                }
            },
        };

        let principal = match self.principal.as_deref() {
            None => {
                errors.push(ValidationError::new("principal", "is required"));
                None
            }
            Some(value) => {
                let parsed = Principal::parse(value);
                if parsed.is_none() {
                    errors.push(ValidationError::new(
                        "principal",
                        format!(
                            "'{}' is neither a 12-digit account ID nor an IAM ARN",
                            value
                        ),
                    ));
                }
                parsed
            }
        };

        if let Err(message) = validate_table_name(&self.lock_table) {
            errors.push(ValidationError::new("lock_table", message));
        }

        if self.key_attribute.is_empty() || self.key_attribute.len() > 255 {
            errors.push(ValidationError::new(
                "key_attribute",
                "must be between 1 and 255 characters",
            ));
        }

        if let BillingMode::Provisioned { read, write } = self.billing_mode
            && (read < 1 || write < 1)
        {
            errors.push(ValidationError::new(
                "billing_mode",
                "provisioned read and write capacity must be at least 1",
            ));
        }

        if let Some(url) = self.endpoint_url.as_deref()
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            errors.push(ValidationError::new(
                "endpoint_url",
                format!("'{}' must start with http:// or https://", url),
            ));
        }

        match (bucket, principal) {
            (Some(bucket), Some(principal)) if errors.is_empty() => Ok(BootstrapPlan {
                object_store: ResourceSpec::object_store(
                    bucket,
                    ObjectStoreParams {
                        region,
                        principal,
                        encryption: self.encryption,
                    },
                ),
                lock_table: ResourceSpec::lock_table(
                    self.lock_table.clone(),
                    LockTableParams {
                        key_attribute: KeyAttribute {
                            name: self.key_attribute.clone(),
                            attribute_type: self.key_type,
                        },
                        billing_mode: self.billing_mode,
                    },
                ),
            }),
            _ => Err(ConfigError::Invalid(errors)),
        }
    }
}

fn validate_bucket_name(name: &str) -> Result<(), String> {
    if name.len() < 3 || name.len() > 63 {
        return Err(format!(
            "bucket name must be between 3 and 63 characters, got {}",
            name.len()
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(format!(
            "'{}' may only contain lowercase letters, digits, '-' and '.'",
            name
        ));
    }
    let alphanumeric = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    if !name.starts_with(alphanumeric) || !name.ends_with(alphanumeric) {
        return Err(format!(
            "'{}' must start and end with a letter or digit",
            name
        ));
    }
    if name.contains("..") {
        return Err(format!("'{}' must not contain consecutive periods", name));
    }
    if name.split('.').count() == 4 && name.split('.').all(|p| p.parse::<u8>().is_ok()) {
        return Err(format!("'{}' must not be formatted as an IP address", name));
    }
    Ok(())
}

fn validate_table_name(name: &str) -> Result<(), String> {
    if name.len() < 3 || name.len() > 255 {
        return Err(format!(
            "table name must be between 3 and 255 characters, got {}",
            name.len()
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(format!(
            "'{}' may only contain letters, digits, '_', '-' and '.'",
            name
        ));
    }
    Ok(())
}
