//! Bucket policy document generated for the state bucket

use serde::{Deserialize, Serialize};

use crate::resource::Principal;

/// Policy language version understood by the storage service
pub const POLICY_VERSION: &str = "2012-10-17";

/// Capabilities the infrastructure tool needs on its state bucket
pub const STATE_ACTIONS: [&str; 4] = [
    "s3:ListBucket",
    "s3:GetObject",
    "s3:PutObject",
    "s3:DeleteObject",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: String,
    pub principal: PolicyPrincipal,
    pub action: Vec<String>,
    pub resource: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyPrincipal {
    #[serde(rename = "AWS")]
    pub aws: String,
}

impl PolicyDocument {
    /// Grant `principal` the state capabilities on `bucket` and every object in it
    ///
    /// The bucket ARN lives in the same partition as the principal.
    pub fn for_state_bucket(bucket: &str, principal: &Principal) -> Self {
        let bucket_arn = bucket_arn(principal.partition(), bucket);
        Self {
            version: POLICY_VERSION.to_string(),
            statement: vec![PolicyStatement {
                effect: "Allow".to_string(),
                principal: PolicyPrincipal {
                    aws: principal.as_str().to_string(),
                },
                action: STATE_ACTIONS.iter().map(|a| a.to_string()).collect(),
                resource: vec![bucket_arn.clone(), format!("{}/*", bucket_arn)],
            }],
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Whether some statement allows `principal` every state capability
    pub fn grants(&self, principal: &Principal) -> bool {
        self.statement.iter().any(|s| {
            s.effect == "Allow"
                && s.principal.aws == principal.as_str()
                && STATE_ACTIONS
                    .iter()
                    .all(|action| s.action.iter().any(|a| a == action))
        })
    }
}

pub fn bucket_arn(partition: &str, bucket: &str) -> String {
    format!("arn:{}:s3:::{}", partition, bucket)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Principal {
        Principal::parse("218585377303").unwrap()
    }

    #[test]
    fn test_policy_json_shape() {
        let policy = PolicyDocument::for_state_bucket("tf-state", &principal());
        let value: serde_json::Value = serde_json::from_str(&policy.to_json().unwrap()).unwrap();

        assert_eq!(value["Version"], "2012-10-17");
        let statement = &value["Statement"][0];
        assert_eq!(statement["Effect"], "Allow");
        assert_eq!(
            statement["Principal"]["AWS"],
            "arn:aws:iam::218585377303:root"
        );
        assert_eq!(
            statement["Action"],
            serde_json::json!([
                "s3:ListBucket",
                "s3:GetObject",
                "s3:PutObject",
                "s3:DeleteObject"
            ])
        );
        assert_eq!(
            statement["Resource"],
            serde_json::json!(["arn:aws:s3:::tf-state", "arn:aws:s3:::tf-state/*"])
        );
    }

    #[test]
    fn test_policy_grants() {
        let policy = PolicyDocument::for_state_bucket("tf-state", &principal());
        assert!(policy.grants(&principal()));

        let other = Principal::parse("111111111111").unwrap();
        assert!(!policy.grants(&other));

        let mut narrowed = policy.clone();
        narrowed.statement[0].action.pop();
        assert!(!narrowed.grants(&principal()));
    }

    #[test]
    fn test_policy_follows_principal_partition() {
        let gov = Principal::parse("arn:aws-us-gov:iam::218585377303:role/deployer").unwrap();
        let policy = PolicyDocument::for_state_bucket("tf-state", &gov);

        assert_eq!(
            policy.statement[0].resource,
            vec![
                "arn:aws-us-gov:s3:::tf-state".to_string(),
                "arn:aws-us-gov:s3:::tf-state/*".to_string(),
            ]
        );
        assert!(policy.grants(&gov));
    }

    #[test]
    fn test_policy_is_deterministic() {
        let a = PolicyDocument::for_state_bucket("tf-state", &principal());
        let b = PolicyDocument::for_state_bucket("tf-state", &principal());
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }
}
