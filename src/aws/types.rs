//! AWS data types
//!
//! Plain data carried between the service wrappers and the CLI. Nothing
//! here holds an SDK client or type, so the pipeline and its tests can
//! use these without touching the network.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Policy language version AWS recommends for new policy documents.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Location of one object in the store: bucket plus object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse an object URL (supports s3:// and https:// formats)
    pub fn parse(url: &str) -> Option<Self> {
        // s3://bucket/key format
        if let Some(rest) = url.strip_prefix("s3://") {
            let parts: Vec<&str> = rest.splitn(2, '/').collect();
            if parts[0].is_empty() {
                return None;
            }
            return Some(ObjectRef {
                bucket: parts[0].to_string(),
                key: parts.get(1).unwrap_or(&"").to_string(),
            });
        }

        // https://bucket.s3.region.amazonaws.com/key format
        if url.starts_with("https://") || url.starts_with("http://") {
            if let Ok(parsed) = url::Url::parse(url) {
                if let Some(host) = parsed.host_str() {
                    // Virtual-hosted style: bucket.s3.region.amazonaws.com
                    if host.contains(".s3.") && host.ends_with(".amazonaws.com") {
                        let bucket = host.split(".s3.").next()?;
                        let key = parsed.path().trim_start_matches('/');
                        return Some(ObjectRef {
                            bucket: bucket.to_string(),
                            key: key.to_string(),
                        });
                    }
                    // Path style: s3.region.amazonaws.com/bucket/key
                    if host.starts_with("s3.") && host.ends_with(".amazonaws.com") {
                        let path = parsed.path().trim_start_matches('/');
                        let parts: Vec<&str> = path.splitn(2, '/').collect();
                        if parts[0].is_empty() {
                            return None;
                        }
                        return Some(ObjectRef {
                            bucket: parts[0].to_string(),
                            key: parts.get(1).unwrap_or(&"").to_string(),
                        });
                    }
                }
            }
        }

        None
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.key.is_empty() {
            write!(f, "s3://{}", self.bucket)
        } else {
            write!(f, "s3://{}/{}", self.bucket, self.key)
        }
    }
}

/// Represents an S3 bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketInfo {
    pub name: String,
    pub created: Option<DateTime<Utc>>,
}

/// Metadata of a KMS key as reported by the key service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyInfo {
    pub key_id: String,
    pub arn: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub enabled: bool,
    pub description: Option<String>,
}

/// Summary of an IAM user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub name: String,
    pub user_id: String,
    pub arn: String,
    pub created: Option<DateTime<Utc>>,
}

/// A freshly created access key pair. The secret is only ever returned by
/// the create call, so callers must surface it immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessKeyInfo {
    pub user_name: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub status: String,
}

/// Summary of a managed IAM policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySummary {
    pub name: Option<String>,
    pub arn: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

/// Effect of a policy statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyEffect {
    Allow,
    Deny,
}

/// One statement of an IAM policy document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: PolicyEffect,
    pub action: Vec<String>,
    pub resource: String,
}

/// An IAM policy document, serialized to the JSON form the identity
/// service expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// Single-statement document with the current policy language version.
    pub fn single(effect: PolicyEffect, actions: Vec<String>, resource: impl Into<String>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: vec![PolicyStatement {
                effect,
                action: actions,
                resource: resource.into(),
            }],
        }
    }
}
