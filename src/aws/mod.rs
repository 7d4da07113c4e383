//! AWS client wrapper module
//!
//! This module provides the AWS functionality the tool uses:
//! - [`kms::KmsClient`] - Encrypt/decrypt and key administration
//! - [`s3::S3Client`] - Object upload/download and bucket administration
//! - [`iam::IamClient`] - User, access key and policy administration
//! - [`types`] - Plain data types (ObjectRef, KeyInfo, PolicyDocument, ...)
//!
//! All three clients are built from one [`SdkConfig`] produced by
//! [`AwsSettings::load`], so region, endpoint and credentials resolve the
//! same way everywhere.

pub mod iam;
pub mod kms;
pub mod s3;
pub mod types;

// Re-export commonly used types
pub use iam::IamClient;
pub use kms::KmsClient;
pub use s3::S3Client;
pub use types::{
    AccessKeyInfo, BucketInfo, KeyInfo, ObjectRef, PolicyDocument, PolicyEffect, PolicyStatement,
    PolicySummary, UserSummary,
};

use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::config::{Credentials, Region};

/// Connection settings shared by all service clients.
///
/// Every field is optional; unset fields fall back to the SDK default
/// resolution chain (environment, shared config files, instance metadata).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AwsSettings {
    pub profile: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl AwsSettings {
    /// Resolve these settings into the shared SDK configuration.
    pub async fn load(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }
        if let (Some(key), Some(secret)) = (&self.access_key_id, &self.secret_access_key) {
            loader = loader
                .credentials_provider(Credentials::new(key.clone(), secret.clone(), None, None, "kms-vault"));
        }
        loader.load().await
    }
}
