//! AWS KMS client wrapper

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_kms::primitives::Blob;
use aws_sdk_kms::types::{KeyMetadata, Tag};
use aws_sdk_kms::Client;

use crate::aws::types::KeyInfo;
use crate::error::KeyServiceError;
use crate::pipeline::KeyService;

/// KMS client wrapper with encrypt/decrypt and key administration.
pub struct KmsClient {
    client: Client,
}

impl KmsClient {
    /// Create a new KMS client from the shared SDK configuration.
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    /// Create a symmetric key, optionally tagged.
    pub async fn create_key(&self, tags: &[(String, String)]) -> Result<KeyInfo, KeyServiceError> {
        let mut request = self.client.create_key();
        for (key, value) in tags {
            let tag = Tag::builder()
                .tag_key(key.clone())
                .tag_value(value.clone())
                .build()
                .map_err(|e| KeyServiceError::CreateKey { source: e.into() })?;
            request = request.tags(tag);
        }

        let response = request
            .send()
            .await
            .map_err(|e| KeyServiceError::CreateKey { source: e.into() })?;

        let metadata = response
            .key_metadata
            .ok_or(KeyServiceError::MissingField {
                field: "key metadata",
            })?;

        Ok(summarize_key(&metadata))
    }

    /// Disable a key. Encrypt and decrypt calls under it fail until it is
    /// re-enabled.
    pub async fn disable_key(&self, key_id: &str) -> Result<(), KeyServiceError> {
        self.client
            .disable_key()
            .key_id(key_id)
            .send()
            .await
            .map_err(|e| KeyServiceError::DisableKey {
                key_id: key_id.to_string(),
                source: e.into(),
            })?;

        Ok(())
    }
}

#[async_trait]
impl KeyService for KmsClient {
    /// Encrypt plaintext under the given key id or ARN.
    async fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, KeyServiceError> {
        let response = self
            .client
            .encrypt()
            .key_id(key_id)
            .plaintext(Blob::new(plaintext))
            .send()
            .await
            .map_err(|e| KeyServiceError::Encrypt {
                key_id: key_id.to_string(),
                source: e.into(),
            })?;

        let blob = response
            .ciphertext_blob
            .ok_or(KeyServiceError::MissingField {
                field: "ciphertext blob",
            })?;

        Ok(blob.into_inner())
    }

    /// Decrypt a ciphertext blob. The key identity travels inside the blob,
    /// so no key id is passed.
    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, KeyServiceError> {
        let response = self
            .client
            .decrypt()
            .ciphertext_blob(Blob::new(ciphertext))
            .send()
            .await
            .map_err(|e| KeyServiceError::Decrypt { source: e.into() })?;

        let blob = response.plaintext.ok_or(KeyServiceError::MissingField {
            field: "plaintext",
        })?;

        Ok(blob.into_inner())
    }
}

fn summarize_key(metadata: &KeyMetadata) -> KeyInfo {
    KeyInfo {
        key_id: metadata.key_id().to_string(),
        arn: metadata.arn().map(|s| s.to_string()),
        created: metadata.creation_date().map(|d| {
            chrono::DateTime::from_timestamp(d.secs(), d.subsec_nanos()).unwrap_or_default()
        }),
        // `enabled` is a plain bool in the KMS model, defaulting to false.
        enabled: metadata.enabled(),
        description: metadata.description().map(|s| s.to_string()),
    }
}
