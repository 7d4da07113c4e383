//! AWS S3 client wrapper

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;

use crate::aws::types::{BucketInfo, ObjectRef};
use crate::error::ObjectStoreError;
use crate::pipeline::ObjectStore;

/// S3 client wrapper with blob transfer and bucket administration.
pub struct S3Client {
    client: Client,
    current_region: String,
}

impl S3Client {
    /// Create a new S3 client from the shared SDK configuration.
    ///
    /// Path-style addressing is needed by most non-AWS endpoints (MinIO,
    /// LocalStack), which do not resolve virtual-hosted bucket names.
    pub fn new(config: &SdkConfig, force_path_style: bool) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(config);
        if force_path_style {
            builder = builder.force_path_style(true);
        }

        let current_region = config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "us-east-1".to_string());

        Self {
            client: Client::from_conf(builder.build()),
            current_region,
        }
    }

    /// List all accessible buckets
    pub async fn list_buckets(&self) -> Result<Vec<BucketInfo>, ObjectStoreError> {
        let response = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| ObjectStoreError::ListBuckets { source: e.into() })?;

        let buckets = response
            .buckets()
            .iter()
            .map(|b| BucketInfo {
                name: b.name().unwrap_or_default().to_string(),
                created: b.creation_date().map(|d| {
                    chrono::DateTime::from_timestamp(d.secs(), d.subsec_nanos())
                        .unwrap_or_default()
                }),
            })
            .collect();

        Ok(buckets)
    }

    /// Create a bucket in the current region.
    pub async fn create_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        let mut request = self.client.create_bucket().bucket(bucket);

        // us-east-1 is the one region that rejects an explicit location
        // constraint.
        if self.current_region != "us-east-1" {
            let constraint = BucketLocationConstraint::from(self.current_region.as_str());
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(constraint)
                    .build(),
            );
        }

        request
            .send()
            .await
            .map_err(|e| ObjectStoreError::CreateBucket {
                bucket: bucket.to_string(),
                source: e.into(),
            })?;

        Ok(())
    }

    /// Get the current region
    pub fn region(&self) -> &str {
        &self.current_region
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    /// Upload bytes as an object, replacing any existing object under the
    /// same key.
    async fn upload(&self, object: &ObjectRef, data: Vec<u8>) -> Result<(), ObjectStoreError> {
        self.client
            .put_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .body(data.into())
            .send()
            .await
            .map_err(|e| ObjectStoreError::Upload {
                object: object.clone(),
                source: e.into(),
            })?;

        Ok(())
    }

    /// Download an object to bytes
    async fn download(&self, object: &ObjectRef) -> Result<Vec<u8>, ObjectStoreError> {
        let response = self
            .client
            .get_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Download {
                object: object.clone(),
                source: e.into(),
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| ObjectStoreError::ReadBody {
                object: object.clone(),
                source: e.into(),
            })?;

        Ok(data.into_bytes().to_vec())
    }

    /// Check whether an object exists without downloading it.
    async fn exists(&self, object: &ObjectRef) -> Result<bool, ObjectStoreError> {
        match self
            .client
            .head_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(err)) if err.err().is_not_found() => Ok(false),
            Err(e) => Err(ObjectStoreError::Head {
                object: object.clone(),
                source: e.into(),
            }),
        }
    }
}
