//! Error taxonomy
//!
//! One error enum per backing service (local files, KMS, S3, IAM) plus
//! [`VaultError`], the union the pipeline operations return. SDK failures
//! are kept as `source()` chains rather than flattened to strings.

use std::path::PathBuf;

use thiserror::Error;

use crate::aws::types::ObjectRef;

/// Boxed source error, used to carry SDK errors without naming every
/// generated operation error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Local file I/O failure.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Remote key-service operation failure.
#[derive(Debug, Error)]
pub enum KeyServiceError {
    #[error("encrypt under key {key_id} failed")]
    Encrypt {
        key_id: String,
        #[source]
        source: BoxError,
    },

    #[error("decrypt failed")]
    Decrypt {
        #[source]
        source: BoxError,
    },

    #[error("key creation failed")]
    CreateKey {
        #[source]
        source: BoxError,
    },

    #[error("disabling key {key_id} failed")]
    DisableKey {
        key_id: String,
        #[source]
        source: BoxError,
    },

    /// The call succeeded but the response lacked a field the operation
    /// depends on (ciphertext, plaintext or key metadata).
    #[error("key service response missing {field}")]
    MissingField { field: &'static str },
}

/// Remote object-store operation failure.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("upload of {object} failed")]
    Upload {
        object: ObjectRef,
        #[source]
        source: BoxError,
    },

    #[error("download of {object} failed")]
    Download {
        object: ObjectRef,
        #[source]
        source: BoxError,
    },

    #[error("reading body of {object} failed")]
    ReadBody {
        object: ObjectRef,
        #[source]
        source: BoxError,
    },

    #[error("existence check for {object} failed")]
    Head {
        object: ObjectRef,
        #[source]
        source: BoxError,
    },

    #[error("creating bucket {bucket} failed")]
    CreateBucket {
        bucket: String,
        #[source]
        source: BoxError,
    },

    #[error("listing buckets failed")]
    ListBuckets {
        #[source]
        source: BoxError,
    },
}

/// Identity-service (user/policy) operation failure.
#[derive(Debug, Error)]
pub enum IdentityServiceError {
    #[error("user {name} does not exist")]
    NoSuchUser { name: String },

    #[error("policy {arn} does not exist")]
    NoSuchPolicy { arn: String },

    #[error("creating user {name} failed")]
    CreateUser {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("looking up user {name} failed")]
    GetUser {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("deleting user {name} failed")]
    DeleteUser {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("listing users failed")]
    ListUsers {
        #[source]
        source: BoxError,
    },

    #[error("creating access key for {name} failed")]
    CreateAccessKey {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("creating policy {name} failed")]
    CreatePolicy {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("looking up policy {arn} failed")]
    GetPolicy {
        arn: String,
        #[source]
        source: BoxError,
    },

    #[error("deleting policy {arn} failed")]
    DeletePolicy {
        arn: String,
        #[source]
        source: BoxError,
    },

    #[error("encoding policy document failed")]
    EncodePolicy {
        #[source]
        source: serde_json::Error,
    },

    #[error("identity service response missing {field}")]
    MissingField { field: &'static str },
}

/// Union of the stage errors a pipeline operation can surface. Callers
/// decide whether to abort, retry or log; nothing below `main` terminates
/// the process.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    KeyService(#[from] KeyServiceError),

    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),

    #[error(transparent)]
    Identity(#[from] IdentityServiceError),
}
