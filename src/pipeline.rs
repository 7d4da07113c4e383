//! Encrypt-upload / download-decrypt orchestration
//!
//! [`Pipeline`] sequences the local file store, the key service and the
//! object store. Stages run strictly in order and a failed stage aborts
//! the operation; there is no retry and no rollback of stages already
//! completed.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use crate::aws::types::ObjectRef;
use crate::error::{KeyServiceError, ObjectStoreError, VaultError};
use crate::files::{self, PathSet};

/// Remote key service contract used by the pipeline.
#[async_trait]
pub trait KeyService: Send + Sync {
    /// Encrypt plaintext under the given key id or ARN.
    async fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, KeyServiceError>;

    /// Decrypt a ciphertext blob produced by [`encrypt`](Self::encrypt).
    /// The key identity is recovered from the blob itself.
    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, KeyServiceError>;
}

/// Remote object store contract used by the pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes under the object's key, overwriting any existing object.
    async fn upload(&self, object: &ObjectRef, data: Vec<u8>) -> Result<(), ObjectStoreError>;

    /// Retrieve the full object body.
    async fn download(&self, object: &ObjectRef) -> Result<Vec<u8>, ObjectStoreError>;

    /// Check whether the object exists.
    async fn exists(&self, object: &ObjectRef) -> Result<bool, ObjectStoreError>;
}

/// Sequences the vault operations over one configured object and path set.
pub struct Pipeline<K, O> {
    keys: K,
    store: O,
    key_id: String,
    object: ObjectRef,
    paths: PathSet,
}

impl<K: KeyService, O: ObjectStore> Pipeline<K, O> {
    pub fn new(
        keys: K,
        store: O,
        key_id: impl Into<String>,
        object: ObjectRef,
        paths: PathSet,
    ) -> Self {
        Self {
            keys,
            store,
            key_id: key_id.into(),
            object,
            paths,
        }
    }

    /// The object the pipeline reads and writes.
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    /// The local paths the pipeline reads and writes.
    pub fn paths(&self) -> &PathSet {
        &self.paths
    }

    /// Read the plaintext file, encrypt it, stage the ciphertext locally,
    /// then upload the ciphertext to the object store.
    ///
    /// The plaintext read happens before any remote call, so a missing
    /// source file aborts without touching the network.
    pub async fn encrypt_and_upload(&self) -> Result<(), VaultError> {
        let plaintext = files::read(&self.paths.plaintext)?;
        let ciphertext = self.keys.encrypt(&self.key_id, &plaintext).await?;
        // The plaintext is released as soon as its ciphertext exists.
        drop(plaintext);

        files::write(&self.paths.encrypted, &ciphertext)?;
        info!(
            "encrypted {} -> {} ({} bytes)",
            self.paths.plaintext.display(),
            self.paths.encrypted.display(),
            ciphertext.len()
        );

        self.store.upload(&self.object, ciphertext).await?;
        info!("uploaded {}", self.object);

        Ok(())
    }

    /// Download the ciphertext object, persist the raw blob locally, then
    /// decrypt it and write the plaintext output.
    ///
    /// The blob already in memory is what gets decrypted; the persisted
    /// copy is an audit artifact, not re-read.
    pub async fn download_and_decrypt(&self) -> Result<(), VaultError> {
        let blob = self.store.download(&self.object).await?;
        files::write(&self.paths.downloaded, &blob)?;
        info!(
            "downloaded {} -> {} ({} bytes)",
            self.object,
            self.paths.downloaded.display(),
            blob.len()
        );

        let plaintext = self.keys.decrypt(&blob).await?;
        drop(blob);

        files::write(&self.paths.decrypted, &plaintext)?;
        info!("decrypted to {}", self.paths.decrypted.display());

        Ok(())
    }

    /// Full round trip: encrypt and upload, then download and decrypt.
    pub async fn run(&self) -> Result<(), VaultError> {
        self.encrypt_and_upload().await?;
        self.download_and_decrypt().await
    }
}

const MASK_BYTE: u8 = 0xA5;

/// In-memory key service for tests and smoke runs. The masking is not
/// cryptography; it only guarantees the ciphertext differs from the
/// plaintext while the key identity still travels inside the blob.
#[derive(Debug, Default, Clone)]
pub struct MemoryKeyService {
    inner: Arc<MemoryKeyInner>,
}

#[derive(Debug, Default)]
struct MemoryKeyInner {
    keys: Mutex<HashSet<String>>,
    encrypt_calls: AtomicUsize,
    decrypt_calls: AtomicUsize,
}

impl MemoryKeyService {
    /// Service that recognizes a single key id.
    pub fn with_key(key_id: impl Into<String>) -> Self {
        let mut keys = HashSet::new();
        keys.insert(key_id.into());
        Self {
            inner: Arc::new(MemoryKeyInner {
                keys: Mutex::new(keys),
                encrypt_calls: AtomicUsize::new(0),
                decrypt_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Number of encrypt calls received so far.
    pub fn encrypt_calls(&self) -> usize {
        self.inner.encrypt_calls.load(Ordering::SeqCst)
    }

    /// Number of decrypt calls received so far.
    pub fn decrypt_calls(&self) -> usize {
        self.inner.decrypt_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyService for MemoryKeyService {
    async fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, KeyServiceError> {
        self.inner.encrypt_calls.fetch_add(1, Ordering::SeqCst);

        let keys = self.inner.keys.lock().map_err(|err| KeyServiceError::Encrypt {
            key_id: key_id.to_string(),
            source: format!("lock poisoned: {err}").into(),
        })?;
        if !keys.contains(key_id) {
            return Err(KeyServiceError::Encrypt {
                key_id: key_id.to_string(),
                source: "no such key".into(),
            });
        }

        // Blob layout: [key id length, u16 BE][key id][masked payload].
        let id = key_id.as_bytes();
        let id_len = u16::try_from(id.len()).map_err(|_| KeyServiceError::Encrypt {
            key_id: key_id.to_string(),
            source: "key id does not fit the blob header".into(),
        })?;
        let mut out = Vec::with_capacity(2 + id.len() + plaintext.len());
        out.extend_from_slice(&id_len.to_be_bytes());
        out.extend_from_slice(id);
        out.extend(plaintext.iter().map(|b| b ^ MASK_BYTE));
        Ok(out)
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, KeyServiceError> {
        self.inner.decrypt_calls.fetch_add(1, Ordering::SeqCst);

        let header_err = || KeyServiceError::Decrypt {
            source: "malformed ciphertext header".into(),
        };
        if ciphertext.len() < 2 {
            return Err(header_err());
        }
        let id_len = u16::from_be_bytes([ciphertext[0], ciphertext[1]]) as usize;
        let id_bytes = ciphertext.get(2..2 + id_len).ok_or_else(header_err)?;
        let key_id = std::str::from_utf8(id_bytes).map_err(|_| header_err())?;

        let keys = self.inner.keys.lock().map_err(|err| KeyServiceError::Decrypt {
            source: format!("lock poisoned: {err}").into(),
        })?;
        if !keys.contains(key_id) {
            return Err(KeyServiceError::Decrypt {
                source: format!("ciphertext names unknown key {key_id}").into(),
            });
        }

        // XOR twice restores the original.
        Ok(ciphertext[2 + id_len..].iter().map(|b| b ^ MASK_BYTE).collect())
    }
}

/// In-memory object store for tests and smoke runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryObjectStore {
    inner: Arc<MemoryStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    uploads: AtomicUsize,
    downloads: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of uploads received so far.
    pub fn uploads(&self) -> usize {
        self.inner.uploads.load(Ordering::SeqCst)
    }

    /// Number of downloads received so far.
    pub fn downloads(&self) -> usize {
        self.inner.downloads.load(Ordering::SeqCst)
    }

    /// The stored bytes for an object, if present.
    pub fn object(&self, object: &ObjectRef) -> Option<Vec<u8>> {
        self.inner.objects.lock().ok()?.get(&object.to_string()).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, object: &ObjectRef, data: Vec<u8>) -> Result<(), ObjectStoreError> {
        self.inner.uploads.fetch_add(1, Ordering::SeqCst);

        let mut objects = self.inner.objects.lock().map_err(|err| ObjectStoreError::Upload {
            object: object.clone(),
            source: format!("lock poisoned: {err}").into(),
        })?;
        objects.insert(object.to_string(), data);
        Ok(())
    }

    async fn download(&self, object: &ObjectRef) -> Result<Vec<u8>, ObjectStoreError> {
        self.inner.downloads.fetch_add(1, Ordering::SeqCst);

        let objects = self.inner.objects.lock().map_err(|err| ObjectStoreError::Download {
            object: object.clone(),
            source: format!("lock poisoned: {err}").into(),
        })?;
        objects
            .get(&object.to_string())
            .cloned()
            .ok_or_else(|| ObjectStoreError::Download {
                object: object.clone(),
                source: "no such object".into(),
            })
    }

    async fn exists(&self, object: &ObjectRef) -> Result<bool, ObjectStoreError> {
        let objects = self.inner.objects.lock().map_err(|err| ObjectStoreError::Head {
            object: object.clone(),
            source: format!("lock poisoned: {err}").into(),
        })?;
        Ok(objects.contains_key(&object.to_string()))
    }
}
