//! In-memory backend used by the integration tests.
//!
//! Implements the full `StorageClient` trait over a `Mutex<HashMap>` store
//! and instruments the calls the tests assert on: invocation counters for
//! the empty-payload property, and an in-flight high-water mark for the
//! concurrency-ceiling property.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use rusty_object_storage_client::{
    ByteSource, ByteStream, ListPage, Metadata, ObjectDirectory, ObjectProperties, ObjectReference,
    StorageClient, StorageError, TransferConfig,
};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    metadata: Metadata,
}

#[derive(Default)]
struct State {
    base_directories: HashSet<String>,
    objects: HashMap<(String, String), StoredObject>,
}

/// Test backend with instrumentation counters.
#[derive(Default)]
pub struct MemoryStorageClient {
    state: Mutex<State>,
    pub put_calls: AtomicU64,
    pub multipart_calls: AtomicU64,
    pub copy_calls: AtomicU64,
    pub list_calls: AtomicU64,
    in_flight_copies: AtomicU64,
    pub max_in_flight_copies: AtomicU64,
    copy_delay_ms: u64,
    fail_copy_keys: Mutex<HashSet<String>>,
}

impl MemoryStorageClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay each copy long enough that concurrent copies overlap.
    pub fn with_copy_delay_ms(mut self, millis: u64) -> Self {
        self.copy_delay_ms = millis;
        self
    }

    /// Make copies of this source object fail.
    pub fn fail_copy_for(&self, reference: &ObjectReference) {
        self.fail_copy_keys
            .lock()
            .unwrap()
            .insert(reference.object_key());
    }

    /// Store an object directly, bypassing the counters.
    pub fn seed(&self, reference: &ObjectReference, data: &[u8]) {
        let mut state = self.state.lock().unwrap();
        state
            .base_directories
            .insert(reference.base_directory().to_string());
        state.objects.insert(
            (
                reference.base_directory().to_string(),
                reference.object_key(),
            ),
            StoredObject {
                data: data.to_vec(),
                metadata: Metadata::new(),
            },
        );
    }

    pub fn object_data(&self, reference: &ObjectReference) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(&(
                reference.base_directory().to_string(),
                reference.object_key(),
            ))
            .map(|stored| stored.data.clone())
    }

    pub fn object_count(&self, base_directory: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .objects
            .keys()
            .filter(|(base, _)| base == base_directory)
            .count()
    }

    async fn collect(source: ByteSource) -> Result<Vec<u8>, StorageError> {
        match source {
            ByteSource::Buffer(bytes) => Ok(bytes.to_vec()),
            ByteSource::Stream { mut stream, .. } => {
                let mut data: Vec<u8> = Vec::new();
                while let Some(chunk) = stream.next().await {
                    data.extend_from_slice(&chunk?);
                }
                Ok(data)
            }
        }
    }

    fn store(
        &self,
        reference: &ObjectReference,
        data: Vec<u8>,
        metadata: Option<&Metadata>,
    ) {
        let mut state = self.state.lock().unwrap();
        state
            .base_directories
            .insert(reference.base_directory().to_string());
        state.objects.insert(
            (
                reference.base_directory().to_string(),
                reference.object_key(),
            ),
            StoredObject {
                data,
                metadata: metadata.cloned().unwrap_or_default(),
            },
        );
    }

    fn not_found(reference: &ObjectReference) -> StorageError {
        StorageError::NotFound {
            base_directory: reference.base_directory().to_string(),
            key: reference.object_key(),
        }
    }
}

#[async_trait]
impl StorageClient for MemoryStorageClient {
    async fn put_object(
        &self,
        reference: &ObjectReference,
        source: ByteSource,
        metadata: Option<&Metadata>,
    ) -> Result<(), StorageError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        let data: Vec<u8> = Self::collect(source).await?;
        self.store(reference, data, metadata);
        Ok(())
    }

    async fn put_object_multipart(
        &self,
        reference: &ObjectReference,
        source: ByteSource,
        _part_size: Option<u64>,
        _queue_size: Option<usize>,
        metadata: Option<&Metadata>,
    ) -> Result<(), StorageError> {
        self.multipart_calls.fetch_add(1, Ordering::SeqCst);
        let data: Vec<u8> = Self::collect(source).await?;
        self.store(reference, data, metadata);
        Ok(())
    }

    async fn get_object(&self, reference: &ObjectReference) -> Result<ByteStream, StorageError> {
        let data: Vec<u8> = self
            .object_data(reference)
            .ok_or_else(|| Self::not_found(reference))?;
        Ok(futures::stream::once(async move { Ok(Bytes::from(data)) }).boxed())
    }

    async fn get_object_properties(
        &self,
        reference: &ObjectReference,
    ) -> Result<ObjectProperties, StorageError> {
        let state = self.state.lock().unwrap();
        let stored: &StoredObject = state
            .objects
            .get(&(
                reference.base_directory().to_string(),
                reference.object_key(),
            ))
            .ok_or_else(|| Self::not_found(reference))?;
        Ok(ObjectProperties {
            size: stored.data.len() as u64,
            user_metadata: stored.metadata.clone(),
            ..Default::default()
        })
    }

    async fn object_exists(&self, reference: &ObjectReference) -> Result<bool, StorageError> {
        Ok(self.object_data(reference).is_some())
    }

    async fn base_directory_exists(&self, base_directory: &str) -> Result<bool, StorageError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .base_directories
            .contains(base_directory))
    }

    async fn create_base_directory(&self, base_directory: &str) -> Result<(), StorageError> {
        self.state
            .lock()
            .unwrap()
            .base_directories
            .insert(base_directory.to_string());
        Ok(())
    }

    async fn delete_object(&self, reference: &ObjectReference) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state
            .objects
            .remove(&(
                reference.base_directory().to_string(),
                reference.object_key(),
            ))
            .map(|_| ())
            .ok_or_else(|| Self::not_found(reference))
    }

    async fn delete_base_directory(&self, base_directory: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        if !state.base_directories.remove(base_directory) {
            return Err(StorageError::NotFound {
                base_directory: base_directory.to_string(),
                key: String::new(),
            });
        }
        state.objects.retain(|(base, _), _| base != base_directory);
        Ok(())
    }

    async fn copy_object(
        &self,
        source: &ObjectReference,
        target: &ObjectReference,
    ) -> Result<(), StorageError> {
        self.copy_calls.fetch_add(1, Ordering::SeqCst);
        let in_flight: u64 = self.in_flight_copies.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight_copies
            .fetch_max(in_flight, Ordering::SeqCst);

        if self.copy_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.copy_delay_ms)).await;
        }

        let result: Result<(), StorageError> = if self
            .fail_copy_keys
            .lock()
            .unwrap()
            .contains(&source.object_key())
        {
            Err(StorageError::NetworkError {
                message: format!("injected failure for {}", source.object_key()),
                retryable: false,
            })
        } else {
            match self.object_data(source) {
                Some(data) => {
                    self.store(target, data, None);
                    Ok(())
                }
                None => Err(Self::not_found(source)),
            }
        };

        self.in_flight_copies.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn list_page(
        &self,
        directory: &ObjectDirectory,
        continuation: Option<&str>,
        max_page_size: usize,
    ) -> Result<ListPage<ObjectReference>, StorageError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let prefix: String = match directory.relative_directory() {
            Some(dir) => format!("{}/", dir),
            None => String::new(),
        };

        let mut keys: Vec<String> = {
            let state = self.state.lock().unwrap();
            state
                .objects
                .keys()
                .filter(|(base, key)| {
                    base == directory.base_directory() && key.starts_with(&prefix)
                })
                .map(|(_, key)| key.clone())
                .collect()
        };
        keys.sort();

        let offset: usize = continuation.map(|token| token.parse().unwrap()).unwrap_or(0);
        let page: Vec<ObjectReference> = keys
            .iter()
            .skip(offset)
            .take(max_page_size)
            .map(|key| ObjectReference::from_key(directory.base_directory(), key).unwrap())
            .collect();
        let next_offset: usize = offset + page.len();

        Ok(ListPage {
            entities: page,
            continuation: (next_offset < keys.len()).then(|| next_offset.to_string()),
        })
    }

    async fn upload_url(
        &self,
        reference: &ObjectReference,
        _expires_in: Duration,
    ) -> Result<String, StorageError> {
        Ok(format!("https://mock.invalid/upload/{}", reference))
    }

    async fn download_url(
        &self,
        reference: &ObjectReference,
        _expires_in: Duration,
    ) -> Result<String, StorageError> {
        Ok(format!("https://mock.invalid/download/{}", reference))
    }

    async fn upload_config(
        &self,
        directory: &ObjectDirectory,
        expires_in: Duration,
    ) -> Result<TransferConfig, StorageError> {
        Ok(TransferConfig {
            base_url: format!("https://mock.invalid/{}", directory.base_directory()),
            expiration: SystemTime::now() + expires_in,
            credentials: None,
        })
    }

    async fn download_config(
        &self,
        directory: &ObjectDirectory,
        expires_in: Duration,
    ) -> Result<TransferConfig, StorageError> {
        Ok(TransferConfig {
            base_url: format!("https://mock.invalid/{}", directory.base_directory()),
            expiration: SystemTime::now() + expires_in,
            credentials: None,
        })
    }
}
