//! The capability interface implemented by each storage backend.
//!
//! Backends implement [`StorageClient`] once; everything above it - the
//! transfer normalizer, multipart coordinator, page iterator, and copy
//! orchestrator - is written generically against this trait. The methods
//! map one-to-one onto backend SDK primitives and contain no cross-cutting
//! logic of their own.

use std::time::Duration;

use async_trait::async_trait;

use rusty_object_storage_common::{ObjectDirectory, ObjectReference};

use crate::error::StorageError;
use crate::types::{
    ByteSource, ByteStream, ListPage, Metadata, ObjectProperties, TransferConfig,
};

/// Callback trait for directory-copy progress reporting.
pub trait ProgressCallback: Send + Sync {
    /// Called with progress updates.
    /// Returns false to cancel the operation.
    fn on_progress(&self, progress: &CopyProgress) -> bool;
}

/// Snapshot of directory-copy progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyProgress {
    /// Objects enumerated from the source directory so far.
    pub objects_listed: u64,
    /// Objects copied so far.
    pub objects_copied: u64,
    /// Objects the predicate filtered out so far.
    pub objects_skipped: u64,
    /// Objects that failed so far.
    pub objects_failed: u64,
}

/// Low-level storage operations - implemented by each backend.
///
/// Every method is a suspension point; nothing here blocks. Implementations
/// surface backend errors as-is (classified into [`StorageError`]) and do
/// not retry; retry and timeout policy belong to the backend SDK.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Store an object from a normalized source.
    async fn put_object(
        &self,
        reference: &ObjectReference,
        source: ByteSource,
        metadata: Option<&Metadata>,
    ) -> Result<(), StorageError>;

    /// Store an object through the backend's multipart primitive.
    ///
    /// `part_size` and `queue_size` are advisory; backends substitute their
    /// own defaults when absent.
    async fn put_object_multipart(
        &self,
        reference: &ObjectReference,
        source: ByteSource,
        part_size: Option<u64>,
        queue_size: Option<usize>,
        metadata: Option<&Metadata>,
    ) -> Result<(), StorageError>;

    /// Fetch an object as a byte stream.
    async fn get_object(&self, reference: &ObjectReference) -> Result<ByteStream, StorageError>;

    /// Fetch an object's properties without its payload.
    async fn get_object_properties(
        &self,
        reference: &ObjectReference,
    ) -> Result<ObjectProperties, StorageError>;

    /// Check whether an object exists.
    async fn object_exists(&self, reference: &ObjectReference) -> Result<bool, StorageError>;

    /// Check whether a base directory exists.
    async fn base_directory_exists(&self, base_directory: &str) -> Result<bool, StorageError>;

    /// Create a base directory. Creating one that already exists succeeds.
    async fn create_base_directory(&self, base_directory: &str) -> Result<(), StorageError>;

    /// Delete an object.
    ///
    /// Implementations report a missing object as [`StorageError::NotFound`];
    /// the idempotent-delete policy lives in the core, not here.
    async fn delete_object(&self, reference: &ObjectReference) -> Result<(), StorageError>;

    /// Delete a base directory and everything in it.
    async fn delete_base_directory(&self, base_directory: &str) -> Result<(), StorageError>;

    /// Copy one object to another reference within this backend.
    async fn copy_object(
        &self,
        source: &ObjectReference,
        target: &ObjectReference,
    ) -> Result<(), StorageError>;

    /// Fetch one listing page for a directory.
    ///
    /// `continuation` is the opaque token from the previous page, absent for
    /// the first page. At most `max_page_size` entities are returned.
    async fn list_page(
        &self,
        directory: &ObjectDirectory,
        continuation: Option<&str>,
        max_page_size: usize,
    ) -> Result<ListPage<ObjectReference>, StorageError>;

    /// Presign a URL authorizing an upload of `reference`.
    async fn upload_url(
        &self,
        reference: &ObjectReference,
        expires_in: Duration,
    ) -> Result<String, StorageError>;

    /// Presign a URL authorizing a download of `reference`.
    async fn download_url(
        &self,
        reference: &ObjectReference,
        expires_in: Duration,
    ) -> Result<String, StorageError>;

    /// Issue a time-bounded config authorizing uploads into `directory`.
    async fn upload_config(
        &self,
        directory: &ObjectDirectory,
        expires_in: Duration,
    ) -> Result<TransferConfig, StorageError>;

    /// Issue a time-bounded config authorizing downloads from `directory`.
    async fn download_config(
        &self,
        directory: &ObjectDirectory,
        expires_in: Duration,
    ) -> Result<TransferConfig, StorageError>;
}
