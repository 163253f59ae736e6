//! The public client surface.
//!
//! [`ObjectStorage`] wraps one backend behind the [`StorageClient`]
//! capability trait and exposes the operations callers address objects
//! with. Results keep the shape of their inputs: a download comes back in
//! the shape the caller selected, a listing is a lazy stream of
//! references, a directory copy resolves to statistics or rejects with the
//! failure policy's error.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use log::debug;

use rusty_object_storage_common::{ObjectDirectory, ObjectReference, DEFAULT_MAX_PAGE_SIZE};

use crate::copy::{CopyOrchestrator, CopyPredicate, CopyTarget};
use crate::error::StorageError;
use crate::multipart;
use crate::traits::{ProgressCallback, StorageClient};
use crate::transfer;
use crate::types::{
    ByteSource, CopyOptions, CopyStatistics, ExpiryOptions, Metadata, MultipartUploadData,
    MultipartUploadOptions, ObjectProperties, TransferConfig, TransferData, TransferTarget,
};

/// A provider-agnostic object storage client.
#[derive(Clone)]
pub struct ObjectStorage {
    client: Arc<dyn StorageClient>,
}

impl ObjectStorage {
    /// Create a client over the given backend.
    pub fn new(client: Arc<dyn StorageClient>) -> Self {
        Self { client }
    }

    /// The underlying backend client.
    pub fn client(&self) -> &Arc<dyn StorageClient> {
        &self.client
    }

    /// Upload an object from any payload shape.
    ///
    /// An empty local file is rejected before any backend call.
    pub async fn upload(
        &self,
        reference: &ObjectReference,
        data: TransferData,
        metadata: Option<&Metadata>,
    ) -> Result<(), StorageError> {
        let source: ByteSource = transfer::resolve_upload_source(data).await?;
        self.client.put_object(reference, source, metadata).await
    }

    /// Upload an object in multiple parts.
    ///
    /// Accepts only stream and local-file payloads; an empty local file is
    /// rejected before any backend call.
    pub async fn upload_in_multiple_parts(
        &self,
        reference: &ObjectReference,
        data: MultipartUploadData,
        options: MultipartUploadOptions,
    ) -> Result<(), StorageError> {
        multipart::upload_in_multiple_parts(self.client.as_ref(), reference, data, options).await
    }

    /// Download an object in the caller-selected shape.
    ///
    /// A local-file target with an empty path is rejected before any
    /// backend call.
    pub async fn download(
        &self,
        reference: &ObjectReference,
        target: TransferTarget,
    ) -> Result<TransferData, StorageError> {
        if let TransferTarget::LocalFile(ref path) = target {
            if path.as_os_str().is_empty() {
                return Err(StorageError::MissingLocalPath);
            }
        }
        let stream = self.client.get_object(reference).await?;
        transfer::resolve_download_target(stream, target).await
    }

    /// Lazily list every object under a directory.
    ///
    /// Pages of up to `max_page_size` entries (default 1000) are fetched on
    /// demand and flattened into a stream of references, in backend order.
    pub fn list_objects(
        &self,
        directory: &ObjectDirectory,
        max_page_size: Option<usize>,
    ) -> BoxStream<'static, Result<ObjectReference, StorageError>> {
        let client: Arc<dyn StorageClient> = Arc::clone(&self.client);
        let directory: ObjectDirectory = directory.clone();
        let max_page_size: usize = max_page_size.unwrap_or(DEFAULT_MAX_PAGE_SIZE);

        crate::list::entities(move |continuation: Option<String>| {
            let client = Arc::clone(&client);
            let directory = directory.clone();
            async move {
                client
                    .list_page(&directory, continuation.as_deref(), max_page_size)
                    .await
            }
        })
        .boxed()
    }

    /// Copy every object under a directory to a target.
    ///
    /// See [`CopyOrchestrator`] for the concurrency and failure-policy
    /// contract.
    pub async fn copy_directory(
        &self,
        source: &ObjectDirectory,
        target: &CopyTarget,
        predicate: Option<&CopyPredicate>,
        options: CopyOptions,
    ) -> Result<CopyStatistics, StorageError> {
        CopyOrchestrator::new(self.client.as_ref())
            .with_options(options)
            .copy_directory(source, target, predicate)
            .await
    }

    /// Copy a directory while reporting progress.
    ///
    /// The callback returning false cancels the run with
    /// [`StorageError::Cancelled`].
    pub async fn copy_directory_with_progress(
        &self,
        source: &ObjectDirectory,
        target: &CopyTarget,
        predicate: Option<&CopyPredicate>,
        options: CopyOptions,
        progress: &dyn ProgressCallback,
    ) -> Result<CopyStatistics, StorageError> {
        CopyOrchestrator::new(self.client.as_ref())
            .with_options(options)
            .with_progress(progress)
            .copy_directory(source, target, predicate)
            .await
    }

    /// Delete an object. Deleting an absent object succeeds.
    pub async fn delete_object(&self, reference: &ObjectReference) -> Result<(), StorageError> {
        match self.client.delete_object(reference).await {
            Err(error) if error.is_not_found() => {
                debug!("Delete of absent object {} ignored", reference);
                Ok(())
            }
            result => result,
        }
    }

    /// Delete a base directory and everything in it. Deleting an absent
    /// base directory succeeds.
    pub async fn delete_base_directory(&self, base_directory: &str) -> Result<(), StorageError> {
        match self.client.delete_base_directory(base_directory).await {
            Err(error) if error.is_not_found() => {
                debug!("Delete of absent base directory {} ignored", base_directory);
                Ok(())
            }
            result => result,
        }
    }

    /// Create a base directory.
    pub async fn create_base_directory(&self, base_directory: &str) -> Result<(), StorageError> {
        self.client.create_base_directory(base_directory).await
    }

    /// Check whether an object exists.
    pub async fn object_exists(&self, reference: &ObjectReference) -> Result<bool, StorageError> {
        self.client.object_exists(reference).await
    }

    /// Check whether a base directory exists.
    pub async fn base_directory_exists(&self, base_directory: &str) -> Result<bool, StorageError> {
        self.client.base_directory_exists(base_directory).await
    }

    /// Fetch an object's properties without its payload.
    pub async fn object_properties(
        &self,
        reference: &ObjectReference,
    ) -> Result<ObjectProperties, StorageError> {
        self.client.get_object_properties(reference).await
    }

    /// Presign a URL authorizing an upload.
    pub async fn upload_url(
        &self,
        reference: &ObjectReference,
        expiry: ExpiryOptions,
    ) -> Result<String, StorageError> {
        let expires_in = expiry.resolve()?;
        self.client.upload_url(reference, expires_in).await
    }

    /// Presign a URL authorizing a download.
    pub async fn download_url(
        &self,
        reference: &ObjectReference,
        expiry: ExpiryOptions,
    ) -> Result<String, StorageError> {
        let expires_in = expiry.resolve()?;
        self.client.download_url(reference, expires_in).await
    }

    /// Issue a time-bounded config authorizing uploads into a directory.
    pub async fn upload_config(
        &self,
        directory: &ObjectDirectory,
        expiry: ExpiryOptions,
    ) -> Result<TransferConfig, StorageError> {
        let expires_in = expiry.resolve()?;
        self.client.upload_config(directory, expires_in).await
    }

    /// Issue a time-bounded config authorizing downloads from a directory.
    pub async fn download_config(
        &self,
        directory: &ObjectDirectory,
        expiry: ExpiryOptions,
    ) -> Result<TransferConfig, StorageError> {
        let expires_in = expiry.resolve()?;
        self.client.download_config(directory, expires_in).await
    }
}
