//! Multipart upload coordination.
//!
//! Splitting a payload into parts and reassembling it is the backend's job;
//! this module validates the source and describes the desired plan (part
//! size, upload queue depth) before handing off. Failed parts are not
//! retried here - retry policy stays with the backend SDK.
//!
//! Buffered payloads are not accepted: multipart exists precisely to avoid
//! holding the whole payload in memory, so [`MultipartUploadData`] has no
//! in-memory variant.

use rusty_object_storage_common::ObjectReference;

use crate::error::StorageError;
use crate::traits::StorageClient;
use crate::transfer;
use crate::types::{ByteSource, MultipartUploadData, MultipartUploadOptions};

/// Upload an object in multiple parts.
///
/// A local-file source is asserted non-empty first, with the same error a
/// single-part upload raises, and is opened lazily as a stream.
///
/// # Errors
/// Returns [`StorageError::EmptyPayload`] for a zero-byte local file before
/// any network operation begins.
pub async fn upload_in_multiple_parts<C: StorageClient + ?Sized>(
    client: &C,
    reference: &ObjectReference,
    data: MultipartUploadData,
    options: MultipartUploadOptions,
) -> Result<(), StorageError> {
    let source: ByteSource = match data {
        MultipartUploadData::Stream(stream) => ByteSource::Stream {
            stream,
            content_length: None,
        },
        MultipartUploadData::LocalFile(path) => transfer::local_file_source(&path).await?,
    };

    client
        .put_object_multipart(
            reference,
            source,
            options.part_size,
            options.queue_size,
            options.metadata.as_ref(),
        )
        .await
}
