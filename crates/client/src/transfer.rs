//! Transfer payload normalization.
//!
//! Uploads may be staged as an in-memory buffer, a byte stream, or a local
//! file; downloads always arrive from the backend as a stream and must be
//! routed to whichever shape the caller asked for. This module converts
//! between those representations:
//!
//! - Local files are opened lazily as streams, never fully buffered
//! - Empty local files are rejected before any backend call
//! - Buffer downloads drain the whole stream into memory (unbounded)
//! - Local downloads create missing parent directories and write to disk

use std::path::Path;

use bytes::BytesMut;
use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::error::StorageError;
use crate::types::{ByteSource, ByteStream, TransferData, TransferTarget};

/// Normalize an upload payload into a backend-ready source.
///
/// # Errors
/// Returns [`StorageError::EmptyPayload`] for a zero-byte local file, before
/// any network operation begins.
pub async fn resolve_upload_source(data: TransferData) -> Result<ByteSource, StorageError> {
    match data {
        TransferData::Memory(bytes) => Ok(ByteSource::Buffer(bytes)),
        TransferData::Stream(stream) => Ok(ByteSource::Stream {
            stream,
            content_length: None,
        }),
        TransferData::LocalFile(path) => local_file_source(&path).await,
    }
}

/// Open a local file as a lazily read streaming source.
///
/// The file's length becomes the content-length hint. A zero-byte file is
/// rejected here so the caller never reaches the backend with it.
pub(crate) async fn local_file_source(path: &Path) -> Result<ByteSource, StorageError> {
    let display_path: String = path.display().to_string();
    let length: u64 = tokio::fs::metadata(path)
        .await
        .map_err(|e| StorageError::from_io(display_path.as_str(), e))?
        .len();
    if length == 0 {
        return Err(StorageError::EmptyPayload { path: display_path });
    }

    let file: File = File::open(path)
        .await
        .map_err(|e| StorageError::from_io(display_path.as_str(), e))?;
    let stream: ByteStream = ReaderStream::new(file)
        .map(move |chunk| chunk.map_err(|e| StorageError::from_io(display_path.clone(), e)))
        .boxed();

    Ok(ByteSource::Stream {
        stream,
        content_length: Some(length),
    })
}

/// Route a downloaded stream to the caller-selected shape.
///
/// # Errors
/// Returns [`StorageError::MissingLocalPath`] when a local-file target
/// carries an empty path.
pub async fn resolve_download_target(
    source: ByteStream,
    target: TransferTarget,
) -> Result<TransferData, StorageError> {
    match target {
        TransferTarget::Stream => Ok(TransferData::Stream(source)),
        TransferTarget::Memory => {
            let mut source = source;
            let mut buffer = BytesMut::new();
            while let Some(chunk) = source.next().await {
                buffer.extend_from_slice(&chunk?);
            }
            Ok(TransferData::Memory(buffer.freeze()))
        }
        TransferTarget::LocalFile(path) => {
            if path.as_os_str().is_empty() {
                return Err(StorageError::MissingLocalPath);
            }
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| StorageError::from_io(parent.display().to_string(), e))?;
                }
            }

            let display_path: String = path.display().to_string();
            let mut file: File = File::create(&path)
                .await
                .map_err(|e| StorageError::from_io(display_path.as_str(), e))?;
            let mut source = source;
            while let Some(chunk) = source.next().await {
                file.write_all(&chunk?)
                    .await
                    .map_err(|e| StorageError::from_io(display_path.as_str(), e))?;
            }
            file.flush()
                .await
                .map_err(|e| StorageError::from_io(display_path.as_str(), e))?;

            Ok(TransferData::LocalFile(path))
        }
    }
}
