//! Shared data structures for storage operations.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use rusty_object_storage_common::{DEFAULT_COPY_CONCURRENCY, DEFAULT_MAX_PAGE_SIZE, DEFAULT_URL_EXPIRY_SECS};

use crate::error::StorageError;

/// Caller-supplied key/value pairs persisted with an object.
pub type Metadata = HashMap<String, String>;

/// A stream of byte chunks moving to or from a backend.
pub type ByteStream = BoxStream<'static, Result<Bytes, StorageError>>;

/// Payload for an upload, in whichever shape the caller has it.
pub enum TransferData {
    /// In-memory bytes; length is known up front.
    Memory(Bytes),
    /// Streaming byte source; length is unknown.
    Stream(ByteStream),
    /// A file on the local filesystem, opened lazily when transferred.
    LocalFile(PathBuf),
}

impl std::fmt::Debug for TransferData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferData::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
            TransferData::Stream(_) => write!(f, "Stream(..)"),
            TransferData::LocalFile(path) => write!(f, "LocalFile({})", path.display()),
        }
    }
}

/// The shape a caller wants a download delivered in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferTarget {
    /// Drain the whole object into one in-memory buffer.
    Memory,
    /// Hand back the backend stream unchanged.
    Stream,
    /// Write the object to this local path, creating missing parents.
    LocalFile(PathBuf),
}

/// A normalized upload source, ready for a backend primitive.
///
/// Produced by the transfer normalizer; backends never see raw
/// [`TransferData`].
pub enum ByteSource {
    /// Bytes already in memory; use the length as a content-length hint.
    Buffer(Bytes),
    /// A byte stream, with the content length when it is known (local
    /// files report theirs; caller streams do not).
    Stream {
        stream: ByteStream,
        content_length: Option<u64>,
    },
}

impl ByteSource {
    /// The content length, when known up front.
    pub fn content_length(&self) -> Option<u64> {
        match self {
            ByteSource::Buffer(bytes) => Some(bytes.len() as u64),
            ByteSource::Stream { content_length, .. } => *content_length,
        }
    }
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ByteSource::Buffer(bytes) => write!(f, "Buffer({} bytes)", bytes.len()),
            ByteSource::Stream { content_length, .. } => {
                write!(f, "Stream(content_length: {:?})", content_length)
            }
        }
    }
}

/// Payload for a multipart upload.
///
/// There is deliberately no in-memory variant: multipart exists precisely
/// to avoid holding the whole payload in memory.
pub enum MultipartUploadData {
    /// Streaming byte source.
    Stream(ByteStream),
    /// A file on the local filesystem, opened lazily when transferred.
    LocalFile(PathBuf),
}

impl std::fmt::Debug for MultipartUploadData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MultipartUploadData::Stream(_) => write!(f, "Stream(..)"),
            MultipartUploadData::LocalFile(path) => write!(f, "LocalFile({})", path.display()),
        }
    }
}

/// Options for multipart uploads.
///
/// Part size and queue size are advisory; when absent, backend defaults
/// apply.
#[derive(Debug, Default)]
pub struct MultipartUploadOptions {
    /// Metadata persisted with the assembled object.
    pub metadata: Option<Metadata>,
    /// Desired size of each uploaded part, in bytes.
    pub part_size: Option<u64>,
    /// Desired number of concurrently uploaded parts.
    pub queue_size: Option<usize>,
}

impl MultipartUploadOptions {
    /// Create options with backend defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set metadata to persist with the object.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the desired part size in bytes.
    pub fn with_part_size(mut self, part_size: u64) -> Self {
        self.part_size = Some(part_size);
        self
    }

    /// Set the desired part upload concurrency.
    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = Some(queue_size);
        self
    }
}

/// Options for directory copies.
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Maximum concurrent object copies. Defaults to sequential.
    pub max_concurrency: usize,
    /// Maximum entries per listing page while enumerating the source.
    pub max_page_size: usize,
    /// Attempt every object and aggregate failures, instead of aborting on
    /// the first failed copy.
    pub continue_on_error: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_COPY_CONCURRENCY,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            continue_on_error: false,
        }
    }
}

impl CopyOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum concurrent object copies.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set maximum entries per listing page.
    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// Keep copying after individual failures and aggregate them.
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }
}

/// Aggregated result of a directory copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStatistics {
    /// Objects enumerated from the source directory.
    pub objects_listed: u64,
    /// Objects copied to the target.
    pub objects_copied: u64,
    /// Objects the predicate filtered out (not failures).
    pub objects_skipped: u64,
}

/// One page of listing results.
///
/// `continuation` is an opaque backend token; `None` means the sequence is
/// exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage<T> {
    /// Entities in this page, in backend order.
    pub entities: Vec<T>,
    /// Token fetching the next page, if there is one.
    pub continuation: Option<String>,
}

impl<T> ListPage<T> {
    /// A terminal page with the given entities and no continuation.
    pub fn last(entities: Vec<T>) -> Self {
        Self {
            entities,
            continuation: None,
        }
    }
}

/// Properties of a stored object from a head-style lookup.
#[derive(Debug, Clone, Default)]
pub struct ObjectProperties {
    /// Object size in bytes.
    pub size: u64,
    /// Last modified timestamp (Unix epoch seconds).
    pub last_modified: Option<i64>,
    /// Content type, if the backend tracks one.
    pub content_type: Option<String>,
    /// ETag, if the backend tracks one.
    pub etag: Option<String>,
    /// Caller-supplied metadata persisted with the object.
    pub user_metadata: Metadata,
}

/// When a presigned URL or transfer config should expire.
///
/// At most one of the two fields may be set; supplying both is a caller
/// error. Supplying neither defaults to one hour.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpiryOptions {
    /// Expire this long after issuing.
    pub expires_in: Option<Duration>,
    /// Expire at this instant.
    pub expires_on: Option<SystemTime>,
}

impl ExpiryOptions {
    /// Expiry a fixed duration from now.
    pub fn in_seconds(seconds: u64) -> Self {
        Self {
            expires_in: Some(Duration::from_secs(seconds)),
            expires_on: None,
        }
    }

    /// Expiry at a fixed instant.
    pub fn at(instant: SystemTime) -> Self {
        Self {
            expires_in: None,
            expires_on: Some(instant),
        }
    }

    /// Resolve to a concrete validity duration from now.
    ///
    /// # Errors
    /// Returns an error if both fields are set, or if `expires_on` is
    /// already in the past.
    pub fn resolve(&self) -> Result<Duration, StorageError> {
        match (self.expires_in, self.expires_on) {
            (Some(_), Some(_)) => Err(StorageError::InvalidExpiry {
                message: "expires_in and expires_on are mutually exclusive".to_string(),
            }),
            (Some(duration), None) => Ok(duration),
            (None, Some(instant)) => instant
                .duration_since(SystemTime::now())
                .map_err(|_| StorageError::InvalidExpiry {
                    message: "expires_on is in the past".to_string(),
                }),
            (None, None) => Ok(Duration::from_secs(DEFAULT_URL_EXPIRY_SECS)),
        }
    }
}

/// Time-bounded parameters letting a client transfer objects without
/// holding durable backend credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Backend address the config is scoped to.
    pub base_url: String,
    /// When the config stops working.
    pub expiration: SystemTime,
    /// Temporary credentials, for backends that issue them.
    pub credentials: Option<TemporaryCredentials>,
}

/// Short-lived credentials issued with a transfer config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}
