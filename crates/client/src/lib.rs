//! Provider-agnostic object storage client.
//!
//! This crate is the core of rusty-object-storage. Callers address remote
//! objects through a single vocabulary - directories, object references,
//! metadata, transfer payloads - while the concrete backend is swapped via
//! configuration. Backends implement the [`StorageClient`] capability trait
//! once; everything layered on top is generic:
//!
//! - **Transfer normalization** - buffer, stream, and local-file payloads
//!   reconciled into one upload/download contract
//! - **Multipart coordination** - a validated, never-empty source handed to
//!   the backend's multipart primitive with the desired part plan
//! - **Paginated listing** - a lazy, forward-only page stream over opaque
//!   continuation tokens
//! - **Directory copy** - bounded-concurrency fan-out with a configurable
//!   partial-failure policy
//!
//! Nothing here retries, caches, or defines a wire format; byte transfer
//! and its policies belong to the backend SDKs.

mod copy;
mod error;
pub mod list;
mod multipart;
mod registry;
mod storage;
mod traits;
mod transfer;
mod types;

pub use copy::{CopyOrchestrator, CopyPredicate, CopyTarget};
pub use error::{StorageError, TransferError};
pub use multipart::upload_in_multiple_parts;
pub use registry::{ClientFactory, ProviderRegistry, StorageConfig};
pub use storage::ObjectStorage;
pub use traits::{CopyProgress, ProgressCallback, StorageClient};
pub use transfer::{resolve_download_target, resolve_upload_source};
pub use types::{
    ByteSource, ByteStream, CopyOptions, CopyStatistics, ExpiryOptions, ListPage, Metadata,
    MultipartUploadData, MultipartUploadOptions, ObjectProperties, TemporaryCredentials,
    TransferConfig, TransferData, TransferTarget,
};

// The addressing vocabulary is re-exported so backend crates and callers
// only need this crate in scope.
pub use rusty_object_storage_common::{ObjectDirectory, ObjectReference, ReferenceError};
