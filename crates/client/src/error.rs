//! Error types for storage operations.

use thiserror::Error;

use rusty_object_storage_common::{ObjectReference, ReferenceError};

/// Errors that can occur during storage operations.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// Object not found in the backend.
    #[error("Object not found: {base_directory}/{key}")]
    NotFound { base_directory: String, key: String },

    /// Local source has no bytes to upload.
    ///
    /// Raised before any backend call, for single and multipart uploads
    /// alike.
    #[error("Cannot upload empty payload from {path}")]
    EmptyPayload { path: String },

    /// A local-file download was requested without a destination path.
    #[error("Local download requested without a destination path")]
    MissingLocalPath,

    /// Reference validation failed.
    #[error("Invalid reference: {0}")]
    InvalidReference(#[from] ReferenceError),

    /// Expiry options are contradictory.
    #[error("Invalid expiry: {message}")]
    InvalidExpiry { message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Network error surfaced from the backend SDK.
    #[error("Network error: {message}")]
    NetworkError { message: String, retryable: bool },

    /// Local I/O error.
    #[error("I/O error for {path}: {message}")]
    IoError { path: String, message: String },

    /// Operation cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// Some objects in a directory copy failed while others succeeded.
    ///
    /// Only ever produced by the copy orchestrator, never by single-object
    /// operations.
    #[error("Directory copy finished with {} failed object(s)", .failures.len())]
    PartialFailure { failures: Vec<TransferError> },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl StorageError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            StorageError::NetworkError { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Check if this error means the addressed thing does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    /// Create an IoError from std::io::Error.
    ///
    /// # Arguments
    /// * `path` - Path where the error occurred
    /// * `err` - The underlying IO error
    pub fn from_io(path: impl Into<String>, err: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// A single failed object within a directory copy.
#[derive(Debug, Clone)]
pub struct TransferError {
    /// The reference that failed to copy.
    pub reference: ObjectReference,
    /// The error that occurred.
    pub error: StorageError,
}

impl TransferError {
    /// Create a new transfer error.
    pub fn new(reference: ObjectReference, error: StorageError) -> Self {
        Self { reference, error }
    }
}
