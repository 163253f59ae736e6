//! Shared error types used across rusty-object-storage crates.

use thiserror::Error;

/// Addressing errors shared across crates.
///
/// These are validation errors: they are raised while constructing a
/// reference, before any backend call is made.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// A relative directory contains a backslash.
    ///
    /// Relative directories are always forward-slash delimited; a backslash
    /// means a platform path leaked in unconverted.
    #[error("Invalid relative directory: {directory:?} contains a backslash")]
    BackslashInDirectory {
        /// The offending directory string.
        directory: String,
    },

    /// Object name is empty or contains a separator.
    #[error("Invalid object name: {name:?}")]
    InvalidObjectName {
        /// The offending object name.
        name: String,
    },

    /// Base directory must not be empty.
    #[error("Base directory must not be empty")]
    EmptyBaseDirectory,
}
