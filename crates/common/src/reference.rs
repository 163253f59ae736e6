//! Backend-neutral object addressing.
//!
//! A reference identifies exactly one remote object; a directory identifies
//! the container (plus optional sub-path) that listings and directory-level
//! operations work on. Relative directories are always forward-slash
//! delimited, regardless of platform; constructors reject backslashes so a
//! native Windows path can never leak into a backend key.

use serde::{Deserialize, Serialize};

use crate::error::ReferenceError;

/// A directory in object storage: base container plus optional sub-path.
///
/// The base directory is the top-level container (bucket, blob container).
/// The relative directory, when present, is a forward-slash-delimited
/// sub-path within it. Simulated-directory backends treat the relative
/// directory as a key prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectDirectory {
    base_directory: String,
    relative_directory: Option<String>,
}

impl ObjectDirectory {
    /// Create a directory, validating its components.
    ///
    /// # Errors
    /// Returns an error if the base directory is empty or the relative
    /// directory contains a backslash.
    pub fn new(
        base_directory: impl Into<String>,
        relative_directory: Option<String>,
    ) -> Result<Self, ReferenceError> {
        let base_directory: String = base_directory.into();
        if base_directory.is_empty() {
            return Err(ReferenceError::EmptyBaseDirectory);
        }
        if let Some(ref dir) = relative_directory {
            validate_relative_directory(dir)?;
        }
        Ok(Self {
            base_directory,
            relative_directory,
        })
    }

    /// The top-level container this directory lives under.
    pub fn base_directory(&self) -> &str {
        &self.base_directory
    }

    /// The sub-path within the base directory, if any.
    pub fn relative_directory(&self) -> Option<&str> {
        self.relative_directory.as_deref()
    }

    /// Create a reference to an object inside this directory.
    pub fn object(&self, object_name: impl Into<String>) -> Result<ObjectReference, ReferenceError> {
        ObjectReference::new(
            self.base_directory.clone(),
            self.relative_directory.clone(),
            object_name,
        )
    }

    /// The key prefix this directory maps to, without a trailing slash.
    ///
    /// Empty when the directory has no relative part.
    pub fn key_prefix(&self) -> &str {
        self.relative_directory.as_deref().unwrap_or("")
    }
}

/// Identifies exactly one object in storage.
///
/// Immutable once constructed; all components are validated up front so a
/// reference that exists is always addressable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectReference {
    base_directory: String,
    relative_directory: Option<String>,
    object_name: String,
}

impl ObjectReference {
    /// Create a reference, validating its components.
    ///
    /// # Errors
    /// Returns an error if the base directory is empty, the relative
    /// directory contains a backslash, or the object name is empty or
    /// contains a separator.
    pub fn new(
        base_directory: impl Into<String>,
        relative_directory: Option<String>,
        object_name: impl Into<String>,
    ) -> Result<Self, ReferenceError> {
        let base_directory: String = base_directory.into();
        if base_directory.is_empty() {
            return Err(ReferenceError::EmptyBaseDirectory);
        }
        if let Some(ref dir) = relative_directory {
            validate_relative_directory(dir)?;
        }
        let object_name: String = object_name.into();
        if object_name.is_empty() || object_name.contains('/') || object_name.contains('\\') {
            return Err(ReferenceError::InvalidObjectName { name: object_name });
        }
        Ok(Self {
            base_directory,
            relative_directory,
            object_name,
        })
    }

    /// Split a backend key into a reference.
    ///
    /// The final `/`-separated segment becomes the object name; everything
    /// before it becomes the relative directory.
    ///
    /// # Arguments
    /// * `base_directory` - Container the key was listed from
    /// * `key` - Full backend key, e.g. `"photos/2024/cat.jpg"`
    pub fn from_key(
        base_directory: impl Into<String>,
        key: &str,
    ) -> Result<Self, ReferenceError> {
        match key.rsplit_once('/') {
            Some((dir, name)) => Self::new(base_directory, Some(dir.to_string()), name),
            None => Self::new(base_directory, None, key),
        }
    }

    /// The top-level container this object lives under.
    pub fn base_directory(&self) -> &str {
        &self.base_directory
    }

    /// The sub-path within the base directory, if any.
    pub fn relative_directory(&self) -> Option<&str> {
        self.relative_directory.as_deref()
    }

    /// The object's own name, without any directory part.
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    /// The full backend key for this object.
    /// Returns `"{relative_directory}/{object_name}"`, or just the object
    /// name when there is no relative directory.
    pub fn object_key(&self) -> String {
        match self.relative_directory {
            Some(ref dir) => format!("{}/{}", dir, self.object_name),
            None => self.object_name.clone(),
        }
    }

    /// The directory this object lives in.
    pub fn directory(&self) -> ObjectDirectory {
        ObjectDirectory {
            base_directory: self.base_directory.clone(),
            relative_directory: self.relative_directory.clone(),
        }
    }
}

impl std::fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base_directory, self.object_key())
    }
}

fn validate_relative_directory(directory: &str) -> Result<(), ReferenceError> {
    if directory.contains('\\') {
        return Err(ReferenceError::BackslashInDirectory {
            directory: directory.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_with_relative_directory() {
        let reference =
            ObjectReference::new("bucket", Some("photos/2024".to_string()), "cat.jpg").unwrap();
        assert_eq!(reference.object_key(), "photos/2024/cat.jpg");
    }

    #[test]
    fn test_object_key_without_relative_directory() {
        let reference = ObjectReference::new("bucket", None, "cat.jpg").unwrap();
        assert_eq!(reference.object_key(), "cat.jpg");
    }

    #[test]
    fn test_from_key_splits_on_last_separator() {
        let reference = ObjectReference::from_key("bucket", "photos/2024/cat.jpg").unwrap();
        assert_eq!(reference.relative_directory(), Some("photos/2024"));
        assert_eq!(reference.object_name(), "cat.jpg");
    }

    #[test]
    fn test_from_key_flat_key() {
        let reference = ObjectReference::from_key("bucket", "cat.jpg").unwrap();
        assert_eq!(reference.relative_directory(), None);
        assert_eq!(reference.object_name(), "cat.jpg");
    }

    #[test]
    fn test_from_key_round_trips_object_key() {
        let original =
            ObjectReference::new("bucket", Some("a/b".to_string()), "file.bin").unwrap();
        let round_tripped =
            ObjectReference::from_key("bucket", &original.object_key()).unwrap();
        assert_eq!(original, round_tripped);
    }

    #[test]
    fn test_backslash_in_relative_directory_rejected() {
        let result = ObjectReference::new("bucket", Some(r"photos\2024".to_string()), "cat.jpg");
        assert!(matches!(
            result,
            Err(ReferenceError::BackslashInDirectory { .. })
        ));
    }

    #[test]
    fn test_backslash_in_directory_rejected() {
        let result = ObjectDirectory::new("bucket", Some(r"a\b".to_string()));
        assert!(matches!(
            result,
            Err(ReferenceError::BackslashInDirectory { .. })
        ));
    }

    #[test]
    fn test_empty_object_name_rejected() {
        let result = ObjectReference::new("bucket", None, "");
        assert!(matches!(
            result,
            Err(ReferenceError::InvalidObjectName { .. })
        ));
    }

    #[test]
    fn test_separator_in_object_name_rejected() {
        let result = ObjectReference::new("bucket", None, "a/b");
        assert!(matches!(
            result,
            Err(ReferenceError::InvalidObjectName { .. })
        ));
    }

    #[test]
    fn test_empty_base_directory_rejected() {
        assert!(matches!(
            ObjectReference::new("", None, "cat.jpg"),
            Err(ReferenceError::EmptyBaseDirectory)
        ));
        assert!(matches!(
            ObjectDirectory::new("", None),
            Err(ReferenceError::EmptyBaseDirectory)
        ));
    }

    #[test]
    fn test_directory_object_round_trip() {
        let directory = ObjectDirectory::new("bucket", Some("logs".to_string())).unwrap();
        let reference = directory.object("2024-01-01.log").unwrap();
        assert_eq!(reference.object_key(), "logs/2024-01-01.log");
        assert_eq!(reference.directory(), directory);
    }

    #[test]
    fn test_display() {
        let reference =
            ObjectReference::new("bucket", Some("logs".to_string()), "a.log").unwrap();
        assert_eq!(reference.to_string(), "bucket/logs/a.log");
    }
}
