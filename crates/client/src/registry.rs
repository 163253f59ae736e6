//! Backend selection.
//!
//! A configuration value names the desired backend; the registry maps names
//! to constructor functions. The table is explicit and built at process
//! start - no reflection, no linkage magic. Backend crates ship a factory
//! suitable for registration so they never have to be linked into the core.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage::ObjectStorage;
use crate::traits::StorageClient;

/// Configuration selecting and parameterizing a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Registered backend name (e.g. "s3").
    pub provider: String,
    /// Provider-specific options, passed to the constructor untouched.
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl StorageConfig {
    /// Create a configuration for the named provider.
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            options: HashMap::new(),
        }
    }

    /// Add a provider-specific option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Look up a provider-specific option.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

/// Constructor function producing a backend client from a configuration.
pub type ClientFactory = Arc<
    dyn Fn(&StorageConfig) -> BoxFuture<'static, Result<Arc<dyn StorageClient>, StorageError>>
        + Send
        + Sync,
>;

/// Mapping table from provider names to constructors.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, ClientFactory>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under a provider name.
    /// A later registration under the same name replaces the earlier one.
    pub fn register(&mut self, provider: impl Into<String>, factory: ClientFactory) {
        self.factories.insert(provider.into(), factory);
    }

    /// The registered provider names.
    pub fn providers(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Construct a client for the provider the configuration names.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidConfig`] when no constructor is
    /// registered under the configured name.
    pub async fn create(&self, config: &StorageConfig) -> Result<ObjectStorage, StorageError> {
        let factory: &ClientFactory =
            self.factories
                .get(&config.provider)
                .ok_or_else(|| StorageError::InvalidConfig {
                    message: format!("Unknown storage provider: {}", config.provider),
                })?;
        let client: Arc<dyn StorageClient> = factory(config).await?;
        Ok(ObjectStorage::new(client))
    }
}
