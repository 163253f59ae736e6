//! S3 backend for rusty-object-storage.
//!
//! Implements the [`StorageClient`] capability trait with the AWS SDK for
//! Rust. Works against Amazon S3 and S3-compatible services via a custom
//! endpoint. Base directories map to buckets; relative directories map to
//! key prefixes, so "directories" exist exactly as long as their bucket
//! does.

mod client;
mod settings;

pub use client::{S3StorageClient, DEFAULT_PART_SIZE, DEFAULT_QUEUE_SIZE, MIN_PART_SIZE};
pub use settings::{S3Settings, DEFAULT_REGION};

use std::sync::Arc;

use futures::future::BoxFuture;

use rusty_object_storage_client::{ProviderRegistry, StorageClient, StorageConfig, StorageError};

/// The name this backend registers under.
pub const PROVIDER_NAME: &str = "s3";

fn s3_factory(
    config: &StorageConfig,
) -> BoxFuture<'static, Result<Arc<dyn StorageClient>, StorageError>> {
    let settings = S3Settings::from_config(config);
    Box::pin(async move {
        let client = S3StorageClient::new(settings?).await?;
        Ok(Arc::new(client) as Arc<dyn StorageClient>)
    })
}

/// Register the S3 constructor in a provider registry.
pub fn register(registry: &mut ProviderRegistry) {
    registry.register(PROVIDER_NAME, Arc::new(s3_factory));
}
