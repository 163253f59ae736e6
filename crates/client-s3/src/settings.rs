//! S3 backend settings.

use rusty_object_storage_client::{StorageConfig, StorageError, TemporaryCredentials};

/// Default AWS region when none is configured.
pub const DEFAULT_REGION: &str = "us-west-2";

/// Configuration settings for the S3 backend.
#[derive(Debug, Clone)]
pub struct S3Settings {
    /// AWS region.
    pub region: String,
    /// Static credentials; the SDK default chain applies when absent.
    pub credentials: Option<TemporaryCredentials>,
    /// Custom endpoint for S3-compatible services.
    pub endpoint: Option<String>,
    /// Expected bucket owner for security validation.
    pub expected_bucket_owner: Option<String>,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.into(),
            credentials: None,
            endpoint: None,
            expected_bucket_owner: None,
        }
    }
}

impl S3Settings {
    /// Build settings from a provider configuration.
    ///
    /// Recognized options: `region`, `access_key_id`, `secret_access_key`,
    /// `session_token`, `endpoint`, `expected_bucket_owner`.
    ///
    /// # Errors
    /// Returns an error when only one half of a static credential pair is
    /// supplied.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let credentials: Option<TemporaryCredentials> = match (
            config.option("access_key_id"),
            config.option("secret_access_key"),
        ) {
            (Some(access_key_id), Some(secret_access_key)) => Some(TemporaryCredentials {
                access_key_id: access_key_id.to_string(),
                secret_access_key: secret_access_key.to_string(),
                session_token: config.option("session_token").map(str::to_string),
            }),
            (None, None) => None,
            _ => {
                return Err(StorageError::InvalidConfig {
                    message: "access_key_id and secret_access_key must be set together"
                        .to_string(),
                })
            }
        };

        Ok(Self {
            region: config
                .option("region")
                .unwrap_or(DEFAULT_REGION)
                .to_string(),
            credentials,
            endpoint: config.option("endpoint").map(str::to_string),
            expected_bucket_owner: config
                .option("expected_bucket_owner")
                .map(str::to_string),
        })
    }
}
