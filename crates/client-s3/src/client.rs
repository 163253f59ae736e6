//! AWS SDK S3 implementation of the storage capability trait.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as SdkByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CompletedMultipartUpload, CompletedPart, CreateBucketConfiguration,
    Delete, ObjectIdentifier,
};
use aws_sdk_s3::Client as S3Client;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, FuturesUnordered};
use futures::StreamExt;
use log::warn;

use rusty_object_storage_client::{
    ByteSource, ByteStream, ListPage, Metadata, ObjectDirectory, ObjectProperties, ObjectReference,
    StorageClient, StorageError, TemporaryCredentials, TransferConfig,
};

use crate::settings::S3Settings;

/// Default part size for multipart uploads (8MB).
pub const DEFAULT_PART_SIZE: u64 = 8 * 1024 * 1024;

/// Smallest part size S3 accepts for any part but the last (5MB).
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Default number of concurrently uploaded parts.
pub const DEFAULT_QUEUE_SIZE: usize = 4;

/// StorageClient implementation using the AWS SDK for Rust.
///
/// Works against Amazon S3 and S3-compatible services via a custom
/// endpoint. Base directories map to buckets; relative directories map to
/// key prefixes.
pub struct S3StorageClient {
    /// The underlying S3 client.
    s3_client: S3Client,
    /// Resolved credential provider, for issuing transfer configs.
    credentials_provider: Option<SharedCredentialsProvider>,
    /// Region the client was configured for.
    region: String,
    /// Custom endpoint, when targeting an S3-compatible service.
    endpoint: Option<String>,
    /// Expected bucket owner for security validation.
    expected_bucket_owner: Option<String>,
}

impl S3StorageClient {
    /// Create a new S3 client.
    ///
    /// Static credentials from the settings take precedence; otherwise the
    /// SDK default credential chain applies.
    pub async fn new(settings: S3Settings) -> Result<Self, StorageError> {
        let config_loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(settings.region.clone()));

        let config_loader = if let Some(ref creds) = settings.credentials {
            let credentials = Credentials::new(
                &creds.access_key_id,
                &creds.secret_access_key,
                creds.session_token.clone(),
                None,
                "rusty-object-storage",
            );
            config_loader.credentials_provider(credentials)
        } else {
            config_loader
        };

        let config_loader = if let Some(ref endpoint) = settings.endpoint {
            config_loader.endpoint_url(endpoint)
        } else {
            config_loader
        };

        let sdk_config = config_loader.load().await;
        let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config);
        if settings.endpoint.is_some() {
            // S3-compatible services usually do not resolve virtual-host
            // bucket names.
            s3_config = s3_config.force_path_style(true);
        }
        let s3_client = S3Client::from_conf(s3_config.build());

        Ok(Self {
            s3_client,
            credentials_provider: sdk_config.credentials_provider().map(|p| p.clone()),
            region: settings.region,
            endpoint: settings.endpoint,
            expected_bucket_owner: settings.expected_bucket_owner,
        })
    }

    /// Create a client from an existing S3Client (for testing).
    pub fn from_client(s3_client: S3Client, region: impl Into<String>) -> Self {
        Self {
            s3_client,
            credentials_provider: None,
            region: region.into(),
            endpoint: None,
            expected_bucket_owner: None,
        }
    }

    fn directory_url(&self, directory: &ObjectDirectory) -> String {
        let mut url: String = match self.endpoint {
            Some(ref endpoint) => {
                format!("{}/{}", endpoint.trim_end_matches('/'), directory.base_directory())
            }
            None => format!(
                "https://{}.s3.{}.amazonaws.com",
                directory.base_directory(),
                self.region
            ),
        };
        if let Some(prefix) = directory.relative_directory() {
            url.push('/');
            url.push_str(prefix);
        }
        url
    }

    async fn transfer_config(
        &self,
        directory: &ObjectDirectory,
        expires_in: Duration,
    ) -> Result<TransferConfig, StorageError> {
        let mut expiration: SystemTime = SystemTime::now() + expires_in;

        let credentials: Option<TemporaryCredentials> = match self.credentials_provider {
            Some(ref provider) => {
                let creds = provider.provide_credentials().await.map_err(|e| {
                    StorageError::InvalidConfig {
                        message: format!("failed to resolve credentials: {}", e),
                    }
                })?;
                // Never hand out a config outliving the credentials backing it.
                if let Some(credential_expiry) = creds.expiry() {
                    expiration = expiration.min(credential_expiry);
                }
                Some(TemporaryCredentials {
                    access_key_id: creds.access_key_id().to_string(),
                    secret_access_key: creds.secret_access_key().to_string(),
                    session_token: creds.session_token().map(str::to_string),
                })
            }
            None => None,
        };

        Ok(TransferConfig {
            base_url: self.directory_url(directory),
            expiration,
            credentials,
        })
    }

    async fn simple_put(
        &self,
        reference: &ObjectReference,
        body: SdkByteStream,
        metadata: Option<&Metadata>,
    ) -> Result<(), StorageError> {
        let mut request = self
            .s3_client
            .put_object()
            .bucket(reference.base_directory())
            .key(reference.object_key())
            .body(body);

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        if let Some(meta) = metadata {
            for (k, v) in meta {
                request = request.metadata(k, v);
            }
        }

        request.send().await.map_err(|err| StorageError::NetworkError {
            message: err.to_string(),
            retryable: true,
        })?;

        Ok(())
    }

    /// Upload `leading` plus everything in `rest` as a multipart object.
    async fn multipart_upload(
        &self,
        reference: &ObjectReference,
        leading: Bytes,
        rest: ByteStream,
        part_size: u64,
        queue_size: usize,
        metadata: Option<&Metadata>,
    ) -> Result<(), StorageError> {
        let bucket: &str = reference.base_directory();
        let key: String = reference.object_key();

        let mut request = self
            .s3_client
            .create_multipart_upload()
            .bucket(bucket)
            .key(&key);

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        if let Some(meta) = metadata {
            for (k, v) in meta {
                request = request.metadata(k, v);
            }
        }

        let created = request.send().await.map_err(|err| StorageError::NetworkError {
            message: err.to_string(),
            retryable: true,
        })?;
        let upload_id: String =
            created
                .upload_id()
                .map(str::to_string)
                .ok_or_else(|| StorageError::Other {
                    message: "backend returned no multipart upload id".to_string(),
                })?;

        match self
            .upload_parts(bucket, &key, &upload_id, leading, rest, part_size, queue_size)
            .await
        {
            Ok(parts) => {
                let completed = CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build();
                self.s3_client
                    .complete_multipart_upload()
                    .bucket(bucket)
                    .key(&key)
                    .upload_id(&upload_id)
                    .multipart_upload(completed)
                    .send()
                    .await
                    .map_err(|err| StorageError::NetworkError {
                        message: err.to_string(),
                        retryable: true,
                    })?;
                Ok(())
            }
            Err(error) => {
                if let Err(abort_err) = self
                    .s3_client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(&key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!("Failed to abort multipart upload {}: {}", upload_id, abort_err);
                }
                Err(error)
            }
        }
    }

    /// Upload parts of `part_size` bytes, at most `queue_size` in flight.
    async fn upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        leading: Bytes,
        mut rest: ByteStream,
        part_size: u64,
        queue_size: usize,
    ) -> Result<Vec<CompletedPart>, StorageError> {
        let part_len: usize = part_size as usize;
        let mut buffer = BytesMut::from(&leading[..]);
        let mut completed: Vec<CompletedPart> = Vec::new();
        let mut in_flight = FuturesUnordered::new();
        let mut part_number: i32 = 0;

        let dispatch = |part_number: i32, body: Bytes| {
            let request = self
                .s3_client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(SdkByteStream::from(body));
            async move {
                let output = request.send().await.map_err(|err| StorageError::NetworkError {
                    message: err.to_string(),
                    retryable: true,
                })?;
                Ok::<CompletedPart, StorageError>(
                    CompletedPart::builder()
                        .part_number(part_number)
                        .set_e_tag(output.e_tag().map(str::to_string))
                        .build(),
                )
            }
        };

        loop {
            while buffer.len() >= part_len {
                let body: Bytes = buffer.split_to(part_len).freeze();
                part_number += 1;
                if in_flight.len() >= queue_size.max(1) {
                    match in_flight.next().await {
                        Some(Ok(part)) => completed.push(part),
                        Some(Err(error)) => return Err(error),
                        None => {}
                    }
                }
                in_flight.push(dispatch(part_number, body));
            }

            match rest.next().await {
                Some(chunk) => buffer.extend_from_slice(&chunk?),
                None => break,
            }
        }

        // The final part may be smaller than part_size; an object always
        // has at least one part.
        if !buffer.is_empty() || part_number == 0 {
            part_number += 1;
            in_flight.push(dispatch(part_number, buffer.freeze()));
        }

        while let Some(result) = in_flight.next().await {
            completed.push(result?);
        }
        completed.sort_by_key(|part| part.part_number());

        Ok(completed)
    }
}

#[async_trait]
impl StorageClient for S3StorageClient {
    async fn put_object(
        &self,
        reference: &ObjectReference,
        source: ByteSource,
        metadata: Option<&Metadata>,
    ) -> Result<(), StorageError> {
        match source {
            ByteSource::Buffer(bytes) => {
                self.simple_put(reference, SdkByteStream::from(bytes), metadata)
                    .await
            }
            ByteSource::Stream { mut stream, .. } => {
                // PutObject needs the payload length up front; read up to
                // one part so small payloads take the single-request path
                // and anything larger streams through multipart.
                let mut head = BytesMut::new();
                while head.len() < DEFAULT_PART_SIZE as usize {
                    match stream.next().await {
                        Some(chunk) => head.extend_from_slice(&chunk?),
                        None => {
                            return self
                                .simple_put(
                                    reference,
                                    SdkByteStream::from(head.freeze()),
                                    metadata,
                                )
                                .await;
                        }
                    }
                }
                self.multipart_upload(
                    reference,
                    head.freeze(),
                    stream,
                    DEFAULT_PART_SIZE,
                    DEFAULT_QUEUE_SIZE,
                    metadata,
                )
                .await
            }
        }
    }

    async fn put_object_multipart(
        &self,
        reference: &ObjectReference,
        source: ByteSource,
        part_size: Option<u64>,
        queue_size: Option<usize>,
        metadata: Option<&Metadata>,
    ) -> Result<(), StorageError> {
        let part_size: u64 = part_size.unwrap_or(DEFAULT_PART_SIZE).max(MIN_PART_SIZE);
        let queue_size: usize = queue_size.unwrap_or(DEFAULT_QUEUE_SIZE).max(1);

        let (leading, rest): (Bytes, ByteStream) = match source {
            ByteSource::Buffer(bytes) => (bytes, stream::empty().boxed()),
            ByteSource::Stream { stream, .. } => (Bytes::new(), stream),
        };

        self.multipart_upload(reference, leading, rest, part_size, queue_size, metadata)
            .await
    }

    async fn get_object(&self, reference: &ObjectReference) -> Result<ByteStream, StorageError> {
        let mut request = self
            .s3_client
            .get_object()
            .bucket(reference.base_directory())
            .key(reference.object_key());

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        let response = request.send().await.map_err(|err| {
            let service_err = err.into_service_error();
            if service_err.is_no_such_key() {
                StorageError::NotFound {
                    base_directory: reference.base_directory().to_string(),
                    key: reference.object_key(),
                }
            } else {
                StorageError::NetworkError {
                    message: service_err.to_string(),
                    retryable: true,
                }
            }
        })?;

        let stream = stream::try_unfold(response.body, |mut body| async move {
            match body.try_next().await {
                Ok(Some(chunk)) => Ok(Some((chunk, body))),
                Ok(None) => Ok(None),
                Err(e) => Err(StorageError::NetworkError {
                    message: e.to_string(),
                    retryable: true,
                }),
            }
        });

        Ok(stream.boxed())
    }

    async fn get_object_properties(
        &self,
        reference: &ObjectReference,
    ) -> Result<ObjectProperties, StorageError> {
        let mut request = self
            .s3_client
            .head_object()
            .bucket(reference.base_directory())
            .key(reference.object_key());

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        match request.send().await {
            Ok(output) => {
                let user_metadata: Metadata = output
                    .metadata()
                    .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                    .unwrap_or_default();

                let last_modified: Option<i64> = output
                    .last_modified()
                    .and_then(|dt| dt.to_millis().ok())
                    .map(|ms| ms / 1000);

                Ok(ObjectProperties {
                    size: output.content_length().map(|l| l as u64).unwrap_or(0),
                    last_modified,
                    content_type: output.content_type().map(|s| s.to_string()),
                    etag: output.e_tag().map(|s| s.to_string()),
                    user_metadata,
                })
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Err(StorageError::NotFound {
                        base_directory: reference.base_directory().to_string(),
                        key: reference.object_key(),
                    })
                } else {
                    Err(StorageError::NetworkError {
                        message: service_err.to_string(),
                        retryable: false,
                    })
                }
            }
        }
    }

    async fn object_exists(&self, reference: &ObjectReference) -> Result<bool, StorageError> {
        match self.get_object_properties(reference).await {
            Ok(_) => Ok(true),
            Err(error) if error.is_not_found() => Ok(false),
            Err(error) => Err(error),
        }
    }

    async fn base_directory_exists(&self, base_directory: &str) -> Result<bool, StorageError> {
        let mut request = self.s3_client.head_bucket().bucket(base_directory);

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        match request.send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::NetworkError {
                        message: service_err.to_string(),
                        retryable: false,
                    })
                }
            }
        }
    }

    async fn create_base_directory(&self, base_directory: &str) -> Result<(), StorageError> {
        let mut request = self.s3_client.create_bucket().bucket(base_directory);

        // us-east-1 is the one region that must not be sent as a location
        // constraint.
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_bucket_already_owned_by_you() {
                    Ok(())
                } else {
                    Err(StorageError::NetworkError {
                        message: service_err.to_string(),
                        retryable: false,
                    })
                }
            }
        }
    }

    async fn delete_object(&self, reference: &ObjectReference) -> Result<(), StorageError> {
        let mut request = self
            .s3_client
            .delete_object()
            .bucket(reference.base_directory())
            .key(reference.object_key());

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        request.send().await.map_err(|err| StorageError::NetworkError {
            message: err.to_string(),
            retryable: true,
        })?;

        Ok(())
    }

    async fn delete_base_directory(&self, base_directory: &str) -> Result<(), StorageError> {
        // Buckets must be emptied before deletion.
        let mut continuation_token: Option<String> = None;
        loop {
            let mut request = self.s3_client.list_objects_v2().bucket(base_directory);
            if let Some(ref token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(|err| {
                let service_err = err.into_service_error();
                if service_err.is_no_such_bucket() {
                    StorageError::NotFound {
                        base_directory: base_directory.to_string(),
                        key: String::new(),
                    }
                } else {
                    StorageError::NetworkError {
                        message: service_err.to_string(),
                        retryable: true,
                    }
                }
            })?;

            let identifiers: Vec<ObjectIdentifier> = response
                .contents()
                .iter()
                .filter_map(|object| object.key())
                .map(|key| {
                    ObjectIdentifier::builder()
                        .key(key)
                        .build()
                        .map_err(|e| StorageError::Other {
                            message: e.to_string(),
                        })
                })
                .collect::<Result<_, _>>()?;

            if !identifiers.is_empty() {
                let delete = Delete::builder()
                    .set_objects(Some(identifiers))
                    .build()
                    .map_err(|e| StorageError::Other {
                        message: e.to_string(),
                    })?;
                self.s3_client
                    .delete_objects()
                    .bucket(base_directory)
                    .delete(delete)
                    .send()
                    .await
                    .map_err(|err| StorageError::NetworkError {
                        message: err.to_string(),
                        retryable: true,
                    })?;
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token.clone();
            } else {
                break;
            }
        }

        self.s3_client
            .delete_bucket()
            .bucket(base_directory)
            .send()
            .await
            .map_err(|err| StorageError::NetworkError {
                message: err.to_string(),
                retryable: true,
            })?;

        Ok(())
    }

    async fn copy_object(
        &self,
        source: &ObjectReference,
        target: &ObjectReference,
    ) -> Result<(), StorageError> {
        let copy_source: String =
            format!("{}/{}", source.base_directory(), source.object_key());

        let mut request = self
            .s3_client
            .copy_object()
            .copy_source(copy_source)
            .bucket(target.base_directory())
            .key(target.object_key());

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        request.send().await.map_err(|err| StorageError::NetworkError {
            message: err.to_string(),
            retryable: true,
        })?;

        Ok(())
    }

    async fn list_page(
        &self,
        directory: &ObjectDirectory,
        continuation: Option<&str>,
        max_page_size: usize,
    ) -> Result<ListPage<ObjectReference>, StorageError> {
        let prefix: String = match directory.relative_directory() {
            Some(dir) => format!("{}/", dir),
            None => String::new(),
        };

        let mut request = self
            .s3_client
            .list_objects_v2()
            .bucket(directory.base_directory())
            .prefix(&prefix)
            .max_keys(max_page_size as i32);

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        if let Some(token) = continuation {
            request = request.continuation_token(token);
        }

        let response = request.send().await.map_err(|err| StorageError::NetworkError {
            message: err.to_string(),
            retryable: true,
        })?;

        let mut entities: Vec<ObjectReference> = Vec::new();
        if let Some(ref contents) = response.contents {
            for object in contents {
                let Some(key) = object.key() else { continue };
                // Simulated-directory placeholders are not objects.
                if key.ends_with('/') {
                    continue;
                }
                entities.push(ObjectReference::from_key(directory.base_directory(), key)?);
            }
        }

        let continuation: Option<String> = if response.is_truncated() == Some(true) {
            response.next_continuation_token.clone()
        } else {
            None
        };

        Ok(ListPage {
            entities,
            continuation,
        })
    }

    async fn upload_url(
        &self,
        reference: &ObjectReference,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(expires_in).map_err(|e| {
            StorageError::InvalidExpiry {
                message: e.to_string(),
            }
        })?;

        let request = self
            .s3_client
            .put_object()
            .bucket(reference.base_directory())
            .key(reference.object_key())
            .presigned(presigning)
            .await
            .map_err(|err| StorageError::NetworkError {
                message: err.to_string(),
                retryable: false,
            })?;

        Ok(request.uri().to_string())
    }

    async fn download_url(
        &self,
        reference: &ObjectReference,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(expires_in).map_err(|e| {
            StorageError::InvalidExpiry {
                message: e.to_string(),
            }
        })?;

        let request = self
            .s3_client
            .get_object()
            .bucket(reference.base_directory())
            .key(reference.object_key())
            .presigned(presigning)
            .await
            .map_err(|err| StorageError::NetworkError {
                message: err.to_string(),
                retryable: false,
            })?;

        Ok(request.uri().to_string())
    }

    async fn upload_config(
        &self,
        directory: &ObjectDirectory,
        expires_in: Duration,
    ) -> Result<TransferConfig, StorageError> {
        self.transfer_config(directory, expires_in).await
    }

    async fn download_config(
        &self,
        directory: &ObjectDirectory,
        expires_in: Duration,
    ) -> Result<TransferConfig, StorageError> {
        self.transfer_config(directory, expires_in).await
    }
}
