//! AWS SDK S3 client implementation.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use tracing::debug;

use warehouse_storage::{ObjectInfo, ObjectPage, StorageClient, StorageError, StorageSettings};

use crate::error::CrtError;

/// StorageClient implementation using AWS SDK for Rust.
///
/// This client provides S3 operations with the SDK's automatic retry and
/// connection pooling.
pub struct CrtStorageClient {
    /// The underlying S3 client.
    s3_client: S3Client,
    /// Expected bucket owner for security validation.
    expected_bucket_owner: Option<String>,
}

impl CrtStorageClient {
    /// Create a new storage client with the default credential chain.
    ///
    /// # Arguments
    /// * `settings` - Storage settings including region, optional credentials and endpoint
    ///
    /// # Returns
    /// A new storage client.
    pub async fn new(settings: StorageSettings) -> Result<Self, StorageError> {
        if settings.region.trim().is_empty() {
            return Err(CrtError::ConfigError("region must not be empty".into()).into());
        }

        let mut config_loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(settings.region.clone()));

        if let Some(ref creds) = settings.credentials {
            let credentials = Credentials::new(
                &creds.access_key_id,
                &creds.secret_access_key,
                creds.session_token.clone(),
                None,
                "warehouse-loader",
            );
            config_loader = config_loader.credentials_provider(credentials);
        }

        if let Some(ref endpoint) = settings.endpoint_url {
            config_loader = config_loader.endpoint_url(endpoint);
        }

        let sdk_config = config_loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.force_path_style)
            .build();

        Ok(Self {
            s3_client: S3Client::from_conf(s3_config),
            expected_bucket_owner: settings.expected_bucket_owner,
        })
    }

    /// Create a client from an existing S3Client (for testing).
    ///
    /// # Arguments
    /// * `s3_client` - Pre-configured S3 client
    /// * `expected_bucket_owner` - Optional expected bucket owner
    pub fn from_client(s3_client: S3Client, expected_bucket_owner: Option<String>) -> Self {
        Self {
            s3_client,
            expected_bucket_owner,
        }
    }
}

/// Build the URL-encoded `CopySource` value for a server-side copy.
///
/// # Arguments
/// * `bucket` - Source bucket
/// * `key` - Source key
///
/// # Returns
/// `{bucket}/{key}` with every byte outside the unreserved set and `/` percent-encoded.
pub fn copy_source(bucket: &str, key: &str) -> String {
    let mut encoded: String = String::with_capacity(bucket.len() + key.len() + 1);
    for byte in bucket.bytes().chain(std::iter::once(b'/')).chain(key.bytes()) {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Map a failed SDK request to a `StorageError`.
///
/// Every failure other than "not found" is reported as retryable, whatever
/// the operation.
fn sdk_failure(message: impl std::fmt::Display) -> StorageError {
    CrtError::SdkError {
        message: message.to_string(),
        retryable: true,
    }
    .into()
}

#[async_trait]
impl StorageClient for CrtStorageClient {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, StorageError> {
        let mut request = self.s3_client.head_object().bucket(bucket).key(key);

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        match request.send().await {
            Ok(output) => Ok(Some(output.content_length().map(|l| l as u64).unwrap_or(0))),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(None)
                } else {
                    Err(sdk_failure(service_err))
                }
            }
        }
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let mut request = self.s3_client.get_object().bucket(bucket).key(key);

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        let response = request.send().await.map_err(|err| {
            let service_err = err.into_service_error();
            if service_err.is_no_such_key() {
                StorageError::not_found(bucket, key)
            } else {
                sdk_failure(service_err)
            }
        })?;

        let data: Vec<u8> = response
            .body
            .collect()
            .await
            .map_err(sdk_failure)?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        let body = ByteStream::from(data.to_vec());

        let mut request = self
            .s3_client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body);

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        request.send().await.map_err(sdk_failure)?;

        Ok(())
    }

    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), StorageError> {
        debug!(bucket, source_key, dest_key, "Copying object");
        let mut request = self
            .s3_client
            .copy_object()
            .bucket(bucket)
            .copy_source(copy_source(bucket, source_key))
            .key(dest_key);

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request
                .expected_bucket_owner(owner)
                .expected_source_bucket_owner(owner);
        }

        request.send().await.map_err(|err| sdk_failure(err.into_service_error()))?;

        Ok(())
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, StorageError> {
        let mut request = self
            .s3_client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix);

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        if let Some(token) = continuation_token {
            request = request.continuation_token(token);
        }

        let response = request.send().await.map_err(sdk_failure)?;

        let mut objects: Vec<ObjectInfo> = Vec::new();
        if let Some(ref contents) = response.contents {
            for obj in contents {
                let last_modified: Option<i64> = obj
                    .last_modified()
                    .and_then(|dt| dt.to_millis().ok())
                    .map(|ms| ms / 1000);

                objects.push(ObjectInfo {
                    key: obj.key().unwrap_or_default().to_string(),
                    size: obj.size().map(|s| s as u64).unwrap_or(0),
                    last_modified,
                    etag: obj.e_tag().map(|s| s.to_string()),
                });
            }
        }

        let next_token: Option<String> = if response.is_truncated() == Some(true) {
            response.next_continuation_token.clone()
        } else {
            None
        };

        Ok(ObjectPage {
            objects,
            next_token,
        })
    }

    async fn list_common_prefixes(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
    ) -> Result<Vec<String>, StorageError> {
        let mut prefixes: Vec<String> = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .s3_client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .delimiter(delimiter);

            if let Some(ref owner) = self.expected_bucket_owner {
                request = request.expected_bucket_owner(owner);
            }

            if let Some(ref token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(sdk_failure)?;

            if let Some(ref common_prefixes) = response.common_prefixes {
                prefixes.extend(
                    common_prefixes
                        .iter()
                        .filter_map(|cp| cp.prefix().map(|p| p.to_string())),
                );
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token.clone();
            } else {
                break;
            }
        }

        Ok(prefixes)
    }
}
