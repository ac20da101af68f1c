//! Storage traits/interfaces for object store operations.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use crate::error::StorageError;

/// Information about an object from list/head operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Object key.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last modified timestamp (Unix epoch seconds).
    pub last_modified: Option<i64>,
    /// ETag (usually MD5 hash for non-multipart uploads).
    pub etag: Option<String>,
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    /// Objects on this page, in key order.
    pub objects: Vec<ObjectInfo>,
    /// Token for the next page; `None` on the last page.
    pub next_token: Option<String>,
}

/// Low-level bucket operations - implemented by each backend.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Check if an object exists and return its size.
    /// Returns None if object doesn't exist; any other failure is an error.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, StorageError>;

    /// Check if an object exists.
    ///
    /// "Not found" is the expected negative answer and maps to `Ok(false)`.
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        Ok(self.head_object(bucket, key).await?.is_some())
    }

    /// Download object to bytes.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Upload bytes, overwriting any existing object at `key`.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: Option<&str>,
    ) -> Result<(), StorageError>;

    /// Server-side copy of an object within a bucket.
    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), StorageError>;

    /// List one page of objects under `prefix`.
    ///
    /// # Arguments
    /// * `bucket` - Bucket name
    /// * `prefix` - Key prefix
    /// * `continuation_token` - Token from the previous page, `None` for the first page
    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, StorageError>;

    /// List the distinct "folders" directly under `prefix`.
    ///
    /// # Returns
    /// Common prefixes including the trailing delimiter, e.g. `raw/2022-01-05/`.
    async fn list_common_prefixes(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
    ) -> Result<Vec<String>, StorageError>;

    /// Lazily list all objects under `prefix`.
    ///
    /// Pages are fetched on demand, so a consumer that stops early never
    /// requests the remaining pages. Each call starts a fresh listing.
    fn list_objects<'a>(
        &'a self,
        bucket: &'a str,
        prefix: &'a str,
    ) -> BoxStream<'a, Result<ObjectInfo, StorageError>> {
        // State: Some(token) while pages remain, None once the last page was read.
        stream::try_unfold(Some(None::<String>), move |state| async move {
            let Some(token) = state else {
                return Ok::<_, StorageError>(None);
            };
            let page: ObjectPage = self.list_objects_page(bucket, prefix, token).await?;
            let next_state: Option<Option<String>> = page.next_token.map(Some);
            let objects = stream::iter(page.objects.into_iter().map(Ok::<_, StorageError>));
            Ok::<_, StorageError>(Some((objects, next_state)))
        })
        .try_flatten()
        .boxed()
    }
}
