//! In-memory storage client.
//!
//! Implements the full [`StorageClient`] contract over a map, for tests and
//! local dry runs. Every mutating call is counted so callers can assert that
//! a rerun issued no writes. Individual keys can be marked as failing to
//! exercise error paths.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::traits::{ObjectInfo, ObjectPage, StorageClient};

/// Default number of objects returned per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// A stored object.
#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: Option<String>,
}

/// Storage client backed by an in-process map.
#[derive(Debug)]
pub struct MemoryStorageClient {
    /// Objects keyed by `(bucket, key)`.
    objects: RwLock<BTreeMap<(String, String), StoredObject>>,
    /// Keys for which every operation fails with `AccessDenied`.
    failing_keys: RwLock<HashSet<String>>,
    /// Objects per listing page.
    page_size: usize,
    puts: AtomicU64,
    copies: AtomicU64,
    heads: AtomicU64,
    gets: AtomicU64,
}

impl Default for MemoryStorageClient {
    fn default() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            failing_keys: RwLock::new(HashSet::new()),
            page_size: DEFAULT_PAGE_SIZE,
            puts: AtomicU64::new(0),
            copies: AtomicU64::new(0),
            heads: AtomicU64::new(0),
            gets: AtomicU64::new(0),
        }
    }
}

impl MemoryStorageClient {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of objects returned per listing page.
    ///
    /// # Arguments
    /// * `page_size` - Objects per page (at least 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Seed an object without counting it as a mutation.
    pub fn insert(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.write_objects().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data,
                content_type: None,
            },
        );
    }

    /// Make every operation touching `key` fail.
    pub fn fail_key(&self, key: &str) {
        self.failing_keys
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string());
    }

    /// Read an object's bytes without counting it as a request.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.read_objects()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o: &StoredObject| o.data.clone())
    }

    /// Content type an object was stored with.
    pub fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.read_objects()
            .get(&(bucket.to_string(), key.to_string()))
            .and_then(|o: &StoredObject| o.content_type.clone())
    }

    /// All keys in a bucket, in order.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.read_objects()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// Number of `put_object` calls that succeeded.
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }

    /// Number of `copy_object` calls that succeeded.
    pub fn copy_count(&self) -> u64 {
        self.copies.load(Ordering::Relaxed)
    }

    /// Number of store-mutating calls (puts and copies).
    pub fn mutation_count(&self) -> u64 {
        self.put_count() + self.copy_count()
    }

    /// Number of `head_object` calls.
    pub fn head_count(&self) -> u64 {
        self.heads.load(Ordering::Relaxed)
    }

    /// Number of `get_object` calls.
    pub fn get_count(&self) -> u64 {
        self.gets.load(Ordering::Relaxed)
    }

    fn read_objects(&self) -> RwLockReadGuard<'_, BTreeMap<(String, String), StoredObject>> {
        self.objects.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_objects(&self) -> RwLockWriteGuard<'_, BTreeMap<(String, String), StoredObject>> {
        self.objects.write().unwrap_or_else(|e| e.into_inner())
    }

    fn check_access(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let failing: bool = self
            .failing_keys
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key);
        if failing {
            return Err(StorageError::AccessDenied {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StorageClient for MemoryStorageClient {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, StorageError> {
        self.heads.fetch_add(1, Ordering::Relaxed);
        self.check_access(bucket, key)?;
        Ok(self
            .read_objects()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o: &StoredObject| o.data.len() as u64))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        self.check_access(bucket, key)?;
        self.object(bucket, key)
            .ok_or_else(|| StorageError::not_found(bucket, key))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        self.check_access(bucket, key)?;
        self.write_objects().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data: data.to_vec(),
                content_type: content_type.map(str::to_string),
            },
        );
        self.puts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), StorageError> {
        self.check_access(bucket, source_key)?;
        self.check_access(bucket, dest_key)?;
        let mut objects = self.write_objects();
        let source: StoredObject = objects
            .get(&(bucket.to_string(), source_key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::not_found(bucket, source_key))?;
        objects.insert((bucket.to_string(), dest_key.to_string()), source);
        drop(objects);
        self.copies.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, StorageError> {
        self.check_access(bucket, prefix)?;
        let objects = self.read_objects();
        let mut matching = objects
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .filter(|((_, k), _)| match continuation_token {
                Some(ref token) => k.as_str() > token.as_str(),
                None => true,
            })
            .map(|((_, k), o)| ObjectInfo {
                key: k.clone(),
                size: o.data.len() as u64,
                last_modified: None,
                etag: None,
            });

        let page: Vec<ObjectInfo> = matching.by_ref().take(self.page_size).collect();
        let has_more: bool = matching.next().is_some();
        let next_token: Option<String> = if has_more {
            page.last().map(|o: &ObjectInfo| o.key.clone())
        } else {
            None
        };

        Ok(ObjectPage {
            objects: page,
            next_token,
        })
    }

    async fn list_common_prefixes(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
    ) -> Result<Vec<String>, StorageError> {
        self.check_access(bucket, prefix)?;
        let prefixes: BTreeSet<String> = self
            .read_objects()
            .keys()
            .filter(|(b, _)| b == bucket)
            .filter_map(|(_, k)| {
                let rest: &str = k.strip_prefix(prefix)?;
                let index: usize = rest.find(delimiter)?;
                Some(format!("{}{}", prefix, &rest[..index + delimiter.len()]))
            })
            .collect();
        Ok(prefixes.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn seeded() -> MemoryStorageClient {
        let client: MemoryStorageClient = MemoryStorageClient::new().with_page_size(2);
        client.insert("bucket", "raw/2022-01-05/a.dcm", b"a".to_vec());
        client.insert("bucket", "raw/2022-01-05/b.dcm", b"bb".to_vec());
        client.insert("bucket", "raw/2022-01-06/c.json", b"{}".to_vec());
        client.insert("bucket", "raw/top-level.txt", b"x".to_vec());
        client.insert("bucket", "training/ct/P1/2022-01-05/d.dcm", b"d".to_vec());
        client.insert("other", "raw/2022-01-07/e.dcm", b"e".to_vec());
        client
    }

    #[tokio::test]
    async fn test_head_object() {
        let client: MemoryStorageClient = seeded();
        assert_eq!(client.head_object("bucket", "raw/2022-01-05/b.dcm").await, Ok(Some(2)));
        assert_eq!(client.head_object("bucket", "raw/missing.dcm").await, Ok(None));
        assert_eq!(client.object_exists("other", "raw/2022-01-05/a.dcm").await, Ok(false));
        assert_eq!(client.head_count(), 3);
    }

    #[tokio::test]
    async fn test_list_common_prefixes() {
        let client: MemoryStorageClient = seeded();
        let prefixes: Vec<String> = client
            .list_common_prefixes("bucket", "raw/", "/")
            .await
            .unwrap();
        assert_eq!(prefixes, vec!["raw/2022-01-05/", "raw/2022-01-06/"]);
    }

    #[tokio::test]
    async fn test_list_objects_pages_lazily() {
        let client: MemoryStorageClient = seeded();

        let first: ObjectPage = client.list_objects_page("bucket", "raw/", None).await.unwrap();
        assert_eq!(first.objects.len(), 2);
        assert_eq!(first.next_token.as_deref(), Some("raw/2022-01-05/b.dcm"));

        let keys: Vec<String> = client
            .list_objects("bucket", "raw/")
            .map_ok(|o: ObjectInfo| o.key)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(
            keys,
            vec![
                "raw/2022-01-05/a.dcm",
                "raw/2022-01-05/b.dcm",
                "raw/2022-01-06/c.json",
                "raw/top-level.txt",
            ]
        );
    }

    #[tokio::test]
    async fn test_copy_and_put_are_counted() {
        let client: MemoryStorageClient = seeded();
        client
            .copy_object("bucket", "raw/2022-01-05/a.dcm", "training/x-ray/P/2022-01-05/a.dcm")
            .await
            .unwrap();
        client
            .put_object("bucket", "training/x.json", b"{}", Some("application/json"))
            .await
            .unwrap();

        assert_eq!(client.copy_count(), 1);
        assert_eq!(client.put_count(), 1);
        assert_eq!(client.mutation_count(), 2);
        assert_eq!(
            client.object("bucket", "training/x-ray/P/2022-01-05/a.dcm"),
            Some(b"a".to_vec())
        );
        assert_eq!(
            client.content_type("bucket", "training/x.json").as_deref(),
            Some("application/json")
        );
    }

    #[tokio::test]
    async fn test_copy_missing_source_is_not_found() {
        let client: MemoryStorageClient = seeded();
        let result = client.copy_object("bucket", "raw/nope.dcm", "training/nope.dcm").await;
        assert_eq!(result, Err(StorageError::not_found("bucket", "raw/nope.dcm")));
        assert_eq!(client.copy_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_key() {
        let client: MemoryStorageClient = seeded();
        client.fail_key("raw/2022-01-05/a.dcm");

        let err: StorageError = client
            .head_object("bucket", "raw/2022-01-05/a.dcm")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AccessDenied { .. }));
        assert!(client.get_object("bucket", "raw/2022-01-05/b.dcm").await.is_ok());
    }
}
