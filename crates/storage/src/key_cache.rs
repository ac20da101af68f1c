//! Key cache for avoiding redundant existence checks.
//!
//! The key cache is an in-memory index of every key already published in the
//! training and validation partitions. Each key is recorded twice: by its full
//! key and by its file name alone, so a lookup can ask "does this file exist
//! anywhere" regardless of the exact path it was published under.
//!
//! The cache is populated once before a run fans out and is read-only
//! afterwards; it is not persisted and never sees keys published mid-run.

use std::collections::HashSet;

use futures::TryStreamExt;
use tracing::debug;
use warehouse_common::key_file_name;

use crate::error::StorageError;
use crate::traits::{ObjectInfo, StorageClient};

/// How a key is compared against cached entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Compare only the last path segment.
    #[default]
    FileName,
    /// Compare the complete key.
    FullPath,
}

/// In-memory existence index over published keys.
#[derive(Debug, Clone, Default)]
pub struct KeyCache {
    /// Complete keys.
    keys: HashSet<String>,
    /// File names (last key segment) of every added key.
    file_names: HashSet<String>,
}

impl KeyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache from every object under the given prefixes.
    ///
    /// # Arguments
    /// * `client` - Storage client used for listing
    /// * `bucket` - Bucket name
    /// * `prefixes` - Prefixes to enumerate, e.g. the partition prefixes
    ///
    /// # Errors
    /// Returns the first listing error.
    pub async fn load<C: StorageClient + ?Sized>(
        client: &C,
        bucket: &str,
        prefixes: &[&str],
    ) -> Result<Self, StorageError> {
        let mut cache: KeyCache = KeyCache::new();
        for prefix in prefixes {
            let objects: Vec<ObjectInfo> = client.list_objects(bucket, prefix).try_collect().await?;
            debug!(prefix = %prefix, count = objects.len(), "Loaded published keys");
            cache.extend(objects.into_iter().map(|object: ObjectInfo| object.key));
        }
        Ok(cache)
    }

    /// Record a key under both its full path and its file name.
    ///
    /// # Arguments
    /// * `key` - Object key
    pub fn add(&mut self, key: impl Into<String>) {
        let key: String = key.into();
        self.file_names.insert(key_file_name(&key).to_string());
        self.keys.insert(key);
    }

    /// Look up a key.
    ///
    /// # Arguments
    /// * `key` - Object key or bare file name
    /// * `mode` - Compare the file name only, or the complete key
    ///
    /// # Returns
    /// `true` if a previously added entry matches.
    pub fn exists(&self, key: &str, mode: MatchMode) -> bool {
        match mode {
            MatchMode::FileName => self.file_names.contains(key_file_name(key)),
            MatchMode::FullPath => self.keys.contains(key),
        }
    }

    /// Number of distinct full keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no key was added.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Extend<String> for KeyCache {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        for key in iter {
            self.add(key);
        }
    }
}

impl FromIterator<String> for KeyCache {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut cache: KeyCache = KeyCache::new();
        cache.extend(iter);
        cache
    }
}
