//! Object store abstraction for the warehouse loader.
//!
//! This crate provides a backend-agnostic interface for the bucket operations
//! the ingestion pipeline needs: prefix listings, existence checks, reads,
//! writes and server-side copies. Backends:
//!
//! - **AWS SDK backend** - `warehouse-storage-crt`, for S3 and S3-compatible stores
//! - **Memory backend** - [`MemoryStorageClient`], for tests and local runs
//!
//! # Key Cache
//!
//! [`KeyCache`] is an in-memory existence index populated once per run from
//! the published partitions. It answers "is this key (or this file name)
//! already published" without a HEAD request.

mod error;
pub mod key_cache;
pub mod memory;
mod traits;
mod types;

pub use error::StorageError;
pub use key_cache::{KeyCache, MatchMode};
pub use memory::MemoryStorageClient;
pub use traits::{ObjectInfo, ObjectPage, StorageClient};
pub use types::{AwsCredentials, StorageSettings, DEFAULT_REGION};
