//! AWS SDK S3 backend for the warehouse loader.
//!
//! This crate provides a `StorageClient` implementation using the AWS SDK for Rust.
//! Custom endpoints and path-style addressing make it usable against
//! S3-compatible stores as well.
//!
//! # Example
//!
//! ```ignore
//! use warehouse_storage::StorageSettings;
//! use warehouse_storage_crt::CrtStorageClient;
//!
//! let settings = StorageSettings::default().with_region("eu-west-2");
//! let client = CrtStorageClient::new(settings).await?;
//! ```

mod client;
mod error;

pub use client::{copy_source, CrtStorageClient};
pub use error::CrtError;
