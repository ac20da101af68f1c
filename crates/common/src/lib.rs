//! Shared types and utilities for the warehouse loader.
//!
//! This crate provides common functionality used across all warehouse crates:
//! - Bucket key layout constants
//! - Key path helpers (file name, stem, extension, raw drop date)
//! - Deterministic patient partition assignment
//! - Shared configuration error type

pub mod constants;
pub mod error;
pub mod partition;
pub mod path_utils;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::ConfigError;
pub use partition::{partition_slot, Partition, PartitionAssigner};
pub use path_utils::{date_from_key, has_extension, key_file_name, key_file_stem};
