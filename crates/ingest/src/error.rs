//! Error types for ingestion.

use thiserror::Error;
use warehouse_common::ConfigError;
use warehouse_imaging::DecodeError;
use warehouse_storage::StorageError;

/// Errors that can occur while ingesting an object or starting a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// A store operation failed for a reason other than "not found".
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An imaging header could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Redacted metadata could not be serialized.
    #[error("Failed to encode metadata for {key}: {message}")]
    Encode { key: String, message: String },

    /// Invalid run configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Coarse classification of a failure, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    StoreAccess,
    Decode,
    Encode,
    Config,
}

impl IngestError {
    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            IngestError::Storage(_) => FailureKind::StoreAccess,
            IngestError::Decode(_) => FailureKind::Decode,
            IngestError::Encode { .. } => FailureKind::Encode,
            IngestError::Config(_) => FailureKind::Config,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name: &str = match self {
            FailureKind::StoreAccess => "store-access",
            FailureKind::Decode => "decode",
            FailureKind::Encode => "encode",
            FailureKind::Config => "config",
        };
        f.write_str(name)
    }
}

/// Non-fatal error encountered while processing one raw object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFailure {
    /// The raw key (or listing prefix) that failed.
    pub key: String,
    /// The error that occurred.
    pub error: IngestError,
}

impl ObjectFailure {
    /// Create a new object failure.
    pub fn new(key: impl Into<String>, error: IngestError) -> Self {
        Self {
            key: key.into(),
            error,
        }
    }

    /// Kind of the underlying error.
    pub fn kind(&self) -> FailureKind {
        self.error.kind()
    }
}
