//! Shared error types used across warehouse crates.

use thiserror::Error;

/// Invalid configuration detected before a run starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Training share must be a percentage.
    #[error("Training percent must be between 0 and 100, got {value}")]
    TrainingPercentOutOfRange {
        /// The rejected value.
        value: u8,
    },

    /// A numeric option that must be positive was zero.
    #[error("{option} must be greater than zero")]
    ZeroValue {
        /// Name of the offending option.
        option: &'static str,
    },

    /// Required option was empty.
    #[error("{option} must not be empty")]
    Empty {
        /// Name of the offending option.
        option: &'static str,
    },
}
