//! Error types for imaging header decoding.

use thiserror::Error;

/// Errors that can occur while decoding an imaging header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The file is not a readable DICOM file.
    #[error("Malformed imaging file: {message}")]
    Malformed { message: String },

    /// The header was read but could not be converted to the JSON model.
    #[error("Header conversion failed: {message}")]
    Conversion { message: String },
}
