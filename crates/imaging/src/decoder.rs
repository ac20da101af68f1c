//! Imaging header decoder contract and DICOM implementation.

use std::io::Cursor;

use dicom_dictionary_std::tags;
use dicom_object::file::ReadPreamble;
use dicom_object::{InMemDicomObject, OpenFileOptions};
use serde_json::Value;

use crate::error::DecodeError;

/// Decodes the non-pixel header of an imaging file.
pub trait HeaderDecoder: Send + Sync {
    /// Decode the header of an imaging file.
    ///
    /// # Arguments
    /// * `data` - Complete file bytes
    ///
    /// # Returns
    /// The header as a DICOM JSON model tree, keyed by 8-digit tag.
    fn decode(&self, data: &[u8]) -> Result<Value, DecodeError>;
}

/// DICOM Part 10 decoder that stops before pixel data.
#[derive(Debug, Clone, Copy, Default)]
pub struct DicomHeaderDecoder;

impl DicomHeaderDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self
    }
}

impl HeaderDecoder for DicomHeaderDecoder {
    fn decode(&self, data: &[u8]) -> Result<Value, DecodeError> {
        let object = OpenFileOptions::new()
            .read_preamble(ReadPreamble::Auto)
            .read_until(tags::PIXEL_DATA)
            .from_reader(Cursor::new(data.to_vec()))
            .map_err(|e| DecodeError::Malformed {
                message: e.to_string(),
            })?;

        // Only the data set is published; the file meta group is transport detail.
        let dataset: &InMemDicomObject = &object;
        dicom_json::to_value(dataset).map_err(|e| DecodeError::Conversion {
            message: e.to_string(),
        })
    }
}
