//! Imaging header decoding and metadata redaction.
//!
//! Imaging files are decoded header-only (pixel data is never read) into the
//! DICOM JSON model, a generic tree of objects, arrays and scalars. The
//! redactor then nulls bulk binary payloads and VOI LUT transform data
//! wherever they occur in that tree before the metadata is published.

mod decoder;
mod error;
pub mod record;
pub mod redact;

pub use decoder::{DicomHeaderDecoder, HeaderDecoder};
pub use error::DecodeError;
pub use record::{ImagingRecord, Modality, MODALITY_TAG, PATIENT_ID_TAG};
pub use redact::{nullify_fields, nullify_matching, redact, INLINE_BINARY, REDACTED_FIELDS, VOI_LUT_SEQUENCE};
