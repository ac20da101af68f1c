//! Attributes extracted from a decoded imaging header.

use serde_json::Value;

/// DICOM JSON key of the PatientID attribute (0010,0020).
pub const PATIENT_ID_TAG: &str = "00100020";

/// DICOM JSON key of the Modality attribute (0008,0060).
pub const MODALITY_TAG: &str = "00080060";

/// Closed vocabulary of publication buckets for imaging modalities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    /// Digital radiography (`DX`) and computed radiography (`CR`).
    XRay,
    /// Magnetic resonance (`MR`).
    Mri,
    /// Computed tomography (`CT`).
    Ct,
    /// Any other or missing modality code. Still published.
    Unknown,
}

impl Modality {
    /// Map a DICOM modality code to its bucket.
    ///
    /// # Arguments
    /// * `code` - Modality code as stored in the header, e.g. `DX`
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "DX" | "CR" => Modality::XRay,
            "MR" => Modality::Mri,
            "CT" => Modality::Ct,
            _ => Modality::Unknown,
        }
    }

    /// Folder name used in published keys.
    pub fn folder(&self) -> &'static str {
        match self {
            Modality::XRay => "x-ray",
            Modality::Mri => "mri",
            Modality::Ct => "ct",
            Modality::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.folder())
    }
}

/// A decoded imaging header with the attributes routing needs.
///
/// Held in memory only between decode and publication.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagingRecord {
    /// Patient identifier, as stored in the header.
    pub patient_id: String,
    /// Modality bucket.
    pub modality: Modality,
    /// Drop date taken from the raw key.
    pub date: String,
    /// Full decoded header.
    pub header: Value,
}

impl ImagingRecord {
    /// Extract routing attributes from a decoded header.
    ///
    /// # Arguments
    /// * `header` - DICOM JSON model tree
    /// * `date` - Drop date segment of the raw key
    ///
    /// # Returns
    /// `None` when the header has no non-empty PatientID. A missing modality
    /// maps to [`Modality::Unknown`].
    pub fn from_header(header: Value, date: &str) -> Option<Self> {
        let patient_id: String = first_string_value(&header, PATIENT_ID_TAG)?;
        if patient_id.trim().is_empty() {
            return None;
        }
        let modality: Modality = first_string_value(&header, MODALITY_TAG)
            .map(|code: String| Modality::from_code(&code))
            .unwrap_or(Modality::Unknown);

        Some(Self {
            patient_id,
            modality,
            date: date.to_string(),
            header,
        })
    }
}

/// Read the first string value of an attribute in the DICOM JSON model.
fn first_string_value(header: &Value, tag: &str) -> Option<String> {
    header
        .get(tag)?
        .get("Value")?
        .get(0)?
        .as_str()
        .map(str::to_string)
}
