//! Classification of raw objects by key.

use std::sync::LazyLock;

use regex::Regex;
use warehouse_common::{has_extension, key_file_stem, DICOM_EXTENSION, JSON_EXTENSION};

/// `<patient id>_<data|status>`, with a greedy patient id.
static CLINICAL_STEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<patient_id>.*)_(?P<outcome>data|status)$").expect("valid regex")
});

/// Variant of a clinical outcome file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Data,
    Status,
}

impl OutcomeKind {
    /// Suffix used in raw file names and published keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Data => "data",
            OutcomeKind::Status => "status",
        }
    }
}

/// Attributes parsed from a clinical outcome file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClinicalFile {
    /// Patient identifier, case preserved. May be empty.
    pub patient_id: String,
    /// Which outcome file this is.
    pub outcome: OutcomeKind,
}

impl ClinicalFile {
    /// Parse a file stem such as `P001_data`.
    ///
    /// # Returns
    /// `None` when the stem has no `_data` / `_status` suffix.
    pub fn parse(stem: &str) -> Option<Self> {
        let captures = CLINICAL_STEM.captures(stem)?;
        let outcome: OutcomeKind = match &captures["outcome"] {
            "data" => OutcomeKind::Data,
            _ => OutcomeKind::Status,
        };
        Some(Self {
            patient_id: captures["patient_id"].to_string(),
            outcome,
        })
    }
}

/// What a raw object is, decided from its key alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    /// Imaging file (`.dcm`).
    Image,
    /// Clinical outcome file (`<patient>_<data|status>.json`).
    ClinicalFile(ClinicalFile),
    /// Anything else; dropped silently.
    Ignored,
}

impl ObjectKind {
    /// Classify a raw object key.
    ///
    /// # Arguments
    /// * `key` - Raw object key
    pub fn classify(key: &str) -> Self {
        if has_extension(key, DICOM_EXTENSION) {
            return ObjectKind::Image;
        }
        if has_extension(key, JSON_EXTENSION) {
            if let Some(file) = ClinicalFile::parse(key_file_stem(key)) {
                return ObjectKind::ClinicalFile(file);
            }
        }
        ObjectKind::Ignored
    }
}
