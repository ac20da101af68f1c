//! Shared constants used across warehouse crates.

/// Prefix of the date-partitioned raw drop area.
pub const RAW_PREFIX: &str = "raw/";

/// Prefix of the training partition.
pub const TRAINING_PREFIX: &str = "training/";

/// Prefix of the validation partition.
pub const VALIDATION_PREFIX: &str = "validation/";

/// Delimiter used for folder-style listings.
pub const KEY_DELIMITER: &str = "/";

/// Default share of patients (in percent) assigned to the training partition.
///
/// Changing this value reshuffles patients between partitions for every
/// future run, so it is fixed for the lifetime of a dataset.
pub const DEFAULT_TRAINING_PERCENT: u8 = 60;

/// Default bucket holding the warehouse.
pub const DEFAULT_BUCKET: &str = "chest-data-warehouse";

/// Extension of imaging files in the raw drop.
pub const DICOM_EXTENSION: &str = "dcm";

/// Extension of clinical outcome files and published metadata.
pub const JSON_EXTENSION: &str = "json";

/// Content type used for published metadata documents.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Folder name under a partition for clinical outcome files.
pub const CLINICAL_DATA_FOLDER: &str = "data";

/// Suffix appended to a modality folder for redacted metadata.
pub const METADATA_FOLDER_SUFFIX: &str = "-metadata";
