//! Target key derivation for published objects.
//!
//! Routing is a pure function of partition, modality (or `data`), patient id,
//! drop date and file name; the same raw object always maps to the same keys.

use warehouse_common::{
    date_from_key, key_file_name, key_file_stem, Partition, PartitionAssigner,
    CLINICAL_DATA_FOLDER, JSON_EXTENSION, METADATA_FOLDER_SUFFIX, RAW_PREFIX,
};
use warehouse_imaging::Modality;

use crate::classify::OutcomeKind;

/// Target keys for one imaging file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageKeys {
    /// Partition the patient belongs to.
    pub partition: Partition,
    /// Where the imaging file is copied to.
    pub data_key: String,
    /// Where the redacted metadata is uploaded to.
    pub metadata_key: String,
}

/// Derives publication keys from raw keys and extracted attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyRouter {
    assigner: PartitionAssigner,
}

impl KeyRouter {
    /// Create a router using the given partition assigner.
    pub fn new(assigner: PartitionAssigner) -> Self {
        Self { assigner }
    }

    /// Partition of a patient.
    pub fn partition_for(&self, patient_id: &str) -> Partition {
        self.assigner.assign(patient_id)
    }

    /// Drop date of a raw key, if the key follows `raw/<date>/...`.
    ///
    /// Callers skip objects without a date; they are not ready for routing.
    pub fn date_for<'k>(&self, raw_key: &'k str) -> Option<&'k str> {
        date_from_key(raw_key, RAW_PREFIX)
    }

    /// Route an imaging file.
    ///
    /// # Arguments
    /// * `raw_key` - Raw object key; its file name and stem are reused
    /// * `patient_id` - Patient id from the header
    /// * `modality` - Modality bucket from the header
    /// * `date` - Drop date extracted from `raw_key`
    ///
    /// # Returns
    /// `<partition>/<modality>/<patient>/<date>/<file name>` and
    /// `<partition>/<modality>-metadata/<patient>/<date>/<stem>.json`.
    pub fn route_image(
        &self,
        raw_key: &str,
        patient_id: &str,
        modality: Modality,
        date: &str,
    ) -> ImageKeys {
        let partition: Partition = self.partition_for(patient_id);
        let data_key: String = format!(
            "{}{}/{}/{}/{}",
            partition.prefix(),
            modality.folder(),
            patient_id,
            date,
            key_file_name(raw_key)
        );
        let metadata_key: String = format!(
            "{}{}{}/{}/{}/{}.{}",
            partition.prefix(),
            modality.folder(),
            METADATA_FOLDER_SUFFIX,
            patient_id,
            date,
            key_file_stem(raw_key),
            JSON_EXTENSION
        );
        ImageKeys {
            partition,
            data_key,
            metadata_key,
        }
    }

    /// Route a clinical outcome file.
    ///
    /// # Arguments
    /// * `patient_id` - Patient id from the file name
    /// * `outcome` - Outcome variant from the file name
    /// * `date` - Drop date extracted from the raw key
    ///
    /// # Returns
    /// `<partition>/data/<patient>/<date>/<data|status>.json`.
    pub fn route_clinical_file(&self, patient_id: &str, outcome: OutcomeKind, date: &str) -> String {
        let partition: Partition = self.partition_for(patient_id);
        format!(
            "{}{}/{}/{}/{}.{}",
            partition.prefix(),
            CLINICAL_DATA_FOLDER,
            patient_id,
            date,
            outcome.as_str(),
            JSON_EXTENSION
        )
    }
}
