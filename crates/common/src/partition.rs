//! Deterministic patient partition assignment.
//!
//! A patient is mapped to a partition by hashing the upper-cased identifier
//! with SHA-512, reading the digest as a big-endian unsigned integer and
//! reducing it modulo 100. No assignment table is persisted: every run
//! recomputes the same answer for the same patient.

use sha2::{Digest, Sha512};

use crate::constants::{DEFAULT_TRAINING_PERCENT, TRAINING_PREFIX, VALIDATION_PREFIX};
use crate::error::ConfigError;

/// One of the two disjoint output partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Training,
    Validation,
}

impl Partition {
    /// Key prefix of this partition, including the trailing slash.
    pub fn prefix(&self) -> &'static str {
        match self {
            Partition::Training => TRAINING_PREFIX,
            Partition::Validation => VALIDATION_PREFIX,
        }
    }

    /// Human readable partition name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Training => "training",
            Partition::Validation => "validation",
        }
    }

    /// All partitions, in listing order.
    pub fn all() -> [Partition; 2] {
        [Partition::Training, Partition::Validation]
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute the hash slot (0..100) of a patient identifier.
///
/// # Arguments
/// * `patient_id` - Patient identifier, case-insensitive
///
/// # Returns
/// `sha512(upper(patient_id)) mod 100`, with the digest read big-endian.
pub fn partition_slot(patient_id: &str) -> u8 {
    let digest = Sha512::digest(patient_id.to_uppercase().as_bytes());
    // Horner reduction keeps the remainder exact without a bignum.
    let slot: u32 = digest
        .iter()
        .fold(0u32, |acc: u32, byte: &u8| (acc * 256 + u32::from(*byte)) % 100);
    slot as u8
}

/// Maps patients to partitions for a fixed training share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionAssigner {
    training_percent: u8,
}

impl Default for PartitionAssigner {
    fn default() -> Self {
        Self {
            training_percent: DEFAULT_TRAINING_PERCENT,
        }
    }
}

impl PartitionAssigner {
    /// Create an assigner with a custom training share.
    ///
    /// # Arguments
    /// * `training_percent` - Share of patients assigned to training (0..=100)
    ///
    /// # Errors
    /// Returns `ConfigError::TrainingPercentOutOfRange` above 100.
    pub fn new(training_percent: u8) -> Result<Self, ConfigError> {
        if training_percent > 100 {
            return Err(ConfigError::TrainingPercentOutOfRange {
                value: training_percent,
            });
        }
        Ok(Self { training_percent })
    }

    /// The configured training share.
    pub fn training_percent(&self) -> u8 {
        self.training_percent
    }

    /// Assign a patient to a partition.
    ///
    /// # Arguments
    /// * `patient_id` - Patient identifier
    ///
    /// # Returns
    /// `Partition::Training` iff the patient's slot is below the training share.
    pub fn assign(&self, patient_id: &str) -> Partition {
        if partition_slot(patient_id) < self.training_percent {
            Partition::Training
        } else {
            Partition::Validation
        }
    }
}
