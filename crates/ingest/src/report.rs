//! Aggregated results of an ingestion run.

use crate::error::ObjectFailure;
use crate::task::{ObjectClass, Publication, RouteOutcome};

/// Counters and failures collected across all stages of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Raw objects listed.
    pub objects_discovered: u64,
    /// Objects classified as imaging files.
    pub images: u64,
    /// Objects classified as clinical outcome files.
    pub clinical_files: u64,
    /// Objects that were neither.
    pub ignored: u64,
    /// Objects skipped because date or patient id was missing.
    pub not_ready: u64,
    /// Imaging files skipped by the key cache pre-check.
    pub cached_skips: u64,
    /// Objects whose target keys all existed already.
    pub already_published: u64,
    /// Server-side copies performed.
    pub copies: u64,
    /// Metadata documents uploaded.
    pub metadata_uploads: u64,
    /// Copies that a dry run would have performed.
    pub planned_copies: u64,
    /// Uploads that a dry run would have performed.
    pub planned_uploads: u64,
    /// Objects that failed (non-fatal).
    pub failures: Vec<ObjectFailure>,
}

impl IngestReport {
    /// Count a routing outcome.
    pub fn record_outcome(&mut self, outcome: &RouteOutcome) {
        match outcome {
            RouteOutcome::Ignored => self.ignored += 1,
            RouteOutcome::NotReady(class) => {
                self.count_class(*class);
                self.not_ready += 1;
            }
            RouteOutcome::CachedSkip => {
                self.count_class(ObjectClass::Image);
                self.cached_skips += 1;
            }
            RouteOutcome::Routed { class, .. } => {
                self.count_class(*class);
                if outcome.is_already_published() {
                    self.already_published += 1;
                }
            }
        }
    }

    /// Count a finished copy task.
    pub fn record_copy(&mut self, publication: Publication) {
        match publication {
            Publication::Performed => self.copies += 1,
            Publication::Planned => self.planned_copies += 1,
        }
    }

    /// Count a finished metadata task.
    pub fn record_upload(&mut self, publication: Publication) {
        match publication {
            Publication::Performed => self.metadata_uploads += 1,
            Publication::Planned => self.planned_uploads += 1,
        }
    }

    /// Record a failed object.
    pub fn record_failure(&mut self, failure: ObjectFailure) {
        self.failures.push(failure);
    }

    /// Store-mutating calls issued during the run.
    pub fn mutations(&self) -> u64 {
        self.copies + self.metadata_uploads
    }

    /// Whether every object was processed without error.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Merge another report into this one.
    pub fn merge(&mut self, other: Self) {
        self.objects_discovered += other.objects_discovered;
        self.images += other.images;
        self.clinical_files += other.clinical_files;
        self.ignored += other.ignored;
        self.not_ready += other.not_ready;
        self.cached_skips += other.cached_skips;
        self.already_published += other.already_published;
        self.copies += other.copies;
        self.metadata_uploads += other.metadata_uploads;
        self.planned_copies += other.planned_copies;
        self.planned_uploads += other.planned_uploads;
        self.failures.extend(other.failures);
    }

    fn count_class(&mut self, class: ObjectClass) {
        match class {
            ObjectClass::Image => self.images += 1,
            ObjectClass::ClinicalFile => self.clinical_files += 1,
        }
    }
}
