//! Messages passed between pipeline stages.

use serde_json::Value;

/// Verbatim relocation of a raw object to its published key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTask {
    /// Raw object key.
    pub source_key: String,
    /// Published data key.
    pub dest_key: String,
}

/// Redaction and upload of an imaging header.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataTask {
    /// Raw object the header was decoded from.
    pub source_key: String,
    /// Published metadata key.
    pub metadata_key: String,
    /// Decoded, not yet redacted header.
    pub header: Value,
}

/// Which routing path an object took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClass {
    Image,
    ClinicalFile,
}

/// Terminal or hand-off state of a raw object after routing.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// Neither an imaging nor a clinical file.
    Ignored,
    /// Date or patient id could not be extracted; picked up again next run.
    NotReady(ObjectClass),
    /// Both halves of an imaging file are already known to the key cache.
    CachedSkip,
    /// Target keys were checked; tasks are emitted for those still missing.
    Routed {
        class: ObjectClass,
        copy: Option<CopyTask>,
        metadata: Option<MetadataTask>,
    },
}

impl RouteOutcome {
    /// Whether routing found nothing left to publish.
    pub fn is_already_published(&self) -> bool {
        matches!(
            self,
            RouteOutcome::Routed {
                copy: None,
                metadata: None,
                ..
            }
        )
    }
}

/// Result of executing a publish task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publication {
    /// The store was mutated.
    Performed,
    /// Dry run: the action was logged but not executed.
    Planned,
}
