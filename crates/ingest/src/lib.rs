//! Raw drop ingestion pipeline.
//!
//! Objects dropped under `raw/<date>/` are classified, routed to a
//! patient-stable partition and published under the normalized layout:
//!
//! ```text
//! <partition>/<modality>/<patient-id>/<date>/<file name>
//! <partition>/<modality>-metadata/<patient-id>/<date>/<image id>.json
//! <partition>/data/<patient-id>/<date>/<data|status>.json
//! ```
//!
//! Publication is idempotent: every target key is checked before it is
//! written, so a rerun after a crash only publishes what is still missing.
//!
//! # Example
//!
//! ```ignore
//! use warehouse_imaging::DicomHeaderDecoder;
//! use warehouse_ingest::{IngestOptions, IngestOrchestrator};
//!
//! let options = IngestOptions::new("chest-data-warehouse").with_max_concurrency(16);
//! let orchestrator = IngestOrchestrator::new(&client, &DicomHeaderDecoder, options)?;
//! let report = orchestrator.run().await?;
//! ```

mod classify;
mod error;
mod options;
mod orchestrator;
mod report;
mod routing;
mod task;

pub use classify::{ClinicalFile, ObjectKind, OutcomeKind};
pub use error::{FailureKind, IngestError, ObjectFailure};
pub use options::{IngestOptions, DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_CONCURRENCY};
pub use orchestrator::IngestOrchestrator;
pub use report::IngestReport;
pub use routing::{ImageKeys, KeyRouter};
pub use task::{CopyTask, MetadataTask, ObjectClass, Publication, RouteOutcome};
