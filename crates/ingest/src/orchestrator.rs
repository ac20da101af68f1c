//! Ingestion orchestration over any `StorageClient`.
//!
//! A run is three stages wired by bounded channels:
//!
//! - **Routing** lists every `raw/<date>/` folder lazily, classifies each
//!   object, decodes imaging headers and checks which target keys are missing.
//!   It emits a [`CopyTask`] and/or a [`MetadataTask`] per object.
//! - **Copy** performs server-side copies of raw objects to their data keys.
//! - **Metadata** redacts decoded headers and uploads them as JSON.
//!
//! Each stage processes up to `max_concurrency` objects at once with
//! `buffer_unordered`. Objects are independent; a failure is recorded in the
//! report against its raw key and never stops sibling objects.
//!
//! # Example
//!
//! ```ignore
//! let orchestrator = IngestOrchestrator::new(&client, &DicomHeaderDecoder, options)?;
//! let report: IngestReport = orchestrator.run().await?;
//! for failure in &report.failures {
//!     eprintln!("{}: {}", failure.key, failure.error);
//! }
//! ```

use futures::channel::mpsc;
use futures::stream::{self, StreamExt};
use futures::SinkExt;
use tracing::{debug, info, warn};
use warehouse_common::{
    key_file_name, key_file_stem, Partition, PartitionAssigner, JSON_CONTENT_TYPE,
    JSON_EXTENSION, KEY_DELIMITER, RAW_PREFIX,
};
use warehouse_imaging::{redact, HeaderDecoder, ImagingRecord};
use warehouse_storage::{KeyCache, MatchMode, ObjectInfo, StorageClient, StorageError};

use crate::classify::{ClinicalFile, ObjectKind};
use crate::error::{IngestError, ObjectFailure};
use crate::options::IngestOptions;
use crate::report::IngestReport;
use crate::routing::{ImageKeys, KeyRouter};
use crate::task::{CopyTask, MetadataTask, ObjectClass, Publication, RouteOutcome};

/// Result of one listed entry in the routing stage.
enum Discovery {
    /// An object was listed and routed (or failed to route).
    Object {
        key: String,
        result: Result<RouteOutcome, IngestError>,
    },
    /// Listing a date folder failed part way.
    ListingFailed { prefix: String, error: StorageError },
}

/// Runs ingestion of the raw drop into the partitioned layout.
pub struct IngestOrchestrator<'a, C: StorageClient + ?Sized, D: HeaderDecoder + ?Sized> {
    /// Object store gateway.
    client: &'a C,
    /// Imaging header decoder.
    decoder: &'a D,
    /// Target key derivation.
    router: KeyRouter,
    /// Run options.
    options: IngestOptions,
}

impl<'a, C: StorageClient + ?Sized, D: HeaderDecoder + ?Sized> IngestOrchestrator<'a, C, D> {
    /// Create a new orchestrator.
    ///
    /// # Arguments
    /// * `client` - Storage client for all bucket operations
    /// * `decoder` - Decoder for imaging headers
    /// * `options` - Run options
    ///
    /// # Errors
    /// Returns `IngestError::Config` if the options are invalid.
    pub fn new(client: &'a C, decoder: &'a D, options: IngestOptions) -> Result<Self, IngestError> {
        options.validate()?;
        let assigner: PartitionAssigner = PartitionAssigner::new(options.training_percent)?;
        Ok(Self {
            client,
            decoder,
            router: KeyRouter::new(assigner),
            options,
        })
    }

    /// Options this orchestrator runs with.
    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Ingest everything currently in the raw drop.
    ///
    /// # Returns
    /// The merged report of all stages. Per-object failures are listed in
    /// `IngestReport::failures`.
    ///
    /// # Errors
    /// Fails before any publication if the published keys cannot be loaded
    /// into the key cache or the raw prefix cannot be listed.
    pub async fn run(&self) -> Result<IngestReport, IngestError> {
        let cache: KeyCache = self.load_key_cache().await?;
        let folders: Vec<String> = self
            .client
            .list_common_prefixes(&self.options.bucket, RAW_PREFIX, KEY_DELIMITER)
            .await?;
        info!(
            bucket = %self.options.bucket,
            folders = folders.len(),
            published = cache.len(),
            dry_run = self.options.dry_run,
            "Starting ingestion"
        );

        let (copy_tx, copy_rx) = mpsc::channel::<CopyTask>(self.options.channel_capacity);
        let (metadata_tx, metadata_rx) =
            mpsc::channel::<MetadataTask>(self.options.channel_capacity);

        let (mut report, copy_report, metadata_report): (IngestReport, IngestReport, IngestReport) =
            futures::join!(
                self.route_stage(&folders, &cache, copy_tx, metadata_tx),
                self.copy_stage(copy_rx),
                self.metadata_stage(metadata_rx),
            );
        report.merge(copy_report);
        report.merge(metadata_report);

        info!(
            discovered = report.objects_discovered,
            images = report.images,
            clinical_files = report.clinical_files,
            ignored = report.ignored,
            not_ready = report.not_ready,
            cached_skips = report.cached_skips,
            already_published = report.already_published,
            copies = report.copies,
            metadata_uploads = report.metadata_uploads,
            planned_copies = report.planned_copies,
            planned_uploads = report.planned_uploads,
            failures = report.failures.len(),
            "Ingestion finished"
        );
        Ok(report)
    }

    /// Index every key already published in the partitions.
    pub async fn load_key_cache(&self) -> Result<KeyCache, IngestError> {
        let prefixes: Vec<&str> = Partition::all()
            .iter()
            .map(|partition: &Partition| partition.prefix())
            .collect();
        let cache: KeyCache = KeyCache::load(self.client, &self.options.bucket, &prefixes).await?;
        Ok(cache)
    }

    /// Classify and route one raw object.
    ///
    /// Reads the object (imaging files only) and checks target keys, but
    /// never mutates the store.
    ///
    /// # Arguments
    /// * `key` - Raw object key
    /// * `cache` - Published keys known at the start of the run
    pub async fn route_object(
        &self,
        key: &str,
        cache: &KeyCache,
    ) -> Result<RouteOutcome, IngestError> {
        match ObjectKind::classify(key) {
            ObjectKind::Image => self.route_image(key, cache).await,
            ObjectKind::ClinicalFile(file) => self.route_clinical_file(key, file).await,
            ObjectKind::Ignored => {
                debug!(key = %key, "Ignoring object");
                Ok(RouteOutcome::Ignored)
            }
        }
    }

    /// Execute a copy task.
    pub async fn copy(&self, task: &CopyTask) -> Result<Publication, IngestError> {
        if self.options.dry_run {
            info!(source = %task.source_key, dest = %task.dest_key, "Would copy object");
            return Ok(Publication::Planned);
        }
        self.client
            .copy_object(&self.options.bucket, &task.source_key, &task.dest_key)
            .await?;
        info!(source = %task.source_key, dest = %task.dest_key, "Copied object");
        Ok(Publication::Performed)
    }

    /// Execute a metadata task: redact, encode and upload.
    ///
    /// The header is encoded even in a dry run so encoding failures surface.
    pub async fn publish_metadata(&self, task: MetadataTask) -> Result<Publication, IngestError> {
        let redacted = redact(task.header);
        let body: Vec<u8> =
            serde_json::to_vec(&redacted).map_err(|e: serde_json::Error| IngestError::Encode {
                key: task.metadata_key.clone(),
                message: e.to_string(),
            })?;

        if self.options.dry_run {
            info!(
                source = %task.source_key,
                dest = %task.metadata_key,
                bytes = body.len(),
                "Would upload metadata"
            );
            return Ok(Publication::Planned);
        }
        self.client
            .put_object(
                &self.options.bucket,
                &task.metadata_key,
                &body,
                Some(JSON_CONTENT_TYPE),
            )
            .await?;
        info!(source = %task.source_key, dest = %task.metadata_key, "Uploaded metadata");
        Ok(Publication::Performed)
    }

    /// List, classify and route every raw object, feeding the publish stages.
    ///
    /// Dropping the senders on return closes both publish stages.
    async fn route_stage(
        &self,
        folders: &[String],
        cache: &KeyCache,
        mut copy_tx: mpsc::Sender<CopyTask>,
        mut metadata_tx: mpsc::Sender<MetadataTask>,
    ) -> IngestReport {
        let bucket: &str = &self.options.bucket;
        let mut report: IngestReport = IngestReport::default();

        let mut discoveries = stream::iter(folders)
            .flat_map(|folder| {
                self.client
                    .list_objects(bucket, folder)
                    .map(move |listed| (folder, listed))
            })
            .map(|(folder, listed)| async move {
                match listed {
                    Ok(object) => {
                        let ObjectInfo { key, .. } = object;
                        let result: Result<RouteOutcome, IngestError> =
                            self.route_object(&key, cache).await;
                        Discovery::Object { key, result }
                    }
                    Err(error) => Discovery::ListingFailed {
                        prefix: folder.clone(),
                        error,
                    },
                }
            })
            .buffer_unordered(self.options.max_concurrency);

        while let Some(discovery) = discoveries.next().await {
            let (key, result) = match discovery {
                Discovery::Object { key, result } => (key, result),
                Discovery::ListingFailed { prefix, error } => {
                    record_failure(&mut report, prefix, error.into());
                    continue;
                }
            };
            report.objects_discovered += 1;

            let outcome: RouteOutcome = match result {
                Ok(outcome) => outcome,
                Err(error) => {
                    record_failure(&mut report, key, error);
                    continue;
                }
            };
            report.record_outcome(&outcome);

            if let RouteOutcome::Routed { copy, metadata, .. } = outcome {
                if let Some(task) = copy {
                    if copy_tx.send(task).await.is_err() {
                        warn!(key = %key, "Copy stage closed early");
                    }
                }
                if let Some(task) = metadata {
                    if metadata_tx.send(task).await.is_err() {
                        warn!(key = %key, "Metadata stage closed early");
                    }
                }
            }
        }

        info!(
            discovered = report.objects_discovered,
            ignored = report.ignored,
            not_ready = report.not_ready,
            cached_skips = report.cached_skips,
            "Routing stage finished"
        );
        report
    }

    /// Consume copy tasks until the routing stage finishes.
    async fn copy_stage(&self, tasks: mpsc::Receiver<CopyTask>) -> IngestReport {
        let mut report: IngestReport = IngestReport::default();
        let mut results = tasks
            .map(|task: CopyTask| async move {
                let result: Result<Publication, IngestError> = self.copy(&task).await;
                (task.source_key, result)
            })
            .buffer_unordered(self.options.max_concurrency);

        while let Some((source_key, result)) = results.next().await {
            match result {
                Ok(publication) => report.record_copy(publication),
                Err(error) => record_failure(&mut report, source_key, error),
            }
        }

        info!(
            copies = report.copies,
            planned = report.planned_copies,
            "Copy stage finished"
        );
        report
    }

    /// Consume metadata tasks until the routing stage finishes.
    async fn metadata_stage(&self, tasks: mpsc::Receiver<MetadataTask>) -> IngestReport {
        let mut report: IngestReport = IngestReport::default();
        let mut results = tasks
            .map(|task: MetadataTask| async move {
                let source_key: String = task.source_key.clone();
                (source_key, self.publish_metadata(task).await)
            })
            .buffer_unordered(self.options.max_concurrency);

        while let Some((source_key, result)) = results.next().await {
            match result {
                Ok(publication) => report.record_upload(publication),
                Err(error) => record_failure(&mut report, source_key, error),
            }
        }

        info!(
            uploads = report.metadata_uploads,
            planned = report.planned_uploads,
            "Metadata stage finished"
        );
        report
    }

    async fn route_image(&self, key: &str, cache: &KeyCache) -> Result<RouteOutcome, IngestError> {
        let metadata_name: String = format!("{}.{}", key_file_stem(key), JSON_EXTENSION);
        if cache.exists(key_file_name(key), MatchMode::FileName)
            && cache.exists(&metadata_name, MatchMode::FileName)
        {
            debug!(key = %key, "Image and metadata already cached");
            return Ok(RouteOutcome::CachedSkip);
        }

        let Some(date) = self.router.date_for(key) else {
            debug!(key = %key, "No drop date in key");
            return Ok(RouteOutcome::NotReady(ObjectClass::Image));
        };

        let data: Vec<u8> = self.client.get_object(&self.options.bucket, key).await?;
        let header = self.decoder.decode(&data)?;
        let Some(record) = ImagingRecord::from_header(header, date) else {
            debug!(key = %key, "No patient id in header");
            return Ok(RouteOutcome::NotReady(ObjectClass::Image));
        };

        let ImageKeys {
            partition,
            data_key,
            metadata_key,
        } = self
            .router
            .route_image(key, &record.patient_id, record.modality, date);

        let (data_exists, metadata_exists): (bool, bool) = futures::try_join!(
            self.client.object_exists(&self.options.bucket, &data_key),
            self.client.object_exists(&self.options.bucket, &metadata_key),
        )?;
        debug!(
            key = %key,
            partition = %partition,
            modality = %record.modality,
            data_exists,
            metadata_exists,
            "Routed imaging file"
        );

        let copy: Option<CopyTask> = if data_exists {
            None
        } else {
            Some(CopyTask {
                source_key: key.to_string(),
                dest_key: data_key,
            })
        };
        let metadata: Option<MetadataTask> = if metadata_exists {
            None
        } else {
            Some(MetadataTask {
                source_key: key.to_string(),
                metadata_key,
                header: record.header,
            })
        };

        Ok(RouteOutcome::Routed {
            class: ObjectClass::Image,
            copy,
            metadata,
        })
    }

    async fn route_clinical_file(
        &self,
        key: &str,
        file: ClinicalFile,
    ) -> Result<RouteOutcome, IngestError> {
        if file.patient_id.is_empty() {
            debug!(key = %key, "No patient id in file name");
            return Ok(RouteOutcome::NotReady(ObjectClass::ClinicalFile));
        }
        let Some(date) = self.router.date_for(key) else {
            debug!(key = %key, "No drop date in key");
            return Ok(RouteOutcome::NotReady(ObjectClass::ClinicalFile));
        };

        let dest_key: String = self
            .router
            .route_clinical_file(&file.patient_id, file.outcome, date);
        let exists: bool = self
            .client
            .object_exists(&self.options.bucket, &dest_key)
            .await?;
        debug!(key = %key, dest = %dest_key, exists, "Routed clinical file");

        let copy: Option<CopyTask> = if exists {
            None
        } else {
            Some(CopyTask {
                source_key: key.to_string(),
                dest_key,
            })
        };
        Ok(RouteOutcome::Routed {
            class: ObjectClass::ClinicalFile,
            copy,
            metadata: None,
        })
    }
}

fn record_failure(report: &mut IngestReport, key: String, error: IngestError) {
    warn!(key = %key, kind = %error.kind(), error = %error, "Failed to ingest object");
    report.record_failure(ObjectFailure::new(key, error));
}
