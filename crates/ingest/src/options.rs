//! Configuration for ingestion runs.

use warehouse_common::{ConfigError, DEFAULT_BUCKET, DEFAULT_TRAINING_PERCENT};

/// Default number of objects in flight per stage.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Default number of queued tasks between routing and publication stages.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Options for an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Bucket holding both the raw drop and the partitions.
    pub bucket: String,
    /// Share of patients assigned to the training partition.
    pub training_percent: u8,
    /// Maximum concurrent objects per stage.
    pub max_concurrency: usize,
    /// Capacity of the queues feeding the copy and metadata stages.
    pub channel_capacity: usize,
    /// Route and check everything but skip store mutations.
    pub dry_run: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            training_percent: DEFAULT_TRAINING_PERCENT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            dry_run: false,
        }
    }
}

impl IngestOptions {
    /// Create options for a bucket with default settings.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    /// Set the training share.
    pub fn with_training_percent(mut self, training_percent: u8) -> Self {
        self.training_percent = training_percent;
        self
    }

    /// Set maximum concurrency per stage.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the stage queue capacity.
    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }

    /// Enable or disable dry run.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Check the options before a run.
    ///
    /// # Errors
    /// Returns `ConfigError` for an empty bucket, a training share above 100,
    /// or a zero concurrency or queue capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::Empty { option: "bucket" });
        }
        if self.training_percent > 100 {
            return Err(ConfigError::TrainingPercentOutOfRange {
                value: self.training_percent,
            });
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroValue {
                option: "max_concurrency",
            });
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::ZeroValue {
                option: "channel_capacity",
            });
        }
        Ok(())
    }
}
