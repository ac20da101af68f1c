//! Warehouse loader - command line entry point.
//!
//! Ingests everything under `raw/<date>/` in the configured bucket into the
//! `training/` and `validation/` partitions, then exits. Exits non-zero if the
//! run could not start or any object failed, so a scheduler can retry; reruns
//! only publish what is still missing.

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warehouse_common::{DEFAULT_BUCKET, DEFAULT_TRAINING_PERCENT};
use warehouse_imaging::DicomHeaderDecoder;
use warehouse_ingest::{IngestOptions, IngestOrchestrator, IngestReport, DEFAULT_MAX_CONCURRENCY};
use warehouse_storage::{StorageSettings, DEFAULT_REGION};
use warehouse_storage_crt::CrtStorageClient;

/// Command-line arguments for warehouse-loader
#[derive(Parser, Debug)]
#[command(name = "warehouse-loader")]
#[command(about = "Publish raw imaging and clinical drops into the training/validation warehouse")]
#[command(version)]
struct Args {
    /// Bucket holding the raw drop and the partitions
    #[arg(long, env = "WAREHOUSE_BUCKET", default_value_t = DEFAULT_BUCKET.to_string())]
    bucket: String,

    /// Share of patients assigned to the training partition (0-100)
    #[arg(long, env = "TRAINING_PERCENTAGE", default_value_t = DEFAULT_TRAINING_PERCENT)]
    training_percent: u8,

    /// Objects processed concurrently per stage
    #[arg(long, env = "WAREHOUSE_CONCURRENCY", default_value_t = DEFAULT_MAX_CONCURRENCY)]
    concurrency: usize,

    /// Route and check everything but do not copy or upload
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,

    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value_t = DEFAULT_REGION.to_string())]
    region: String,

    /// Custom endpoint for S3-compatible stores
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Use path-style bucket addressing
    #[arg(long, env = "AWS_S3_FORCE_PATH_STYLE")]
    force_path_style: bool,

    /// Fail requests against buckets not owned by this account id
    #[arg(long, env = "WAREHOUSE_EXPECTED_BUCKET_OWNER")]
    expected_bucket_owner: Option<String>,
}

impl Args {
    fn storage_settings(&self) -> StorageSettings {
        let mut settings: StorageSettings = StorageSettings::default()
            .with_region(&self.region)
            .with_force_path_style(self.force_path_style);
        if let Some(ref endpoint_url) = self.endpoint_url {
            settings = settings.with_endpoint_url(endpoint_url);
        }
        if let Some(ref owner) = self.expected_bucket_owner {
            settings = settings.with_expected_bucket_owner(owner);
        }
        settings
    }

    fn ingest_options(&self) -> IngestOptions {
        IngestOptions::new(&self.bucket)
            .with_training_percent(self.training_percent)
            .with_max_concurrency(self.concurrency)
            .with_dry_run(self.dry_run)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!(
        bucket = %args.bucket,
        region = %args.region,
        training_percent = args.training_percent,
        dry_run = args.dry_run,
        "Starting warehouse loader"
    );

    let client = CrtStorageClient::new(args.storage_settings())
        .await
        .context("Failed to create storage client")?;
    let decoder = DicomHeaderDecoder::new();
    let orchestrator = IngestOrchestrator::new(&client, &decoder, args.ingest_options())
        .context("Invalid ingestion options")?;

    let report: IngestReport = orchestrator
        .run()
        .await
        .with_context(|| format!("Ingestion of s3://{} aborted", args.bucket))?;

    if !report.is_clean() {
        bail!("{} object(s) failed to ingest", report.failures.len());
    }
    Ok(())
}
