//! End-to-end ingestion runs over the in-memory store.

use serde_json::{json, Value};
use warehouse_imaging::{DecodeError, HeaderDecoder};
use warehouse_ingest::{
    FailureKind, IngestError, IngestOptions, IngestOrchestrator, IngestReport, ObjectClass,
    RouteOutcome,
};
use warehouse_storage::{KeyCache, MemoryStorageClient, StorageError};

const BUCKET: &str = "test-warehouse";

/// Decodes headers stored as plain DICOM JSON.
struct JsonHeaderDecoder;

impl HeaderDecoder for JsonHeaderDecoder {
    fn decode(&self, data: &[u8]) -> Result<Value, DecodeError> {
        serde_json::from_slice(data).map_err(|e| DecodeError::Malformed {
            message: e.to_string(),
        })
    }
}

fn header(patient_id: &str, modality: &str) -> Value {
    json!({
        "00080018": {"vr": "UI", "Value": ["1.2.826.0.1"]},
        "00100020": {"vr": "LO", "Value": [patient_id]},
        "00080060": {"vr": "CS", "Value": [modality]},
        "00283010": {"vr": "SQ", "Value": [{"00283006": {"vr": "US", "Value": [0, 4095]}}]},
        "00081140": {"vr": "SQ", "Value": [{"00091001": {"vr": "OB", "InlineBinary": "AAECAw=="}}]},
    })
}

fn image_bytes(patient_id: &str, modality: &str) -> Vec<u8> {
    serde_json::to_vec(&header(patient_id, modality)).unwrap()
}

/// P001 lands in slot 72, so it trains at 80% and validates at 60%.
fn options() -> IngestOptions {
    IngestOptions::new(BUCKET)
        .with_training_percent(80)
        .with_max_concurrency(4)
        .with_channel_capacity(2)
}

async fn run(client: &MemoryStorageClient, options: IngestOptions) -> IngestReport {
    IngestOrchestrator::new(client, &JsonHeaderDecoder, options)
        .unwrap()
        .run()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_image_published_under_partition_layout() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/2022-01-05/studyA/img123.dcm", image_bytes("P001", "DX"));

    let report: IngestReport = run(&client, options()).await;

    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.objects_discovered, 1);
    assert_eq!(report.images, 1);
    assert_eq!(report.copies, 1);
    assert_eq!(report.metadata_uploads, 1);
    assert_eq!(
        client.object(BUCKET, "training/x-ray/P001/2022-01-05/img123.dcm"),
        Some(image_bytes("P001", "DX"))
    );
    assert!(client
        .object(BUCKET, "training/x-ray-metadata/P001/2022-01-05/img123.json")
        .is_some());
}

#[tokio::test]
async fn test_metadata_is_redacted_json() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/2022-01-05/studyA/img123.dcm", image_bytes("P001", "DX"));

    run(&client, options()).await;

    let metadata_key: &str = "training/x-ray-metadata/P001/2022-01-05/img123.json";
    assert_eq!(
        client.content_type(BUCKET, metadata_key).as_deref(),
        Some("application/json")
    );
    let published: Value =
        serde_json::from_slice(&client.object(BUCKET, metadata_key).unwrap()).unwrap();
    assert_eq!(published["00283010"], Value::Null);
    assert_eq!(published["00081140"]["Value"][0]["00091001"]["InlineBinary"], Value::Null);
    assert_eq!(published["00081140"]["Value"][0]["00091001"]["vr"], json!("OB"));
    assert_eq!(published["00100020"], header("P001", "DX")["00100020"]);
}

#[tokio::test]
async fn test_validation_partition_at_default_share() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/2022-01-05/studyA/img123.dcm", image_bytes("P001", "CT"));
    client.insert(BUCKET, "raw/2022-01-05/studyB/img456.dcm", image_bytes("P002", "MR"));

    let report: IngestReport = run(&client, IngestOptions::new(BUCKET)).await;

    assert!(report.is_clean());
    assert!(client
        .object(BUCKET, "validation/ct/P001/2022-01-05/img123.dcm")
        .is_some());
    assert!(client
        .object(BUCKET, "training/mri/P002/2022-01-05/img456.dcm")
        .is_some());
    assert!(client
        .object(BUCKET, "training/mri-metadata/P002/2022-01-05/img456.json")
        .is_some());
}

#[tokio::test]
async fn test_unrecognized_modality_published_as_unknown() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/2022-01-05/studyA/img123.dcm", image_bytes("P001", "US"));

    run(&client, options()).await;

    assert!(client
        .object(BUCKET, "training/unknown/P001/2022-01-05/img123.dcm")
        .is_some());
    assert!(client
        .object(BUCKET, "training/unknown-metadata/P001/2022-01-05/img123.json")
        .is_some());
}

#[tokio::test]
async fn test_clinical_file_routing() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/2022-01-05/studyA/P001_data.json", b"{\"age\": 40}".to_vec());
    client.insert(BUCKET, "raw/2022-01-05/studyA/P001_status.json", b"{}".to_vec());

    let report: IngestReport = run(&client, options()).await;

    assert!(report.is_clean());
    assert_eq!(report.clinical_files, 2);
    assert_eq!(report.copies, 2);
    assert_eq!(report.metadata_uploads, 0);
    assert_eq!(
        client.object(BUCKET, "training/data/P001/2022-01-05/data.json"),
        Some(b"{\"age\": 40}".to_vec())
    );
    assert!(client
        .object(BUCKET, "training/data/P001/2022-01-05/status.json")
        .is_some());
}

#[tokio::test]
async fn test_key_without_date_is_not_ready() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/incoming/img123.dcm", image_bytes("P001", "DX"));
    client.insert(BUCKET, "raw/incoming/P001_data.json", b"{}".to_vec());

    let report: IngestReport = run(&client, options()).await;

    assert!(report.is_clean());
    assert_eq!(report.objects_discovered, 2);
    assert_eq!(report.not_ready, 2);
    assert_eq!(client.mutation_count(), 0);
    assert_eq!(client.get_count(), 0);
}

#[tokio::test]
async fn test_missing_patient_id_is_not_ready() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    let mut anonymous: Value = header("P001", "DX");
    anonymous["00100020"] = json!({"vr": "LO"});
    client.insert(
        BUCKET,
        "raw/2022-01-05/studyA/img123.dcm",
        serde_json::to_vec(&anonymous).unwrap(),
    );
    client.insert(BUCKET, "raw/2022-01-05/studyA/_data.json", b"{}".to_vec());

    let report: IngestReport = run(&client, options()).await;

    assert!(report.is_clean());
    assert_eq!(report.not_ready, 2);
    assert_eq!(client.mutation_count(), 0);
}

#[tokio::test]
async fn test_unrelated_files_are_ignored() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/2022-01-05/notes.txt", b"hello".to_vec());
    client.insert(BUCKET, "raw/2022-01-05/summary.json", b"{}".to_vec());
    client.insert(BUCKET, "raw/2022-01-05/P001_results.json", b"{}".to_vec());

    let report: IngestReport = run(&client, options()).await;

    assert!(report.is_clean());
    assert_eq!(report.ignored, 3);
    assert_eq!(client.mutation_count(), 0);
    assert_eq!(client.head_count(), 0);
}

#[tokio::test]
async fn test_missing_targets_emit_copy_and_metadata_tasks() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/2022-01-05/studyA/img123.dcm", image_bytes("P001", "DX"));
    let orchestrator = IngestOrchestrator::new(&client, &JsonHeaderDecoder, options()).unwrap();

    let outcome: RouteOutcome = orchestrator
        .route_object("raw/2022-01-05/studyA/img123.dcm", &KeyCache::new())
        .await
        .unwrap();

    let (class, copy, metadata) = match outcome {
        RouteOutcome::Routed {
            class,
            copy,
            metadata,
        } => (class, copy, metadata),
        other => panic!("expected a routed outcome, got {other:?}"),
    };
    assert_eq!(class, ObjectClass::Image);
    assert_eq!(
        copy.unwrap().dest_key,
        "training/x-ray/P001/2022-01-05/img123.dcm"
    );
    assert_eq!(
        metadata.unwrap().metadata_key,
        "training/x-ray-metadata/P001/2022-01-05/img123.json"
    );
    assert_eq!(client.mutation_count(), 0);
}

#[tokio::test]
async fn test_existing_targets_emit_no_tasks() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/2022-01-05/studyA/img123.dcm", image_bytes("P001", "DX"));
    client.insert(BUCKET, "training/x-ray/P001/2022-01-05/img123.dcm", vec![1]);
    client.insert(BUCKET, "training/x-ray-metadata/P001/2022-01-05/img123.json", vec![2]);
    let orchestrator = IngestOrchestrator::new(&client, &JsonHeaderDecoder, options()).unwrap();

    let outcome: RouteOutcome = orchestrator
        .route_object("raw/2022-01-05/studyA/img123.dcm", &KeyCache::new())
        .await
        .unwrap();

    assert!(outcome.is_already_published());
}

#[tokio::test]
async fn test_only_missing_half_is_published() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/2022-01-05/studyA/img123.dcm", image_bytes("P001", "DX"));
    client.insert(BUCKET, "training/x-ray/P001/2022-01-05/img123.dcm", vec![1]);

    let report: IngestReport = run(&client, options()).await;

    assert!(report.is_clean());
    assert_eq!(report.copies, 0);
    assert_eq!(report.metadata_uploads, 1);
    assert_eq!(
        client.object(BUCKET, "training/x-ray/P001/2022-01-05/img123.dcm"),
        Some(vec![1])
    );
}

#[tokio::test]
async fn test_rerun_issues_no_mutations() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/2022-01-05/studyA/img123.dcm", image_bytes("P001", "DX"));
    client.insert(BUCKET, "raw/2022-01-05/studyA/P001_data.json", b"{}".to_vec());
    client.insert(BUCKET, "raw/2022-01-06/studyB/img456.dcm", image_bytes("P002", "CR"));

    let first: IngestReport = run(&client, options()).await;
    let mutations: u64 = client.mutation_count();
    let second: IngestReport = run(&client, options()).await;

    assert_eq!(first.mutations(), 5);
    assert_eq!(mutations, 5);
    assert_eq!(client.mutation_count(), mutations);
    assert_eq!(second.mutations(), 0);
    assert_eq!(second.cached_skips, 2);
    assert_eq!(second.already_published, 1);
    assert!(second.is_clean());
}

#[tokio::test]
async fn test_cache_precheck_matches_file_names_anywhere() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/2022-01-05/studyA/img123.dcm", image_bytes("P001", "DX"));
    client.insert(BUCKET, "validation/ct/P999/2021-12-01/img123.dcm", vec![1]);
    client.insert(BUCKET, "validation/ct-metadata/P999/2021-12-01/img123.json", vec![2]);

    let report: IngestReport = run(&client, options()).await;

    assert_eq!(report.cached_skips, 1);
    assert_eq!(client.get_count(), 0);
    assert_eq!(client.mutation_count(), 0);
}

#[tokio::test]
async fn test_cache_precheck_needs_both_halves() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/2022-01-05/studyA/img123.dcm", image_bytes("P001", "DX"));
    client.insert(BUCKET, "validation/ct/P999/2021-12-01/img123.dcm", vec![1]);

    let report: IngestReport = run(&client, options()).await;

    assert_eq!(report.cached_skips, 0);
    assert_eq!(report.copies, 1);
    assert_eq!(report.metadata_uploads, 1);
}

#[tokio::test]
async fn test_store_failure_is_isolated() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/2022-01-05/studyA/img123.dcm", image_bytes("P001", "DX"));
    client.insert(BUCKET, "raw/2022-01-05/studyB/img456.dcm", image_bytes("P002", "DX"));
    client.fail_key("raw/2022-01-05/studyA/img123.dcm");

    let report: IngestReport = run(&client, options()).await;

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].key, "raw/2022-01-05/studyA/img123.dcm");
    assert_eq!(report.failures[0].kind(), FailureKind::StoreAccess);
    assert!(client
        .object(BUCKET, "training/x-ray/P002/2022-01-05/img456.dcm")
        .is_some());
    assert_eq!(report.copies, 1);
}

#[tokio::test]
async fn test_decode_failure_is_isolated() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/2022-01-05/studyA/broken.dcm", b"\x00\x01 not a header".to_vec());
    client.insert(BUCKET, "raw/2022-01-05/studyA/P001_status.json", b"{}".to_vec());

    let report: IngestReport = run(&client, options()).await;

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].key, "raw/2022-01-05/studyA/broken.dcm");
    assert_eq!(report.failures[0].kind(), FailureKind::Decode);
    assert_eq!(report.copies, 1);
}

#[tokio::test]
async fn test_existence_check_failure_is_reported_against_raw_key() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/2022-01-05/studyA/img123.dcm", image_bytes("P001", "DX"));
    client.fail_key("training/x-ray/P001/2022-01-05/img123.dcm");

    let report: IngestReport = run(&client, options()).await;

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].key, "raw/2022-01-05/studyA/img123.dcm");
    assert_eq!(client.mutation_count(), 0);
}

#[tokio::test]
async fn test_folder_listing_failure_is_isolated() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/2022-01-05/studyA/img123.dcm", image_bytes("P001", "DX"));
    client.insert(BUCKET, "raw/2022-01-06/studyB/img456.dcm", image_bytes("P002", "DX"));
    client.fail_key("raw/2022-01-06/");

    let report: IngestReport = run(&client, options()).await;

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].key, "raw/2022-01-06/");
    assert_eq!(report.objects_discovered, 1);
    assert_eq!(report.copies, 1);
}

#[tokio::test]
async fn test_raw_listing_failure_aborts_run() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/2022-01-05/studyA/img123.dcm", image_bytes("P001", "DX"));
    client.fail_key("raw/");

    let orchestrator = IngestOrchestrator::new(&client, &JsonHeaderDecoder, options()).unwrap();
    let result: Result<IngestReport, IngestError> = orchestrator.run().await;

    assert!(matches!(
        result,
        Err(IngestError::Storage(StorageError::AccessDenied { .. }))
    ));
    assert_eq!(client.mutation_count(), 0);
}

#[tokio::test]
async fn test_dry_run_makes_no_mutations() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    client.insert(BUCKET, "raw/2022-01-05/studyA/img123.dcm", image_bytes("P001", "DX"));
    client.insert(BUCKET, "raw/2022-01-05/studyA/P001_data.json", b"{}".to_vec());

    let report: IngestReport = run(&client, options().with_dry_run(true)).await;

    assert!(report.is_clean());
    assert_eq!(client.mutation_count(), 0);
    assert_eq!(report.planned_copies, 2);
    assert_eq!(report.planned_uploads, 1);
    assert_eq!(report.mutations(), 0);
}

#[tokio::test]
async fn test_many_objects_across_pages() {
    let client: MemoryStorageClient = MemoryStorageClient::new().with_page_size(3);
    for i in 0..20 {
        let patient: String = format!("PATIENT-{i}");
        client.insert(
            BUCKET,
            &format!("raw/2022-02-0{}/study/img{i}.dcm", i % 3 + 1),
            image_bytes(&patient, "DX"),
        );
    }

    let report: IngestReport = run(&client, options()).await;

    assert!(report.is_clean());
    assert_eq!(report.objects_discovered, 20);
    assert_eq!(report.copies, 20);
    assert_eq!(report.metadata_uploads, 20);
    assert_eq!(client.keys(BUCKET).len(), 60);
}

#[tokio::test]
async fn test_invalid_options_rejected() {
    let client: MemoryStorageClient = MemoryStorageClient::new();
    let result = IngestOrchestrator::new(
        &client,
        &JsonHeaderDecoder,
        IngestOptions::new(BUCKET).with_training_percent(101),
    );
    assert!(matches!(result, Err(IngestError::Config(_))));
}
