//! Orchestrator behavior driven through the in-process stores.

use std::time::Duration;

use bytes::Bytes;
use serde_json::json;

use depot_core::config::{JobsConfig, StorageConfig};
use depot_core::error::ErrorKind;
use depot_core::types::code::is_valid_code;
use depot_core::types::pagination::PageRequest;
use depot_entity::data::kind::JobDataEncoding;
use depot_entity::job::spec::JobSpecification;
use depot_entity::job::status::{Coalesce, JobStatus};
use depot_jobs::JobService;

fn service() -> JobService {
    let storage = StorageConfig { part_size_bytes: 4 };
    JobService::in_memory(&storage, &JobsConfig::default())
}

fn zero_ttl_service() -> JobService {
    let storage = StorageConfig { part_size_bytes: 4 };
    let jobs = JobsConfig {
        ttl_seconds: 0,
        ..JobsConfig::default()
    };
    JobService::in_memory(&storage, &jobs)
}

fn export_spec(owner: &str) -> JobSpecification {
    JobSpecification::new("spreadsheet-export", json!({"repository": "main"})).with_owner(owner)
}

#[tokio::test]
async fn test_submit_creates_queued_job() {
    let service = service();

    let code = service
        .submit(&export_spec("alice"), Coalesce::None)
        .await
        .unwrap();
    assert!(is_valid_code(&code));

    let snapshot = service.get_job(&code).await.unwrap();
    assert_eq!(snapshot.status, JobStatus::Queued);
    assert_eq!(snapshot.job_type_code, "spreadsheet-export");
    assert_eq!(snapshot.owner_nickname.as_deref(), Some("alice"));
    assert!(snapshot.progress_percent.is_none());
    assert!(snapshot.start_timestamp.is_none());
    assert!(snapshot.generated_data.is_empty());
}

#[tokio::test]
async fn test_invalid_specification_creates_no_row() {
    let service = service();

    let spec = JobSpecification::new("spreadsheet-export", json!(["not", "an", "object"]));
    let err = service.submit(&spec, Coalesce::None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    assert_eq!(service.total_jobs(None, None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_double_submit_coalesces_onto_one_job() {
    let service = service();

    let first = service
        .submit(&export_spec("alice"), Coalesce::QueuedOrStarted)
        .await
        .unwrap();
    let second = service
        .submit(&export_spec("alice"), Coalesce::QueuedOrStarted)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(service.total_jobs(Some("alice"), None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_coalesce_none_always_creates() {
    let service = service();

    let first = service
        .submit(&export_spec("alice"), Coalesce::None)
        .await
        .unwrap();
    let second = service
        .submit(&export_spec("alice"), Coalesce::None)
        .await
        .unwrap();

    assert_ne!(first, second);
    assert_eq!(service.total_jobs(Some("alice"), None).await.unwrap(), 2);
}

#[tokio::test]
async fn test_different_parameters_do_not_coalesce() {
    let service = service();

    let first = service
        .submit(&export_spec("alice"), Coalesce::QueuedOrStarted)
        .await
        .unwrap();

    let other = JobSpecification::new("spreadsheet-export", json!({"repository": "beta"}))
        .with_owner("alice");
    let second = service
        .submit(&other, Coalesce::QueuedOrStarted)
        .await
        .unwrap();

    assert_ne!(first, second);
}

#[tokio::test]
async fn test_terminal_job_is_not_coalesced_onto() {
    let service = service();

    let first = service
        .submit(&export_spec("alice"), Coalesce::QueuedOrStarted)
        .await
        .unwrap();

    let (claimed, _token) = service.claim_next_job("runner-test").await.unwrap().unwrap();
    assert_eq!(claimed.code, first);
    assert!(service.complete_job(&first).await.unwrap());

    let second = service
        .submit(&export_spec("alice"), Coalesce::QueuedOrStarted)
        .await
        .unwrap();

    assert_ne!(first, second);
}

#[tokio::test]
async fn test_started_job_still_coalesces_under_queued_or_started() {
    let service = service();

    let first = service
        .submit(&export_spec("alice"), Coalesce::QueuedOrStarted)
        .await
        .unwrap();
    service.claim_next_job("runner-test").await.unwrap().unwrap();

    let second = service
        .submit(&export_spec("alice"), Coalesce::QueuedOrStarted)
        .await
        .unwrap();
    assert_eq!(first, second);

    // Under QUEUED-only coalescing the started job no longer matches.
    let third = service
        .submit(&export_spec("alice"), Coalesce::Queued)
        .await
        .unwrap();
    assert_ne!(first, third);
}

#[tokio::test]
async fn test_find_jobs_orders_most_recently_queued_first() {
    let service = service();

    let first = service
        .submit(&export_spec("alice"), Coalesce::None)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = service
        .submit(&export_spec("alice"), Coalesce::None)
        .await
        .unwrap();

    let page = service
        .find_jobs(None, None, &PageRequest::default())
        .await
        .unwrap();

    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].code, second);
    assert_eq!(page.items[1].code, first);
}

#[tokio::test]
async fn test_find_jobs_empty_status_set_fast_path() {
    let service = service();
    service
        .submit(&export_spec("alice"), Coalesce::None)
        .await
        .unwrap();

    let page = service
        .find_jobs(None, Some(&[]), &PageRequest::default())
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 0);

    assert_eq!(service.total_jobs(None, Some(&[])).await.unwrap(), 0);
    assert_eq!(service.total_jobs(None, None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_find_jobs_filters_by_owner_and_status() {
    let service = service();

    service
        .submit(&export_spec("alice"), Coalesce::None)
        .await
        .unwrap();
    service
        .submit(&export_spec("bobby"), Coalesce::None)
        .await
        .unwrap();

    let alice_page = service
        .find_jobs(Some("alice"), None, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(alice_page.total, 1);
    assert_eq!(alice_page.items[0].owner_nickname.as_deref(), Some("alice"));

    let queued = service
        .find_jobs(None, Some(&[JobStatus::Queued]), &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(queued.total, 2);

    let finished = service
        .find_jobs(None, Some(&[JobStatus::Finished]), &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(finished.total, 0);
}

#[tokio::test]
async fn test_get_job_unknown_code_is_not_found() {
    let service = service();

    assert!(service
        .try_get_job("00000000-0000-0000-0000-000000000000")
        .await
        .unwrap()
        .is_none());

    let err = service
        .get_job("00000000-0000-0000-0000-000000000000")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_request_cancel_is_idempotent() {
    let service = service();

    let code = service
        .submit(&export_spec("alice"), Coalesce::None)
        .await
        .unwrap();

    assert!(service.request_cancel(&code).await.unwrap());
    let snapshot = service.get_job(&code).await.unwrap();
    assert_eq!(snapshot.status, JobStatus::Cancelled);
    assert!(snapshot.cancel_timestamp.is_some());

    // A second request has no further effect.
    assert!(!service.request_cancel(&code).await.unwrap());

    let err = service
        .request_cancel("00000000-0000-0000-0000-000000000000")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_request_cancel_after_finish_has_no_effect() {
    let service = service();

    let code = service
        .submit(&export_spec("alice"), Coalesce::None)
        .await
        .unwrap();
    service.claim_next_job("runner-test").await.unwrap().unwrap();
    assert!(service.complete_job(&code).await.unwrap());

    assert!(!service.request_cancel(&code).await.unwrap());

    let snapshot = service.get_job(&code).await.unwrap();
    assert_eq!(snapshot.status, JobStatus::Finished);
    assert!(snapshot.cancel_timestamp.is_none());
}

#[tokio::test]
async fn test_lifecycle_timestamps_and_progress() {
    let service = service();

    let code = service
        .submit(&export_spec("alice"), Coalesce::None)
        .await
        .unwrap();

    let (job, _token) = service.claim_next_job("runner-test").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Started);
    assert_eq!(job.progress_percent, Some(0));

    assert!(service.set_job_progress(&code, 40).await.unwrap());
    assert_eq!(
        service.get_job(&code).await.unwrap().progress_percent,
        Some(40)
    );

    assert!(service.complete_job(&code).await.unwrap());
    let snapshot = service.get_job(&code).await.unwrap();
    assert_eq!(snapshot.status, JobStatus::Finished);
    assert_eq!(snapshot.progress_percent, Some(100));
    assert!(snapshot.start_timestamp.is_some());
    assert!(snapshot.finish_timestamp.is_some());
}

#[tokio::test]
async fn test_progress_validation_and_guarding() {
    let service = service();

    let code = service
        .submit(&export_spec("alice"), Coalesce::None)
        .await
        .unwrap();

    // Progress against a queued job is ignored, not an error.
    assert!(!service.set_job_progress(&code, 10).await.unwrap());

    let err = service.set_job_progress(&code, 101).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_claim_order_is_oldest_first_and_exactly_once() {
    let service = service();

    let first = service
        .submit(&export_spec("alice"), Coalesce::None)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = service
        .submit(&export_spec("bobby"), Coalesce::None)
        .await
        .unwrap();

    let (a, _t1) = service.claim_next_job("runner-a").await.unwrap().unwrap();
    let (b, _t2) = service.claim_next_job("runner-b").await.unwrap().unwrap();
    assert_eq!(a.code, first);
    assert_eq!(b.code, second);

    assert!(service.claim_next_job("runner-c").await.unwrap().is_none());
}

#[tokio::test]
async fn test_supplied_data_round_trip() {
    let service = service();

    // Long enough to split across several parts with the small test part
    // size.
    let payload = Bytes::from_static(b"nickname,rating\nalice,5\nbobby,3\n");
    let data = service
        .store_supplied_data("ratings", "text/csv", JobDataEncoding::None, payload.clone())
        .await
        .unwrap();
    assert!(is_valid_code(&data.code));

    let (fetched, bytes) = service.get_data_payload(&data.code).await.unwrap();
    assert_eq!(fetched.code, data.code);
    assert_eq!(bytes, payload);

    let filename = service.derive_data_filename(&data.code).await.unwrap();
    assert!(filename.starts_with("depot_ratings_"), "{filename}");
    assert!(filename.ends_with(".csv"), "{filename}");
}

#[tokio::test]
async fn test_get_data_unknown_code_is_not_found() {
    let service = service();

    let err = service
        .get_data_payload("00000000-0000-0000-0000-000000000000")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    assert!(service
        .try_get_data("00000000-0000-0000-0000-000000000000")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_malformed_use_code_is_rejected_before_write() {
    let service = service();

    let err = service
        .store_supplied_data(
            "Not A Use Code",
            "text/csv",
            JobDataEncoding::None,
            Bytes::from_static(b"x"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_submit_attaches_supplied_data() {
    let service = service();

    let data = service
        .store_supplied_data(
            "ratings",
            "text/csv",
            JobDataEncoding::None,
            Bytes::from_static(b"a,b\n"),
        )
        .await
        .unwrap();

    let spec = JobSpecification::new("rating-import", json!({}))
        .with_owner("alice")
        .with_supplied_data(&data.code);
    let job_code = service.submit(&spec, Coalesce::None).await.unwrap();

    let attached = service.try_get_data(&data.code).await.unwrap().unwrap();
    assert_eq!(attached.job_code.as_deref(), Some(job_code.as_str()));
}

#[tokio::test]
async fn test_submit_with_unknown_supplied_data_fails() {
    let service = service();

    let spec = JobSpecification::new("rating-import", json!({}))
        .with_supplied_data("00000000-0000-0000-0000-000000000000");
    let err = service.submit(&spec, Coalesce::None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(service.total_jobs(None, None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_generated_data_appears_in_snapshot() {
    let service = service();

    let code = service
        .submit(&export_spec("alice"), Coalesce::None)
        .await
        .unwrap();
    service.claim_next_job("runner-test").await.unwrap().unwrap();

    service
        .store_generated_data(
            &code,
            "report",
            "text/csv",
            JobDataEncoding::None,
            Bytes::from_static(b"pkg,downloads\n"),
        )
        .await
        .unwrap();

    let snapshot = service.get_job(&code).await.unwrap();
    assert_eq!(snapshot.generated_data.len(), 1);
    let data_ref = &snapshot.generated_data[0];
    assert_eq!(data_ref.use_code, "report");
    assert!(data_ref.filename.starts_with("depot_spreadsheet-export_"));
    assert!(data_ref.filename.ends_with(".csv"));
}

#[tokio::test]
async fn test_generated_data_for_unknown_job_is_not_found() {
    let service = service();

    let err = service
        .store_generated_data(
            "00000000-0000-0000-0000-000000000000",
            "report",
            "text/csv",
            JobDataEncoding::None,
            Bytes::from_static(b"x"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_await_job_finished() {
    let service = std::sync::Arc::new(service());

    let code = service
        .submit(&export_spec("alice"), Coalesce::None)
        .await
        .unwrap();

    // Not finished within a short timeout while still queued.
    assert!(!service
        .await_job_finished(&code, Duration::from_millis(120))
        .await
        .unwrap());

    let background = std::sync::Arc::clone(&service);
    let background_code = code.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        background
            .claim_next_job("runner-test")
            .await
            .unwrap()
            .unwrap();
        background.complete_job(&background_code).await.unwrap();
    });

    assert!(service
        .await_job_finished(&code, Duration::from_secs(5))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_sweep_removes_expired_jobs_and_their_data() {
    let service = zero_ttl_service();

    let code = service
        .submit(&export_spec("alice"), Coalesce::None)
        .await
        .unwrap();
    service.claim_next_job("runner-test").await.unwrap().unwrap();

    let data = service
        .store_generated_data(
            &code,
            "report",
            "text/csv",
            JobDataEncoding::None,
            Bytes::from_static(b"pkg\n"),
        )
        .await
        .unwrap();

    service.complete_job(&code).await.unwrap();

    // TTL is zero, so the finished job is immediately expired.
    let removed = service.clear_expired_jobs().await.unwrap();
    assert_eq!(removed, 1);

    assert!(service.try_get_job(&code).await.unwrap().is_none());
    assert!(service.try_get_data(&data.code).await.unwrap().is_none());
    assert_eq!(
        service.get_data_payload(&data.code).await.unwrap_err().kind,
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn test_sweep_leaves_live_jobs_alone() {
    let service = zero_ttl_service();

    let queued = service
        .submit(&export_spec("alice"), Coalesce::None)
        .await
        .unwrap();

    assert_eq!(service.clear_expired_jobs().await.unwrap(), 0);
    assert!(service.try_get_job(&queued).await.unwrap().is_some());
}

#[tokio::test]
async fn test_sweep_culls_orphaned_supplied_data() {
    let service = zero_ttl_service();

    let data = service
        .store_supplied_data(
            "ratings",
            "text/csv",
            JobDataEncoding::None,
            Bytes::from_static(b"a\n"),
        )
        .await
        .unwrap();

    service.clear_expired_jobs().await.unwrap();
    assert!(service.try_get_data(&data.code).await.unwrap().is_none());
}
