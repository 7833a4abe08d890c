//! Integration tests for the run controller: pre-check, split, retries

use crate::support::{user_request, FakeApi, FakeStore, VISITS_PART};
use logs_api_loader::api::Estimation;
use logs_api_loader::pipeline::{
    PipelineError, PollSettings, RetryPolicy, RunController, RunOutcome, RunSettings,
};
use logs_api_loader::sleep::RecordingSleeper;
use logs_api_loader::Source;
use std::sync::Arc;
use std::time::Duration;

fn settings(attempts: u32) -> RunSettings {
    RunSettings {
        retry: RetryPolicy::new(attempts, Duration::from_secs(10)),
        poll: PollSettings {
            interval: Duration::from_secs(30),
            max_polls: None,
        },
    }
}

fn quota(max_days: u64) -> Estimation {
    Estimation {
        feasible: false,
        max_feasible_day_count: max_days,
    }
}

fn controller(
    attempts: u32,
    api: &Arc<FakeApi>,
    store: &Arc<FakeStore>,
    sleeper: &Arc<RecordingSleeper>,
) -> RunController {
    RunController::new(settings(attempts), api.clone(), store.clone(), sleeper.clone())
}

#[tokio::test]
async fn test_skips_when_data_already_loaded() {
    let api = Arc::new(FakeApi::feasible(&[VISITS_PART]));
    let store = Arc::new(FakeStore::with_existing_rows(Source::Visits, 5));
    let sleeper = Arc::new(RecordingSleeper::new());
    let request = user_request(Source::Visits, "2020-01-01", "2020-01-10");

    let outcome = controller(3, &api, &store, &sleeper)
        .run(&request)
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::Skipped);
    assert!(api.calls().is_empty(), "no export API call expected");
    assert_eq!(store.writes(), 0);
    assert!(sleeper.calls().is_empty());
}

#[tokio::test]
async fn test_empty_table_is_loaded() {
    let api = Arc::new(FakeApi::feasible(&[VISITS_PART]));
    let store = Arc::new(FakeStore::with_existing_rows(Source::Visits, 0));
    let sleeper = Arc::new(RecordingSleeper::new());
    let request = user_request(Source::Visits, "2020-01-01", "2020-01-02");

    let outcome = controller(1, &api, &store, &sleeper)
        .run(&request)
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(store.count("create_table"), 0);
    assert_eq!(store.loads().len(), 1);
}

#[tokio::test]
async fn test_full_run_splits_by_quota() {
    let api = Arc::new(FakeApi::new(quota(3), &[VISITS_PART]));
    let store = Arc::new(FakeStore::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let request = user_request(Source::Visits, "2020-01-01", "2020-01-10");

    let outcome = controller(1, &api, &store, &sleeper)
        .run(&request)
        .await
        .unwrap();

    let RunOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run, got {outcome:?}");
    };
    assert_eq!(summary.attempts, 1);
    assert_eq!(summary.jobs, 4);
    assert_eq!(summary.parts, 4);
    assert_eq!(summary.rows_loaded, 12);
    assert_eq!(summary.rows_dropped, 4);

    let created: Vec<String> = api.created_ranges().iter().map(|r| r.to_string()).collect();
    assert_eq!(
        created,
        vec![
            "2020-01-01..2020-01-03",
            "2020-01-04..2020-01-06",
            "2020-01-07..2020-01-09",
            "2020-01-10..2020-01-10",
        ]
    );

    assert_eq!(api.count("evaluate"), 1);
    assert_eq!(api.count("clean"), 4);
    assert_eq!(store.count("create_database"), 1);
    assert_eq!(store.count("create_table"), 1);
    assert_eq!(store.loads().len(), 4);

    // One poll delay per job, no backoff on the first attempt
    assert_eq!(sleeper.calls(), vec![Duration::from_secs(30); 4]);
}

#[tokio::test]
async fn test_jobs_run_in_order() {
    let api = Arc::new(FakeApi::new(quota(1), &[VISITS_PART]));
    let store = Arc::new(FakeStore::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let request = user_request(Source::Visits, "2020-01-01", "2020-01-02");

    controller(1, &api, &store, &sleeper)
        .run(&request)
        .await
        .unwrap();

    let sequence: Vec<String> = api
        .calls()
        .into_iter()
        .filter(|c| !c.starts_with("evaluate"))
        .collect();
    assert_eq!(
        sequence,
        vec![
            "create 2020-01-01..2020-01-01",
            "status 101",
            "download 101/0",
            "clean 101",
            "create 2020-01-02..2020-01-02",
            "status 102",
            "download 102/0",
            "clean 102",
        ]
    );
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let api = Arc::new(FakeApi::feasible(&[VISITS_PART]).failing("create", 1));
    let store = Arc::new(FakeStore::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let request = user_request(Source::Visits, "2020-01-01", "2020-01-03");

    let outcome = controller(2, &api, &store, &sleeper)
        .run(&request)
        .await
        .unwrap();

    let RunOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run, got {outcome:?}");
    };
    assert_eq!(summary.attempts, 2);
    assert_eq!(summary.jobs, 1);
    assert_eq!(api.count("evaluate"), 2);
    assert_eq!(api.count("create"), 2);
    assert_eq!(
        sleeper.calls(),
        vec![Duration::from_secs(10), Duration::from_secs(30)]
    );
}

#[tokio::test]
async fn test_exhausted_attempts_return_last_error() {
    let api = Arc::new(FakeApi::feasible(&[VISITS_PART]).failing("evaluate", 10));
    let store = Arc::new(FakeStore::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let request = user_request(Source::Visits, "2020-01-01", "2020-01-03");

    let err = controller(3, &api, &store, &sleeper)
        .run(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Api(_)), "got {err:?}");
    assert!(err.to_string().contains("503"));
    assert_eq!(api.count("evaluate"), 3);
    assert_eq!(
        sleeper.calls(),
        vec![Duration::from_secs(10), Duration::from_secs(20)]
    );
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_store_failure_is_retried() {
    let api = Arc::new(FakeApi::feasible(&[VISITS_PART]));
    let store = Arc::new(FakeStore::new().failing_loads(1));
    let sleeper = Arc::new(RecordingSleeper::new());
    let request = user_request(Source::Visits, "2020-01-01", "2020-01-03");

    let outcome = controller(2, &api, &store, &sleeper)
        .run(&request)
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Completed(s) if s.attempts == 2));
    assert_eq!(api.count("create"), 2);
    assert_eq!(store.loads().len(), 1);
}

#[tokio::test]
async fn test_unsplittable_range_is_not_retried() {
    let api = Arc::new(FakeApi::new(quota(0), &[VISITS_PART]));
    let store = Arc::new(FakeStore::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let request = user_request(Source::Visits, "2020-01-01", "2020-01-10");

    let err = controller(3, &api, &store, &sleeper)
        .run(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Unsplittable { .. }), "got {err:?}");
    assert!(!err.is_retryable());
    assert_eq!(api.count("evaluate"), 1);
    assert_eq!(api.count("create"), 0);
    assert!(sleeper.calls().is_empty());
}

#[tokio::test]
async fn test_failed_job_is_retried_from_scratch() {
    let api = Arc::new(
        FakeApi::feasible(&[VISITS_PART]).with_terminal_status("processing_failed"),
    );
    let store = Arc::new(FakeStore::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let request = user_request(Source::Visits, "2020-01-01", "2020-01-03");

    let err = controller(2, &api, &store, &sleeper)
        .run(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::JobFailed { .. }), "got {err:?}");
    assert_eq!(api.count("create"), 2);
    assert_eq!(api.count("download"), 0);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_plan_does_not_create_jobs() {
    let api = Arc::new(FakeApi::new(quota(3), &[VISITS_PART]));
    let store = Arc::new(FakeStore::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let request = user_request(Source::Hits, "2020-01-01", "2020-01-10");

    let (estimation, ranges) = controller(1, &api, &store, &sleeper)
        .plan(&request)
        .await
        .unwrap();

    assert!(!estimation.feasible);
    assert_eq!(ranges.len(), 4);
    assert_eq!(api.count("create"), 0);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_failed_cleanup_reruns_range_from_scratch() {
    let api = Arc::new(FakeApi::new(quota(1), &[VISITS_PART]).failing("clean", 1));
    let store = Arc::new(FakeStore::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let request = user_request(Source::Visits, "2020-01-01", "2020-01-02");

    let outcome = controller(2, &api, &store, &sleeper)
        .run(&request)
        .await
        .unwrap();

    let RunOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run, got {outcome:?}");
    };
    assert_eq!(summary.attempts, 2);
    assert_eq!(summary.jobs, 2);
    assert_eq!(
        api.calls(),
        vec![
            "evaluate 2020-01-01..2020-01-02",
            "create 2020-01-01..2020-01-01",
            "status 101",
            "download 101/0",
            "clean 101",
            "evaluate 2020-01-01..2020-01-02",
            "create 2020-01-01..2020-01-01",
            "status 102",
            "download 102/0",
            "clean 102",
            "create 2020-01-02..2020-01-02",
            "status 103",
            "download 103/0",
            "clean 103",
        ]
    );

    // The first day was loaded by both attempts
    let loads = store.loads();
    assert_eq!(loads.len(), 3);
    assert_eq!(loads[0], loads[1]);
    assert_eq!(store.count("create_table"), 1);
    assert_eq!(
        sleeper.calls(),
        vec![
            Duration::from_secs(30),
            Duration::from_secs(10),
            Duration::from_secs(30),
            Duration::from_secs(30),
        ]
    );
}

#[tokio::test]
async fn test_failed_download_restarts_attempt() {
    let api = Arc::new(FakeApi::feasible(&[VISITS_PART]).failing("download", 1));
    let store = Arc::new(FakeStore::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let request = user_request(Source::Visits, "2020-01-01", "2020-01-03");

    let outcome = controller(2, &api, &store, &sleeper)
        .run(&request)
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Completed(s) if s.attempts == 2 && s.parts == 1));
    assert_eq!(
        api.calls(),
        vec![
            "evaluate 2020-01-01..2020-01-03",
            "create 2020-01-01..2020-01-03",
            "status 101",
            "download 101/0",
            "evaluate 2020-01-01..2020-01-03",
            "create 2020-01-01..2020-01-03",
            "status 102",
            "download 102/0",
            "clean 102",
        ]
    );
    assert_eq!(store.loads().len(), 1);
}

#[tokio::test]
async fn test_failed_status_check_restarts_attempt() {
    let api = Arc::new(FakeApi::feasible(&[VISITS_PART]).failing("status", 1));
    let store = Arc::new(FakeStore::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let request = user_request(Source::Visits, "2020-01-01", "2020-01-03");

    let outcome = controller(2, &api, &store, &sleeper)
        .run(&request)
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Completed(s) if s.attempts == 2));
    assert_eq!(api.count("evaluate"), 2);
    assert_eq!(api.count("create"), 2);
    assert_eq!(api.count("clean"), 1);
    assert_eq!(store.loads().len(), 1);
}
