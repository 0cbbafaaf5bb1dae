mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use common::{austin_request, austin_result, failed, ScriptedService};
use reportgen_core::{ErrorDetail, GeoScope, JobId, Phase, RequestError};
use reportgen_jobs::orchestrator::{
    CODE_CONNECTIVITY, CODE_EXECUTION_FAILED, CODE_PROTOCOL, CODE_REJECTED, CODE_TIMEOUT,
    CONNECTIVITY_MESSAGE, EXECUTION_FAILED_MESSAGE, PROTOCOL_MESSAGE, REJECTED_MESSAGE,
    TIMEOUT_MESSAGE,
};
use reportgen_jobs::{
    JobStatus, Orchestrator, OrchestratorConfig, OrchestratorError, OrchestratorHandle,
    ServiceError,
};

fn spawn(service: &Arc<ScriptedService>) -> OrchestratorHandle {
    Orchestrator::spawn(service.clone(), OrchestratorConfig::default())
}

fn failure(handle: &OrchestratorHandle) -> ErrorDetail {
    match handle.snapshot().phase {
        Phase::Failed { error } => error,
        other => panic!("expected failed, got {other}"),
    }
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn austin_snapshot_succeeds_after_three_running_polls() {
    let service = Arc::new(
        ScriptedService::new()
            .then_running(3)
            .then(Ok(JobStatus::Succeeded(austin_result()))),
    );
    let handle = spawn(&service);

    let job_id = handle.submit(austin_request()).await.expect("accepted");
    assert_eq!(job_id, JobId::from("job-1"));
    assert_eq!(handle.snapshot().phase.name(), "generating");

    let snapshot = handle.wait_terminal().await.expect("terminal");
    assert_eq!(snapshot.progress, 100);
    let result = snapshot.phase.result().expect("succeeded");
    assert_eq!(result, &austin_result());
    assert_eq!(result.metrics.get("median_price"), Some(825_000.0));
    assert_eq!(result.artifacts.len(), 1);
    assert_eq!(service.submit_calls(), 1);
    assert_eq!(service.status_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn generating_reports_attempt_numbers() {
    let service = Arc::new(
        ScriptedService::new()
            .then_running(2)
            .then(Ok(JobStatus::Succeeded(austin_result()))),
    );
    let handle = spawn(&service);
    let mut snapshots = handle.subscribe();
    handle.submit(austin_request()).await.unwrap();

    let mut attempts = Vec::new();
    loop {
        snapshots.changed().await.unwrap();
        let snapshot = snapshots.borrow_and_update().clone();
        match snapshot.phase {
            Phase::Generating { attempt, .. } if attempt > 0 => {
                if attempts.last() != Some(&attempt) {
                    attempts.push(attempt);
                }
            }
            phase if phase.is_terminal() => break,
            _ => {}
        }
    }
    assert_eq!(attempts, vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn progress_never_decreases_and_stays_below_complete() {
    let service = Arc::new(ScriptedService::new());
    let config = OrchestratorConfig {
        max_attempts: 10,
        ..OrchestratorConfig::default()
    };
    let handle = Orchestrator::spawn(service.clone(), config);
    let mut snapshots = handle.subscribe();
    handle.submit(austin_request()).await.unwrap();

    let mut last = 0;
    let mut seen = 0;
    loop {
        snapshots.changed().await.unwrap();
        let snapshot = snapshots.borrow_and_update().clone();
        assert!(snapshot.progress >= last, "{} after {}", snapshot.progress, last);
        assert!(snapshot.progress < 100);
        last = snapshot.progress;
        seen += 1;
        if snapshot.phase.is_terminal() {
            break;
        }
    }
    assert!(seen > 10);
    assert!(last > 0);
}

// ---------------------------------------------------------------------------
// Timeouts and connectivity
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn never_finishing_job_times_out_after_poll_budget() {
    let service = Arc::new(ScriptedService::new());
    let handle = spawn(&service);

    let started = Instant::now();
    handle.submit(austin_request()).await.unwrap();
    handle.wait_terminal().await.unwrap();
    let elapsed = started.elapsed();

    assert!(
        elapsed >= Duration::from_secs(118) && elapsed <= Duration::from_secs(122),
        "timed out after {elapsed:?}"
    );
    let error = failure(&handle);
    assert_eq!(error.message, TIMEOUT_MESSAGE);
    assert_eq!(error.code.as_deref(), Some(CODE_TIMEOUT));
    assert_eq!(service.status_calls(), 60);
}

#[tokio::test(start_paused = true)]
async fn transient_transport_errors_keep_polling() {
    let service = Arc::new(
        ScriptedService::new()
            .then(Err(ServiceError::Transport("connection reset".into())))
            .then(Err(ServiceError::Transport("connection reset".into())))
            .then(Ok(JobStatus::Succeeded(austin_result()))),
    );
    let handle = spawn(&service);
    handle.submit(austin_request()).await.unwrap();

    let snapshot = handle.wait_terminal().await.unwrap();
    assert_eq!(snapshot.phase.name(), "succeeded");
    assert_eq!(service.status_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn unreachable_service_until_budget_is_a_connectivity_failure() {
    let service = Arc::new(
        ScriptedService::new().otherwise(Err(ServiceError::Transport("dns failure".into()))),
    );
    let config = OrchestratorConfig {
        max_attempts: 5,
        ..OrchestratorConfig::default()
    };
    let handle = Orchestrator::spawn(service.clone(), config);
    handle.submit(austin_request()).await.unwrap();
    handle.wait_terminal().await.unwrap();

    let error = failure(&handle);
    assert_eq!(error.message, CONNECTIVITY_MESSAGE);
    assert_eq!(error.code.as_deref(), Some(CODE_CONNECTIVITY));
    assert_eq!(service.status_calls(), 5);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn rejected_submission_fails_with_service_message() {
    let detail = ErrorDetail::with_code("Austin is outside your coverage area", "area_unsupported");
    let service = Arc::new(
        ScriptedService::new().submit_with(Err(ServiceError::Rejected(detail.clone()))),
    );
    let handle = spawn(&service);

    let err = handle.submit(austin_request()).await.unwrap_err();
    assert!(matches!(&err, OrchestratorError::Rejected(d) if *d == detail), "got {err}");
    assert_eq!(failure(&handle), detail);
    assert_eq!(service.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn rejection_without_message_uses_generic_text() {
    let service = Arc::new(
        ScriptedService::new().submit_with(Err(ServiceError::Rejected(ErrorDetail::new("")))),
    );
    let handle = spawn(&service);

    handle.submit(austin_request()).await.unwrap_err();
    let error = failure(&handle);
    assert_eq!(error.message, REJECTED_MESSAGE);
    assert_eq!(error.code.as_deref(), Some(CODE_REJECTED));
}

#[tokio::test(start_paused = true)]
async fn unreachable_submission_is_a_connectivity_failure() {
    let service = Arc::new(
        ScriptedService::new().submit_with(Err(ServiceError::Transport("refused".into()))),
    );
    let handle = spawn(&service);

    let err = handle.submit(austin_request()).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Rejected(_)));
    assert_eq!(failure(&handle).code.as_deref(), Some(CODE_CONNECTIVITY));
}

#[tokio::test(start_paused = true)]
async fn failed_job_keeps_service_message() {
    let service = Arc::new(
        ScriptedService::new()
            .then_running(1)
            .then(failed("MLS feed unavailable for this area")),
    );
    let handle = spawn(&service);
    handle.submit(austin_request()).await.unwrap();
    let snapshot = handle.wait_terminal().await.unwrap();

    let error = snapshot.phase.error().expect("failed").clone();
    assert_eq!(error.message, "MLS feed unavailable for this area");
    assert_eq!(error.code.as_deref(), Some(CODE_EXECUTION_FAILED));
    assert!(snapshot.progress < 100);
    assert_eq!(service.status_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_job_without_message_uses_generic_text() {
    let service = Arc::new(ScriptedService::new().then(failed("")));
    let handle = spawn(&service);
    handle.submit(austin_request()).await.unwrap();
    handle.wait_terminal().await.unwrap();

    assert_eq!(failure(&handle).message, EXECUTION_FAILED_MESSAGE);
}

#[tokio::test(start_paused = true)]
async fn malformed_status_fails_immediately() {
    let service = Arc::new(
        ScriptedService::new().then(Err(ServiceError::Protocol("missing status".into()))),
    );
    let handle = spawn(&service);
    handle.submit(austin_request()).await.unwrap();
    handle.wait_terminal().await.unwrap();

    let error = failure(&handle);
    assert_eq!(error.message, PROTOCOL_MESSAGE);
    assert_eq!(error.code.as_deref(), Some(CODE_PROTOCOL));
    assert_eq!(service.status_calls(), 1);
}

// ---------------------------------------------------------------------------
// Lifecycle rules
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn invalid_request_is_refused_without_leaving_idle() {
    let service = Arc::new(ScriptedService::new());
    let handle = spawn(&service);

    let mut request = austin_request();
    request.scope = GeoScope::postal_codes(["787"]);
    let err = handle.submit(request).await.unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::InvalidRequest(RequestError::InvalidPostalCode(ref code)) if code == "787"
    ));

    let mut request = austin_request();
    request.delivery.email = true;
    request.recipients = vec!["  ".into()];
    let err = handle.submit(request).await.unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::InvalidRequest(RequestError::NoRecipients)
    ));

    assert_eq!(handle.snapshot().phase, Phase::Idle);
    assert_eq!(service.submit_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn terminal_phase_needs_reset_before_resubmitting() {
    let service = Arc::new(ScriptedService::new().then(failed("boom")));
    let handle = spawn(&service);
    handle.submit(austin_request()).await.unwrap();
    handle.wait_terminal().await.unwrap();

    let err = handle.submit(austin_request()).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::NotIdle { phase: "failed" }));

    handle.reset().await.unwrap();
    assert_eq!(handle.snapshot().phase, Phase::Idle);
    assert_eq!(handle.snapshot().progress, 0);

    let job_id = handle.submit(austin_request()).await.unwrap();
    assert_eq!(job_id, JobId::from("job-2"));
}

#[tokio::test(start_paused = true)]
async fn reset_and_submit_are_refused_while_generating() {
    let service = Arc::new(ScriptedService::new());
    let handle = spawn(&service);
    handle.submit(austin_request()).await.unwrap();

    assert!(matches!(
        handle.reset().await.unwrap_err(),
        OrchestratorError::Busy
    ));
    assert!(matches!(
        handle.submit(austin_request()).await.unwrap_err(),
        OrchestratorError::Busy
    ));
    assert_eq!(handle.snapshot().phase.name(), "generating");
}

#[tokio::test(start_paused = true)]
async fn reset_from_idle_is_a_no_op() {
    let service = Arc::new(ScriptedService::new());
    let handle = spawn(&service);
    handle.reset().await.unwrap();
    assert_eq!(handle.snapshot().phase, Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_polling() {
    let service = Arc::new(ScriptedService::new());
    let handle = spawn(&service);
    handle.submit(austin_request()).await.unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    handle.cancel().await.unwrap();
    assert_eq!(handle.snapshot().phase, Phase::Cancelled);
    let calls = service.status_calls();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(service.status_calls(), calls);
    assert_eq!(handle.snapshot().phase, Phase::Cancelled);

    handle.cancel().await.unwrap();
    handle.reset().await.unwrap();
    assert_eq!(handle.snapshot().phase, Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_submission_resolves_the_submit() {
    let service = Arc::new(ScriptedService::new().submit_delay(Duration::from_secs(5)));
    let handle = spawn(&service);

    let submitter = handle.clone();
    let pending = tokio::spawn(async move { submitter.submit(austin_request()).await });
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(matches!(
        handle.submit(austin_request()).await.unwrap_err(),
        OrchestratorError::Busy
    ));
    handle.cancel().await.unwrap();

    let outcome = pending.await.unwrap();
    assert!(matches!(outcome, Err(OrchestratorError::Cancelled)));
    assert_eq!(handle.snapshot().phase, Phase::Cancelled);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(service.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_when_idle_changes_nothing() {
    let service = Arc::new(ScriptedService::new());
    let handle = spawn(&service);
    handle.cancel().await.unwrap();
    assert_eq!(handle.snapshot().phase, Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_stops_the_actor() {
    let service = Arc::new(ScriptedService::new());
    let handle = spawn(&service);
    let mut snapshots = handle.subscribe();
    handle.submit(austin_request()).await.unwrap();
    snapshots.borrow_and_update();

    drop(handle);
    while snapshots.changed().await.is_ok() {}

    let calls = service.status_calls();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(service.status_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn shutdown_makes_further_commands_fail() {
    let service = Arc::new(ScriptedService::new());
    let handle = spawn(&service);
    handle.shutdown().await;

    let mut snapshots = handle.subscribe();
    while snapshots.changed().await.is_ok() {}
    assert!(matches!(
        handle.submit(austin_request()).await.unwrap_err(),
        OrchestratorError::ActorGone
    ));
}
