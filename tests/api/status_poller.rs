use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use actix_web::web::{self, Data, Path};
use actix_web::{App, HttpResponse, HttpServer};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use bubble_drawing_service::poller::{PollJobError, StatusPoller};

use crate::helpers::spawn_app;

/// Stub status endpoint with a scripted answer sequence: `processing` for
/// the first `processing_checks` calls, then `final_status` forever.
struct ScriptedStatus {
    processing_checks: usize,
    final_status: &'static str,
    calls: AtomicUsize,
}

async fn scripted_status(state: Data<ScriptedStatus>, _job_id: Path<String>) -> HttpResponse {
    let call = state.calls.fetch_add(1, Ordering::SeqCst) + 1;

    if call <= state.processing_checks {
        return HttpResponse::Ok().json(json!({ "status": "processing" }));
    }

    match state.final_status {
        "completed" => HttpResponse::Ok().json(json!({
            "status": "completed",
            "download_url": "/download/stub",
        })),
        other => HttpResponse::Ok().json(json!({ "status": other })),
    }
}

/// Spawns the stub server on a random port, returning its base url and the
/// shared state used to count status checks
fn spawn_status_stub(
    processing_checks: usize,
    final_status: &'static str,
) -> (String, Data<ScriptedStatus>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind a random port");
    let port = listener.local_addr().unwrap().port();

    let state = Data::new(ScriptedStatus {
        processing_checks,
        final_status,
        calls: AtomicUsize::new(0),
    });

    let server_state = state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(server_state.clone())
            .route("/status/{job_id}", web::get().to(scripted_status))
    })
    .listen(listener)
    .expect("Failed to listen")
    .workers(1)
    .run();
    tokio::spawn(server);

    (format!("http://127.0.0.1:{}", port), state)
}

fn fast_poller(base_url: &str) -> StatusPoller {
    StatusPoller::new(
        base_url.to_string(),
        Duration::from_millis(50),
        Duration::from_secs(1),
        None,
    )
    .unwrap()
}

#[tokio::test]
async fn poll_succeeds_once_after_repeated_processing_checks() {
    // Arrange: two `processing` answers before `completed`
    let (base_url, state) = spawn_status_stub(2, "completed");
    let poller = fast_poller(&base_url);

    // Act
    let payload = poller.poll("stub-job").await.expect("Polling failed");

    // Assert: the completed payload comes back exactly once, after two
    // delayed re-checks
    assert_eq!(payload["status"], "completed");
    assert_eq!(payload["download_url"], "/download/stub");
    assert_eq!(state.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn poll_stops_on_the_first_terminal_status() {
    // Arrange
    let (base_url, state) = spawn_status_stub(0, "missing");
    let poller = fast_poller(&base_url);

    // Act
    let error = poller.poll("stub-job").await.unwrap_err();

    // Assert: terminal on the first check, no further checks scheduled
    match error {
        PollJobError::TerminalStatus { status, payload } => {
            assert_eq!(status, "missing");
            assert_eq!(payload["status"], "missing");
        }
        other => panic!("Expected TerminalStatus, got {:?}", other),
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(state.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn poll_can_be_cancelled_between_checks() {
    // Arrange: the job never leaves `processing`
    let (base_url, state) = spawn_status_stub(usize::MAX, "completed");
    let poller = StatusPoller::new(
        base_url,
        Duration::from_millis(500),
        Duration::from_secs(1),
        None,
    )
    .unwrap();

    let cancel_token = CancellationToken::new();
    let poll_token = cancel_token.clone();

    // Act: cancel while the poller sleeps after its first check
    let poll = tokio::spawn(async move {
        poller
            .poll_with_cancellation("stub-job", poll_token)
            .await
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel_token.cancel();
    let result = poll.await.unwrap();

    // Assert
    assert!(matches!(result, Err(PollJobError::Cancelled)));
    assert_eq!(state.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn poll_gives_up_after_the_configured_number_of_attempts() {
    // Arrange
    let (base_url, state) = spawn_status_stub(usize::MAX, "completed");
    let poller = StatusPoller::new(
        base_url,
        Duration::from_millis(10),
        Duration::from_secs(1),
        Some(3),
    )
    .unwrap();

    // Act
    let error = poller.poll("stub-job").await.unwrap_err();

    // Assert
    assert!(matches!(error, PollJobError::AttemptsExhausted(3)));
    assert_eq!(state.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn an_unreachable_server_is_reported_as_a_connectivity_error() {
    // Arrange: a port nothing listens on
    let unused_port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let poller = fast_poller(&format!("http://127.0.0.1:{}", unused_port));

    // Act
    let error = poller.poll("stub-job").await.unwrap_err();

    // Assert
    assert!(matches!(error, PollJobError::Connectivity(_)));
}

#[tokio::test]
async fn a_silent_server_is_reported_as_a_timeout() {
    // Arrange: the listener accepts connections at the TCP level (kernel
    // backlog) but no request is ever answered
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let poller = StatusPoller::new(
        format!("http://127.0.0.1:{}", port),
        Duration::from_millis(50),
        Duration::from_millis(200),
        None,
    )
    .unwrap();

    // Act
    let error = poller.poll("stub-job").await.unwrap_err();

    // Assert
    assert!(matches!(error, PollJobError::Timeout(_)));
    drop(listener);
}

#[tokio::test]
async fn poller_completes_against_the_real_service() {
    // Arrange
    let app = spawn_app().await;
    let job_id = app.upload_sample_drawing().await;
    let poller = StatusPoller::from_settings(
        app.address.clone(),
        &bubble_drawing_service::configuration::PollerSettings {
            interval_seconds: 1,
            request_timeout_seconds: 5,
            max_attempts: Some(30),
        },
    )
    .unwrap();

    // Act
    let payload = poller
        .poll(&job_id.to_string())
        .await
        .expect("Polling failed");

    // Assert
    assert_eq!(payload["status"], "completed");
    assert_eq!(
        payload["download_url"],
        format!("/download/{}", job_id)
    );
}

#[tokio::test]
async fn poller_reports_an_unknown_job_as_terminal() {
    // Arrange
    let app = spawn_app().await;
    let poller = fast_poller(&app.address);

    // Act
    let error = poller.poll(&Uuid::new_v4().to_string()).await.unwrap_err();

    // Assert
    match error {
        PollJobError::TerminalStatus { status, .. } => assert_eq!(status, "not_found"),
        other => panic!("Expected TerminalStatus, got {:?}", other),
    }
}
