//! Functional tests for the pipeline API client against a mock remote service

use imagegen_relay::backend::{FusionBrainClient, GenerationClient, PollStatus, SubmitRequest};
use imagegen_relay::config::RemoteConfig;
use imagegen_relay::AppError;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(base_url: &str) -> FusionBrainClient {
    FusionBrainClient::new(&RemoteConfig {
        base_url: base_url.to_string(),
        api_key: "k".to_string(),
        api_secret: "s".to_string(),
        timeout_ms: 2000,
        connect_timeout_ms: 1000,
    })
    .unwrap()
}

fn request() -> SubmitRequest {
    SubmitRequest {
        prompt: "a cat".to_string(),
        width: 1024,
        height: 1024,
        num_images: 1,
    }
}

async fn mount_pipelines(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/pipelines"))
        .and(header("X-Key", "Key k"))
        .and(header("X-Secret", "Secret s"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "pipeline-1", "name": "Kandinsky"},
            {"id": "pipeline-2", "name": "Other"}
        ])))
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, job_id: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/pipeline/status/{}", job_id)))
        .and(header("X-Key", "Key k"))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_pipeline_uses_first_entry() {
    let server = MockServer::start().await;
    mount_pipelines(&server).await;

    let client = client_for(&server.uri());
    assert_eq!(client.fetch_pipeline_id().await.unwrap(), "pipeline-1");
}

#[tokio::test]
async fn test_fetch_pipeline_empty_list_is_submission_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pipelines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = client_for(&server.uri()).fetch_pipeline_id().await.unwrap_err();
    assert!(matches!(err, AppError::Submission { .. }));
}

#[tokio::test]
async fn test_submit_sends_multipart_and_returns_uuid() {
    let server = MockServer::start().await;
    mount_pipelines(&server).await;
    Mock::given(method("POST"))
        .and(path("/pipeline/run"))
        .and(header("X-Secret", "Secret s"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"uuid": "job-123", "status": "INITIAL"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let job_id = client_for(&server.uri()).submit(&request()).await.unwrap();
    assert_eq!(job_id, "job-123");

    let requests = server.received_requests().await.unwrap();
    let run = requests
        .iter()
        .find(|r| r.url.path() == "/pipeline/run")
        .unwrap();
    let body = String::from_utf8_lossy(&run.body);
    assert!(body.contains("name=\"params\""));
    assert!(body.contains("application/json"));
    assert!(body.contains("\"type\":\"GENERATE\""));
    assert!(body.contains("\"numImages\":1"));
    assert!(body.contains("\"query\":\"a cat\""));
    assert!(body.contains("name=\"pipeline_id\""));
    assert!(body.contains("pipeline-1"));
}

#[tokio::test]
async fn test_submit_without_uuid_carries_details() {
    let server = MockServer::start().await;
    mount_pipelines(&server).await;
    Mock::given(method("POST"))
        .and(path("/pipeline/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "quota"})))
        .mount(&server)
        .await;

    let err = client_for(&server.uri()).submit(&request()).await.unwrap_err();
    match err {
        AppError::Submission { details, .. } => {
            assert_eq!(details, Some(json!({"error": "quota"})));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_submit_unreachable_is_submission_error() {
    let err = client_for("http://127.0.0.1:1").submit(&request()).await.unwrap_err();
    assert!(matches!(err, AppError::Submission { .. }));
}

#[tokio::test]
async fn test_truncated_body_reports_read_error() {
    // Announce a longer body than is sent, then hang up.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n[{\"id\"")
            .await
            .unwrap();
    });

    let err = client_for(&format!("http://{}", addr))
        .fetch_pipeline_id()
        .await
        .unwrap_err();
    match err {
        AppError::Submission { message, details } => {
            assert!(message.contains("Failed to read response body"), "{message}");
            assert!(details.is_none());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_poll_done_returns_first_file() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        "job-1",
        ResponseTemplate::new(200).set_body_json(json!({
            "uuid": "job-1",
            "status": "DONE",
            "result": {"files": ["BASE64...", "OTHER"], "censored": false}
        })),
    )
    .await;

    let status = client_for(&server.uri()).poll_status("job-1").await.unwrap();
    assert_eq!(status, PollStatus::Done("BASE64...".to_string()));
}

#[tokio::test]
async fn test_poll_non_terminal_statuses_are_processing() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        "initial",
        ResponseTemplate::new(200).set_body_json(json!({"uuid": "initial", "status": "INITIAL"})),
    )
    .await;
    mount_status(
        &server,
        "running",
        ResponseTemplate::new(200).set_body_json(json!({"uuid": "running", "status": "PROCESSING"})),
    )
    .await;

    let client = client_for(&server.uri());
    assert_eq!(client.poll_status("initial").await.unwrap(), PollStatus::Processing);
    assert_eq!(client.poll_status("running").await.unwrap(), PollStatus::Processing);
}

#[tokio::test]
async fn test_poll_fail_status_reports_reason() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        "job-1",
        ResponseTemplate::new(200).set_body_json(json!({
            "uuid": "job-1",
            "status": "FAIL",
            "errorDescription": "content policy"
        })),
    )
    .await;

    let status = client_for(&server.uri()).poll_status("job-1").await.unwrap();
    assert_eq!(
        status,
        PollStatus::Failed {
            reason: "content policy".to_string()
        }
    );
}

#[tokio::test]
async fn test_poll_errors() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        "no-files",
        ResponseTemplate::new(200).set_body_json(json!({"status": "DONE", "result": {"files": []}})),
    )
    .await;
    mount_status(&server, "broken", ResponseTemplate::new(200).set_body_string("<html>")).await;
    mount_status(&server, "server-error", ResponseTemplate::new(503)).await;

    let client = client_for(&server.uri());
    for job_id in ["no-files", "broken", "server-error"] {
        let err = client.poll_status(job_id).await.unwrap_err();
        assert!(matches!(err, AppError::Poll(_)), "{job_id}: {err}");
    }

    let err = client_for("http://127.0.0.1:1").poll_status("x").await.unwrap_err();
    assert!(matches!(err, AppError::Poll(_)));
}
