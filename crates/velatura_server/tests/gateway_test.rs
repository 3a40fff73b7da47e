//! End-to-end tests for the gateway against a mock Ollama server.

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use velatura_server::{AllowedOrigins, GatewayConfig, create_router};

// ============================================================================
// Mock Ollama
// ============================================================================

/// NDJSON lines with markup split across fragments and one malformed line.
const STREAM_LINES: &[&str] = &[
    "{\"model\":\"deepseek-r1\",\"response\":\"<thi\",\"done\":false}\n",
    "{\"model\":\"deepseek-r1\",\"response\":\"nk>Let me reason\",\"done\":false}\n",
    "not json at all\n",
    "{\"model\":\"deepseek-r1\",\"response\":\" about it.</think>Hello\",\"done\":false}\n",
    "{\"model\":\"deepseek-r1\",\"response\":\", world!\",\"done\":false}\n",
    "{\"model\":\"deepseek-r1\",\"response\":\"\",\"done\":true,\"total_duration\":1234}\n",
];

#[derive(Clone, Default)]
struct MockOllama {
    calls: Arc<AtomicUsize>,
    last_payload: Arc<Mutex<Option<Value>>>,
    fail_with: Option<(StatusCode, &'static str)>,
}

impl MockOllama {
    fn failing(status: StatusCode, body: &'static str) -> Self {
        Self {
            fail_with: Some((status, body)),
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_payload(&self) -> Value {
        self.last_payload
            .lock()
            .expect("payload lock")
            .clone()
            .expect("upstream was called")
    }
}

async fn mock_generate(State(mock): State<MockOllama>, Json(payload): Json<Value>) -> Response {
    mock.calls.fetch_add(1, Ordering::SeqCst);
    let stream = payload["stream"].as_bool().unwrap_or(true);
    *mock.last_payload.lock().expect("payload lock") = Some(payload);

    if let Some((status, body)) = mock.fail_with {
        return (status, body).into_response();
    }

    if stream {
        let chunks = STREAM_LINES
            .iter()
            .map(|line| Ok::<_, std::convert::Infallible>(*line));
        (
            [(header::CONTENT_TYPE, "application/x-ndjson")],
            Body::from_stream(futures::stream::iter(chunks)),
        )
            .into_response()
    } else {
        Json(json!({
            "model": "deepseek-r1",
            "response": "<think>\nweighing options\n</think>\n\nThe answer is 42.",
            "done": true,
            "total_duration": 987654321u64,
        }))
        .into_response()
    }
}

async fn spawn(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server");
    });
    addr
}

async fn spawn_mock(mock: MockOllama) -> SocketAddr {
    spawn(
        Router::new()
            .route("/api/generate", post(mock_generate))
            .with_state(mock),
    )
    .await
}

async fn spawn_gateway(upstream: SocketAddr, origins: AllowedOrigins) -> String {
    let config = GatewayConfig::builder()
        .upstream_base_url(format!("http://{}", upstream))
        .default_model("deepseek-r1")
        .allowed_origins(origins)
        .build()
        .expect("valid config");
    let router = create_router(config).expect("router");
    format!("http://{}", spawn(router).await)
}

/// Upstream that answers 500 with a body shorter than its Content-Length,
/// so reading the error body fails.
async fn spawn_truncated_error_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.ends_with(b"}") {
            let n = socket.read(&mut buf).await.expect("read");
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(
                b"HTTP/1.1 500 Internal Server Error\r\n\
                  content-type: text/plain\r\n\
                  content-length: 100\r\n\r\n\
                  partial",
            )
            .await
            .expect("write");
        let _ = socket.shutdown().await;
    });
    addr
}

/// Address nothing is listening on.
async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("local addr")
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_reports_ok() {
    let upstream = spawn_mock(MockOllama::default()).await;
    let gateway = spawn_gateway(upstream, AllowedOrigins::Any).await;

    let response = reqwest::get(format!("{}/health", gateway)).await.expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body, json!({ "status": "ok" }));
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_empty_prompt_rejected_without_upstream_call() {
    let mock = MockOllama::default();
    let upstream = spawn_mock(mock.clone()).await;
    let gateway = spawn_gateway(upstream, AllowedOrigins::Any).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/generate", gateway))
        .json(&json!({ "prompt": "" }))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await.expect("json");
    assert!(body["detail"].as_str().expect("detail").contains("prompt"));
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_missing_prompt_rejected_without_upstream_call() {
    let mock = MockOllama::default();
    let upstream = spawn_mock(mock.clone()).await;
    let gateway = spawn_gateway(upstream, AllowedOrigins::Any).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/generate", gateway))
        .json(&json!({ "model": "llama3" }))
        .send()
        .await
        .expect("request");

    assert!(response.status().is_client_error());
    assert_eq!(mock.calls(), 0);
}

// ============================================================================
// Streaming
// ============================================================================

#[tokio::test]
async fn test_streaming_is_default_and_strips_markup() {
    let mock = MockOllama::default();
    let upstream = spawn_mock(mock.clone()).await;
    let gateway = spawn_gateway(upstream, AllowedOrigins::Any).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/generate", gateway))
        .json(&json!({ "prompt": "Say hello" }))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"));
    assert_eq!(response.text().await.expect("body"), "Hello, world!");

    let payload = mock.last_payload();
    assert_eq!(payload["model"], "deepseek-r1");
    assert_eq!(payload["prompt"], "Say hello");
    assert_eq!(payload["stream"], true);
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_streams_do_not_share_filter_state() {
    let mock = MockOllama::default();
    let upstream = spawn_mock(mock.clone()).await;
    let gateway = spawn_gateway(upstream, AllowedOrigins::Any).await;
    let client = reqwest::Client::new();

    let request = |prompt: &'static str| {
        let client = client.clone();
        let url = format!("{}/api/generate?stream=true", gateway);
        async move {
            client
                .post(url)
                .json(&json!({ "prompt": prompt }))
                .send()
                .await
                .expect("request")
                .text()
                .await
                .expect("body")
        }
    };

    let (first, second) = tokio::join!(request("one"), request("two"));
    assert_eq!(first, "Hello, world!");
    assert_eq!(second, "Hello, world!");
    assert_eq!(mock.calls(), 2);
}

// ============================================================================
// Non-streaming
// ============================================================================

#[tokio::test]
async fn test_non_streaming_query_returns_cleaned_json() {
    let mock = MockOllama::default();
    let upstream = spawn_mock(mock.clone()).await;
    let gateway = spawn_gateway(upstream, AllowedOrigins::Any).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/generate?stream=false", gateway))
        .json(&json!({ "prompt": "What is the answer?", "model": "llama3" }))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.expect("json");
    assert_eq!(
        body,
        json!({
            "model": "deepseek-r1",
            "response": "\n\nThe answer is 42.",
            "total_duration": 987654321u64,
        })
    );

    let payload = mock.last_payload();
    assert_eq!(payload["model"], "llama3");
    assert_eq!(payload["stream"], false);
}

#[tokio::test]
async fn test_body_stream_flag_used_when_query_absent() {
    let mock = MockOllama::default();
    let upstream = spawn_mock(mock.clone()).await;
    let gateway = spawn_gateway(upstream, AllowedOrigins::Any).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/generate", gateway))
        .json(&json!({ "prompt": "hi", "stream": false }))
        .send()
        .await
        .expect("request");

    let body: Value = response.json().await.expect("json");
    assert_eq!(body["response"], "\n\nThe answer is 42.");
    assert_eq!(mock.last_payload()["stream"], false);
}

#[tokio::test]
async fn test_numeric_query_flag_disables_streaming() {
    let mock = MockOllama::default();
    let upstream = spawn_mock(mock.clone()).await;
    let gateway = spawn_gateway(upstream, AllowedOrigins::Any).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/generate?stream=0", gateway))
        .json(&json!({ "prompt": "hi", "stream": true }))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["response"], "\n\nThe answer is 42.");
    assert_eq!(mock.last_payload()["stream"], false);
}

#[tokio::test]
async fn test_word_query_flag_enables_streaming() {
    let mock = MockOllama::default();
    let upstream = spawn_mock(mock.clone()).await;
    let gateway = spawn_gateway(upstream, AllowedOrigins::Any).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/generate?stream=yes", gateway))
        .json(&json!({ "prompt": "hi", "stream": false }))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.expect("body"), "Hello, world!");
    assert_eq!(mock.last_payload()["stream"], true);
}

#[tokio::test]
async fn test_unrecognised_query_flag_rejected_without_upstream_call() {
    let mock = MockOllama::default();
    let upstream = spawn_mock(mock.clone()).await;
    let gateway = spawn_gateway(upstream, AllowedOrigins::Any).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/generate?stream=maybe", gateway))
        .json(&json!({ "prompt": "hi" }))
        .send()
        .await
        .expect("request");

    assert!(response.status().is_client_error());
    assert_eq!(mock.calls(), 0);
}

// ============================================================================
// Upstream failures
// ============================================================================

#[tokio::test]
async fn test_upstream_error_status_surfaces_detail() {
    let mock = MockOllama::failing(StatusCode::NOT_FOUND, "model 'nope' not found");
    let upstream = spawn_mock(mock.clone()).await;
    let gateway = spawn_gateway(upstream, AllowedOrigins::Any).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/generate", gateway))
        .json(&json!({ "prompt": "hi", "model": "nope" }))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.expect("json");
    let detail = body["detail"].as_str().expect("detail");
    assert!(detail.starts_with("Ollama request failed"));
    assert!(detail.contains("404"));
    assert!(detail.contains("model 'nope' not found"));
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_upstream_error_status_non_streaming() {
    let mock = MockOllama::failing(StatusCode::INTERNAL_SERVER_ERROR, "out of memory");
    let upstream = spawn_mock(mock.clone()).await;
    let gateway = spawn_gateway(upstream, AllowedOrigins::Any).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/generate?stream=false", gateway))
        .json(&json!({ "prompt": "hi" }))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.expect("json");
    assert!(body["detail"].as_str().expect("detail").contains("out of memory"));
}

#[tokio::test]
async fn test_unreadable_error_body_still_reports_status() {
    let upstream = spawn_truncated_error_upstream().await;
    let gateway = spawn_gateway(upstream, AllowedOrigins::Any).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/generate", gateway))
        .json(&json!({ "prompt": "hi" }))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.expect("json");
    let detail = body["detail"].as_str().expect("detail");
    assert!(detail.starts_with("Ollama request failed"));
    assert!(detail.contains("500"));
    assert!(!detail.contains("partial"));
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let upstream = dead_address().await;
    let gateway = spawn_gateway(upstream, AllowedOrigins::Any).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/generate", gateway))
        .json(&json!({ "prompt": "hi" }))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.expect("json");
    assert!(
        body["detail"]
            .as_str()
            .expect("detail")
            .starts_with("Ollama request failed")
    );
}

// ============================================================================
// CORS
// ============================================================================

#[tokio::test]
async fn test_wildcard_origins_allow_any() {
    let upstream = spawn_mock(MockOllama::default()).await;
    let gateway = spawn_gateway(upstream, AllowedOrigins::Any).await;

    let response = reqwest::Client::new()
        .get(format!("{}/health", gateway))
        .header(reqwest::header::ORIGIN, "http://somewhere.test")
        .send()
        .await
        .expect("request");

    let allowed = response
        .headers()
        .get(reqwest::header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .expect("cors header");
    assert_eq!(allowed, "*");
}

#[tokio::test]
async fn test_listed_origins_only_allow_listed() {
    let upstream = spawn_mock(MockOllama::default()).await;
    let origins = AllowedOrigins::parse("http://app.test, http://admin.test");
    let gateway = spawn_gateway(upstream, origins).await;
    let client = reqwest::Client::new();

    let allowed = client
        .get(format!("{}/health", gateway))
        .header(reqwest::header::ORIGIN, "http://admin.test")
        .send()
        .await
        .expect("request");
    assert_eq!(
        allowed
            .headers()
            .get(reqwest::header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .expect("cors header"),
        "http://admin.test"
    );
    assert_eq!(
        allowed
            .headers()
            .get(reqwest::header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .expect("credentials header"),
        "true"
    );

    let rejected = client
        .get(format!("{}/health", gateway))
        .header(reqwest::header::ORIGIN, "http://evil.test")
        .send()
        .await
        .expect("request");
    assert!(
        rejected
            .headers()
            .get(reqwest::header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}
