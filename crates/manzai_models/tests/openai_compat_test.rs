//! Drives the OpenAI-compatible client against a local mock provider.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use manzai_core::{CompletionRequest, Message};
use manzai_error::GeneratorErrorKind;
use manzai_interface::TextGenerator;
use manzai_models::{OpenAICompatibleClient, ProviderConfig};
use serde_json::{Value, json};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

#[derive(Clone)]
struct MockProvider {
    /// Status codes to return before answering successfully
    failures: Arc<Mutex<Vec<u16>>>,
    calls: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Value>>>,
    reply: &'static str,
}

async fn completions(
    State(state): State<MockProvider>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.calls.fetch_add(1, Ordering::SeqCst);
    state.bodies.lock().unwrap().push(body);

    let failure = {
        let mut failures = state.failures.lock().unwrap();
        if failures.is_empty() {
            None
        } else {
            Some(failures.remove(0))
        }
    };

    match failure {
        Some(status) => (
            StatusCode::from_u16(status).unwrap(),
            Json(json!({"error": "mock failure"})),
        ),
        None => (
            StatusCode::OK,
            Json(json!({
                "id": "cmpl-1",
                "model": "mock",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": format!("  {}  ", state.reply)},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30}
            })),
        ),
    }
}

async fn spawn_provider(failures: Vec<u16>) -> (String, MockProvider) {
    let state = MockProvider {
        failures: Arc::new(Mutex::new(failures)),
        calls: Arc::new(AtomicUsize::new(0)),
        bodies: Arc::new(Mutex::new(Vec::new())),
        reply: "【タイトル】\n\nA: やあ",
    };
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v1", addr), state)
}

fn client_for(base_url: &str, max_retries: usize) -> OpenAICompatibleClient {
    let mut config = ProviderConfig::xai("test-key")
        .with_base_url(base_url)
        .with_model("mock-model")
        .with_max_retries(max_retries);
    config.retry_backoff_ms = 1;
    OpenAICompatibleClient::new(config).unwrap()
}

fn request() -> CompletionRequest {
    CompletionRequest::new(
        vec![Message::system("persona"), Message::user("prompt")],
        0.8,
        2048,
    )
}

#[tokio::test]
async fn returns_trimmed_first_choice() {
    let (url, state) = spawn_provider(vec![]).await;
    let client = client_for(&url, 0);

    let text = client.complete(&request()).await.unwrap();

    assert_eq!(text, "【タイトル】\n\nA: やあ");
    assert_eq!(state.calls.load(Ordering::SeqCst), 1);

    let bodies = state.bodies.lock().unwrap();
    assert_eq!(bodies[0]["model"], "mock-model");
    assert_eq!(bodies[0]["max_tokens"], 2048);
    assert_eq!(bodies[0]["max_output_tokens"], 2048);
    assert_eq!(bodies[0]["messages"][0]["role"], "system");
}

#[tokio::test]
async fn retries_transient_status() {
    let (url, state) = spawn_provider(vec![503]).await;
    let client = client_for(&url, 2);

    let text = client.complete(&request()).await.unwrap();

    assert!(text.contains("A: やあ"));
    assert_eq!(state.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn permanent_status_fails_without_retry() {
    let (url, state) = spawn_provider(vec![401]).await;
    let client = client_for(&url, 3);

    let err = client.complete(&request()).await.unwrap_err();

    assert_eq!(err.kind.status(), Some(401));
    assert!(matches!(err.kind, GeneratorErrorKind::Api { .. }));
    assert_eq!(state.calls.load(Ordering::SeqCst), 1);
}
