use std::collections::VecDeque;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use shared::llm::{
    AnthropicGateway, AnthropicGatewayConfig, CompletionRequest, LlmGateway, LlmGatewayError,
};
use shared::models::ChatMessage;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone)]
struct MockReply {
    status: StatusCode,
    body: Value,
}

#[derive(Debug, Clone)]
struct TestServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    seen_payloads: Arc<Mutex<Vec<Value>>>,
    seen_api_keys: Arc<Mutex<Vec<String>>>,
}

impl TestServerState {
    fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen_payloads: Arc::new(Mutex::new(Vec::new())),
            seen_api_keys: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[tokio::test]
async fn sends_messages_api_request_and_parses_content_blocks() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: success_response_body(json!([
            { "type": "text", "text": "Register with geauxBIZ first." }
        ])),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = AnthropicGateway::new(config_for(url)).expect("gateway should build");
    let response = gateway
        .complete(registration_request())
        .await
        .expect("completion should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(response.model, "provider-model");
    assert_eq!(response.provider_request_id.as_deref(), Some("msg_01"));
    assert_eq!(response.first_text(), Some("Register with geauxBIZ first."));
    let usage = response.usage.expect("usage should be present");
    assert_eq!(usage.input_tokens, 42);
    assert_eq!(usage.output_tokens, 7);

    let seen_payloads = state.seen_payloads.lock().await.clone();
    assert_eq!(seen_payloads.len(), 1);
    assert_eq!(seen_payloads[0]["model"], "test-model");
    assert_eq!(seen_payloads[0]["max_tokens"], 2048);
    assert_eq!(seen_payloads[0]["system"], "You help Louisiana businesses.");
    assert_eq!(
        seen_payloads[0]["messages"],
        json!([
            { "role": "assistant", "content": "Welcome!" },
            { "role": "user", "content": "How do I register?" }
        ])
    );

    let seen_api_keys = state.seen_api_keys.lock().await.clone();
    assert_eq!(seen_api_keys, vec!["test-anthropic-key".to_string()]);
}

#[tokio::test]
async fn omits_system_field_when_no_prompt_given() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: success_response_body(json!([{ "type": "text", "text": "ok" }])),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = AnthropicGateway::new(config_for(url)).expect("gateway should build");
    let mut request = registration_request();
    request.system_prompt = None;
    gateway
        .complete(request)
        .await
        .expect("completion should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    let seen_payloads = state.seen_payloads.lock().await.clone();
    assert!(seen_payloads[0].get("system").is_none());
}

#[tokio::test]
async fn maps_unauthorized_and_rate_limited_statuses() {
    let state = TestServerState::with_replies(vec![
        provider_error_reply(StatusCode::UNAUTHORIZED, "authentication_error", "invalid x-api-key"),
        provider_error_reply(StatusCode::TOO_MANY_REQUESTS, "rate_limit_error", "slow down"),
    ]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = AnthropicGateway::new(config_for(url)).expect("gateway should build");
    let unauthorized = gateway
        .complete(registration_request())
        .await
        .expect_err("401 should fail");
    let rate_limited = gateway
        .complete(registration_request())
        .await
        .expect_err("429 should fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(matches!(unauthorized, LlmGatewayError::Unauthorized));
    assert!(matches!(rate_limited, LlmGatewayError::RateLimited));

    // Neither failure is retried.
    assert_eq!(state.seen_payloads.lock().await.len(), 2);
}

#[tokio::test]
async fn other_failures_carry_provider_message() {
    let state = TestServerState::with_replies(vec![provider_error_reply(
        StatusCode::SERVICE_UNAVAILABLE,
        "overloaded_error",
        "Overloaded",
    )]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = AnthropicGateway::new(config_for(url)).expect("gateway should build");
    let err = gateway
        .complete(registration_request())
        .await
        .expect_err("503 should fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(
            err,
            LlmGatewayError::ProviderFailure { status: 503, ref message } if message == "Overloaded"
        ),
        "expected structured provider failure, got {err:?}"
    );
}

#[tokio::test]
async fn unreachable_provider_is_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("address should resolve");
    drop(listener);

    let gateway = AnthropicGateway::new(config_for(format!("http://{addr}/v1/messages")))
        .expect("gateway should build");
    let err = gateway
        .complete(registration_request())
        .await
        .expect_err("closed port should fail");

    assert!(matches!(err, LlmGatewayError::Unavailable(_)), "got {err:?}");
}

fn registration_request() -> CompletionRequest {
    CompletionRequest {
        system_prompt: Some("You help Louisiana businesses.".to_string()),
        messages: vec![
            ChatMessage::assistant("Welcome!"),
            ChatMessage::user("How do I register?"),
        ],
        max_tokens: 2048,
    }
}

fn config_for(messages_url: String) -> AnthropicGatewayConfig {
    AnthropicGatewayConfig {
        messages_url,
        api_key: "test-anthropic-key".to_string(),
        api_version: "2023-06-01".to_string(),
        model: "test-model".to_string(),
        timeout_ms: 5_000,
    }
}

fn success_response_body(content: Value) -> Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "model": "provider-model",
        "content": content,
        "stop_reason": "end_turn",
        "usage": {
            "input_tokens": 42,
            "output_tokens": 7
        }
    })
}

fn provider_error_reply(status: StatusCode, kind: &str, message: &str) -> MockReply {
    MockReply {
        status,
        body: json!({
            "type": "error",
            "error": {
                "type": kind,
                "message": message
            }
        }),
    }
}

async fn spawn_test_server(
    state: TestServerState,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/v1/messages", post(test_messages_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        server.await.expect("test server should run");
    });

    (
        format!("http://{local_addr}/v1/messages"),
        shutdown_tx,
        server_task,
    )
}

async fn test_messages_handler(
    State(state): State<TestServerState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.seen_payloads.lock().await.push(payload);

    if let Some(value) = headers
        .get("x-api-key")
        .and_then(|header| header.to_str().ok())
    {
        state.seen_api_keys.lock().await.push(value.to_string());
    }

    let reply = state.replies.lock().await.pop_front().unwrap_or(MockReply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({
            "type": "error",
            "error": {
                "type": "api_error",
                "message": "exhausted test replies"
            }
        }),
    });

    (reply.status, Json(reply.body))
}
