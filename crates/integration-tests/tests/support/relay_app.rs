use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use relay_server::{AppState, build_router};
use serde_json::{Value, json};
use shared::llm::LlmGateway;
use shared::relay::Relay;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceExt;

pub fn build_test_router(gateway: Option<Arc<dyn LlmGateway>>) -> Router {
    build_router(AppState {
        relay: Relay::new(gateway),
    })
}

pub struct RunningRelay {
    pub base_url: String,
    shutdown_tx: oneshot::Sender<()>,
    server_task: tokio::task::JoinHandle<()>,
}

impl RunningRelay {
    pub async fn stop(self) {
        self.shutdown_tx
            .send(())
            .expect("shutdown signal should send");
        self.server_task.await.expect("server task should join");
    }
}

pub async fn spawn_relay(app: Router) -> RunningRelay {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("relay test server should run");
    });

    RunningRelay {
        base_url: format!("http://{local_addr}"),
        shutdown_tx,
        server_task,
    }
}

/// A base url on which nothing is listening.
pub async fn closed_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("address should resolve");
    drop(listener);
    format!("http://{addr}")
}

pub struct JsonResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub raw_body: Vec<u8>,
    pub body: Value,
}

pub async fn send(app: &Router, request: Request<Body>) -> JsonResponse {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request should succeed");
    let status = response.status();
    let headers = response.headers().clone();
    let raw_body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should read")
        .to_vec();
    let body = serde_json::from_slice::<Value>(&raw_body).unwrap_or_else(|_| json!({}));

    JsonResponse {
        status,
        headers,
        raw_body,
        body,
    }
}

pub fn request(method: Method, uri: &str, json_body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match json_body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build"),
        None => builder.body(Body::empty()).expect("request should build"),
    }
}

pub fn error_message(body: &Value) -> Option<&str> {
    body.get("error").and_then(Value::as_str)
}
