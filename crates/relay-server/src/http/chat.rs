use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::Method;
use axum::response::{IntoResponse, Response};

use super::AppState;

pub(super) async fn chat(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    let relayed = state.relay.handle(&method, &body).await;
    match relayed.body {
        Some(body) => (relayed.status, Json(body)).into_response(),
        None => relayed.status.into_response(),
    }
}
