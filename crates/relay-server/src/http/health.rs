use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use super::AppState;

pub(super) async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.relay.health())
}
