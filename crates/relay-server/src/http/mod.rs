use axum::routing::{any, get};
use axum::{Router, middleware};
use shared::relay::Relay;

mod chat;
mod cors;
mod errors;
mod health;
mod observability;

#[derive(Clone)]
pub struct AppState {
    pub relay: Relay,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        // Method checks live in the relay so every transport answers alike.
        .route("/api/chat", any(chat::chat))
        .fallback(errors::not_found)
        .layer(middleware::from_fn(cors::cors_middleware))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            observability::relay_request_log,
        ))
        .with_state(app_state)
}
