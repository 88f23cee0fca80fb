use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info, warn};
use uuid::Uuid;

use super::AppState;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const MAX_REQUEST_ID_LEN: usize = 128;

/// How a relayed request ended, as seen from its response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelayOutcome {
    Answered,
    Rejected,
    ProviderDeclined,
    Failed,
}

impl RelayOutcome {
    fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::TOO_MANY_REQUESTS => Self::ProviderDeclined,
            status if status.is_server_error() => Self::Failed,
            status if status.is_client_error() => Self::Rejected,
            _ => Self::Answered,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Answered => "answered",
            Self::Rejected => "rejected",
            Self::ProviderDeclined => "provider_declined",
            Self::Failed => "failed",
        }
    }
}

/// Tags every response with a request id and logs one line per request
/// with its route, outcome and whether a provider key is configured.
pub(super) async fn relay_request_log(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let request_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(normalize_request_id)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| req.uri().path().to_string(), |path| path.as_str().to_string());
    let has_api_key = state.relay.has_api_key();
    let started_at = Instant::now();

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let status = response.status();
    let outcome = RelayOutcome::from_status(status);
    let latency_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
    if outcome == RelayOutcome::Failed {
        warn!(
            request_id = %request_id,
            method = %method,
            route = %route,
            status = status.as_u16(),
            outcome = outcome.as_str(),
            has_api_key,
            latency_ms,
            "relay request failed"
        );
    } else {
        info!(
            request_id = %request_id,
            method = %method,
            route = %route,
            status = status.as_u16(),
            outcome = outcome.as_str(),
            has_api_key,
            latency_ms,
            "relay request handled"
        );
    }

    response
}

fn normalize_request_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let usable = !trimmed.is_empty()
        && trimmed.len() <= MAX_REQUEST_ID_LEN
        && trimmed
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.'));
    usable.then(|| trimmed.to_string())
}
