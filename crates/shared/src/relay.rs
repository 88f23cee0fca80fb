use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

use crate::config::DEFAULT_MAX_OUTPUT_TOKENS;
use crate::llm::{CompletionRequest, LlmGateway, LlmGatewayError};
use crate::models::{ChatMessage, ChatResponse, ErrorResponse, HealthResponse};

pub const MISSING_API_KEY_ERROR: &str = "API key not configured on server";
pub const MESSAGES_REQUIRED_ERROR: &str = "Messages array is required";
pub const INVALID_API_KEY_ERROR: &str = "Invalid API key";
pub const RATE_LIMIT_ERROR: &str = "Rate limit exceeded";
pub const NO_TEXT_CONTENT_ERROR: &str = "No text content in response";
pub const METHOD_NOT_ALLOWED_ERROR: &str = "Method not allowed";
const INTERNAL_ERROR: &str = "Internal server error";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("{}", MISSING_API_KEY_ERROR)]
    ServerMisconfigured,
    #[error("{0}")]
    BadRequest(String),
    #[error("{}", INVALID_API_KEY_ERROR)]
    Unauthorized,
    #[error("{}", RATE_LIMIT_ERROR)]
    RateLimited,
    #[error("{}", NO_TEXT_CONTENT_ERROR)]
    NoTextContent,
    #[error("{0}")]
    Internal(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::ServerMisconfigured | Self::NoTextContent | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn to_body(&self) -> ErrorResponse {
        ErrorResponse::new(self.to_string())
    }
}

impl From<LlmGatewayError> for RelayError {
    fn from(err: LlmGatewayError) -> Self {
        match err {
            LlmGatewayError::Unauthorized => Self::Unauthorized,
            LlmGatewayError::RateLimited => Self::RateLimited,
            LlmGatewayError::ProviderFailure { message, .. } if !message.trim().is_empty() => {
                Self::Internal(message)
            }
            LlmGatewayError::ProviderFailure { .. } => Self::Internal(INTERNAL_ERROR.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Status plus JSON body, independent of any HTTP framework.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl RelayResponse {
    fn json(status: StatusCode, body: &impl serde::Serialize) -> Self {
        Self {
            status,
            body: serde_json::to_value(body).ok(),
        }
    }
}

/// Stateless chat relay. The gateway is absent when no provider credential
/// is configured; every chat request then fails as misconfigured.
#[derive(Clone)]
pub struct Relay {
    gateway: Option<Arc<dyn LlmGateway>>,
    max_output_tokens: u32,
}

impl Relay {
    pub fn new(gateway: Option<Arc<dyn LlmGateway>>) -> Self {
        Self {
            gateway,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.gateway.is_some()
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok".to_string(),
            has_api_key: self.has_api_key(),
        }
    }

    pub async fn handle_chat(&self, payload: &Value) -> Result<ChatResponse, RelayError> {
        let Some(gateway) = self.gateway.as_deref() else {
            warn!("chat request rejected: provider api key not configured");
            return Err(RelayError::ServerMisconfigured);
        };

        let request = parse_conversation(payload, self.max_output_tokens)?;
        let response = gateway.complete(request).await.map_err(|err| {
            error!("llm provider call failed: {err}");
            RelayError::from(err)
        })?;

        match response.first_text() {
            Some(text) => Ok(ChatResponse {
                message: text.to_string(),
            }),
            None => {
                error!(model = %response.model, "llm provider reply has no text block");
                Err(RelayError::NoTextContent)
            }
        }
    }

    /// Handles one raw request the way a serverless function would: preflight,
    /// method check, then JSON decode and `handle_chat`. A body that is not
    /// valid JSON is treated as an empty payload.
    pub async fn handle(&self, method: &Method, body: &[u8]) -> RelayResponse {
        if *method == Method::OPTIONS {
            return RelayResponse {
                status: StatusCode::OK,
                body: None,
            };
        }

        if *method != Method::POST {
            return RelayResponse::json(
                StatusCode::METHOD_NOT_ALLOWED,
                &ErrorResponse::new(METHOD_NOT_ALLOWED_ERROR),
            );
        }

        let payload = serde_json::from_slice::<Value>(body).unwrap_or(Value::Null);
        match self.handle_chat(&payload).await {
            Ok(response) => RelayResponse::json(StatusCode::OK, &response),
            Err(err) => RelayResponse::json(err.status(), &err.to_body()),
        }
    }
}

fn parse_conversation(payload: &Value, max_tokens: u32) -> Result<CompletionRequest, RelayError> {
    let Some(raw_messages) = payload.get("messages").filter(|value| value.is_array()) else {
        warn!("chat request rejected: messages is missing or not an array");
        return Err(RelayError::BadRequest(MESSAGES_REQUIRED_ERROR.to_string()));
    };

    let messages = serde_json::from_value::<Vec<ChatMessage>>(raw_messages.clone()).map_err(
        |err| {
            warn!("chat request rejected: malformed message entry: {err}");
            RelayError::BadRequest(
                "Each message needs a role of user or assistant and string content".to_string(),
            )
        },
    )?;

    let system_prompt = payload
        .get("systemPrompt")
        .and_then(Value::as_str)
        .filter(|prompt| !prompt.trim().is_empty())
        .map(ToString::to_string);

    Ok(CompletionRequest {
        system_prompt,
        messages,
        max_tokens,
    })
}
