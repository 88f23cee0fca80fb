use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::gateway::{
    CompletionRequest, CompletionResponse, ContentBlock, LlmGateway, LlmGatewayError,
    LlmGatewayFuture, LlmTokenUsage,
};
use crate::config::ConfigError;
use crate::config_env::{optional_trimmed_env, parse_u64_env};
use crate::models::ChatMessage;

const DEFAULT_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const DEFAULT_API_VERSION: &str = "2023-06-01";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone)]
pub struct AnthropicGatewayConfig {
    pub messages_url: String,
    pub api_key: String,
    pub api_version: String,
    pub model: String,
    pub timeout_ms: u64,
}

impl AnthropicGatewayConfig {
    /// Returns `Ok(None)` when `ANTHROPIC_API_KEY` is unset or blank. A relay
    /// without a key still starts; requests then fail as misconfigured.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = optional_trimmed_env("ANTHROPIC_API_KEY") else {
            return Ok(None);
        };

        let messages_url = optional_trimmed_env("ANTHROPIC_MESSAGES_URL")
            .unwrap_or_else(|| DEFAULT_MESSAGES_URL.to_string());
        if !messages_url.starts_with("http://") && !messages_url.starts_with("https://") {
            return Err(ConfigError::InvalidConfiguration(
                "ANTHROPIC_MESSAGES_URL must start with http:// or https://".to_string(),
            ));
        }

        Ok(Some(Self {
            messages_url,
            api_key,
            api_version: optional_trimmed_env("ANTHROPIC_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            model: optional_trimmed_env("ANTHROPIC_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_ms: parse_u64_env("ANTHROPIC_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
        }))
    }
}

#[derive(Clone)]
pub struct AnthropicGateway {
    client: reqwest::Client,
    config: AnthropicGatewayConfig,
}

impl AnthropicGateway {
    pub fn new(config: AnthropicGatewayConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| {
                ConfigError::InvalidConfiguration(format!(
                    "failed to build Anthropic http client: {err}"
                ))
            })?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn send(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmGatewayError> {
        let request_body = MessagesRequest {
            model: &self.config.model,
            max_tokens: request.max_tokens,
            system: request.system_prompt.as_deref(),
            messages: &request.messages,
        };

        let response = self
            .client
            .post(&self.config.messages_url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmGatewayError::Timeout
                } else {
                    LlmGatewayError::Unavailable(err.to_string())
                }
            })?;

        let status = response.status();
        let header_request_id = header_request_id(response.headers());
        let body = response.text().await.map_err(|_| {
            LlmGatewayError::InvalidProviderPayload("response_body_read_failed".to_string())
        })?;

        match status {
            StatusCode::UNAUTHORIZED => return Err(LlmGatewayError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => return Err(LlmGatewayError::RateLimited),
            status if !status.is_success() => {
                return Err(LlmGatewayError::ProviderFailure {
                    status: status.as_u16(),
                    message: parse_provider_error_message(&body).unwrap_or_else(|| {
                        status
                            .canonical_reason()
                            .unwrap_or("unknown provider error")
                            .to_string()
                    }),
                });
            }
            _ => {}
        }

        let parsed: MessagesResponse = serde_json::from_str(&body).map_err(|_| {
            LlmGatewayError::InvalidProviderPayload("response_json_parse_failed".to_string())
        })?;

        Ok(CompletionResponse {
            model: parsed.model.unwrap_or_else(|| self.config.model.clone()),
            provider_request_id: header_request_id.or(parsed.id),
            content: parsed.content,
            usage: parsed.usage.map(|usage| LlmTokenUsage {
                input_tokens: clamp_u64_to_u32(usage.input_tokens.unwrap_or(0)),
                output_tokens: clamp_u64_to_u32(usage.output_tokens.unwrap_or(0)),
            }),
        })
    }
}

impl LlmGateway for AnthropicGateway {
    fn complete<'a>(&'a self, request: CompletionRequest) -> LlmGatewayFuture<'a> {
        Box::pin(self.send(request))
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    id: Option<String>,
    model: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

fn header_request_id(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get("request-id")
        .or_else(|| headers.get("x-request-id"))
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

fn parse_provider_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ProviderErrorEnvelope {
        error: Option<ProviderErrorDetails>,
    }

    #[derive(Deserialize)]
    struct ProviderErrorDetails {
        message: Option<Value>,
    }

    let parsed = serde_json::from_str::<ProviderErrorEnvelope>(body).ok()?;
    match parsed.error?.message? {
        Value::String(message) if !message.trim().is_empty() => Some(message),
        _ => None,
    }
}

fn clamp_u64_to_u32(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}
