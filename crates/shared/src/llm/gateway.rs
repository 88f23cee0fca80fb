use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ChatMessage;

pub type LlmGatewayFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmGatewayError>> + Send + 'a>>;

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

/// A block of the provider's reply. Only text blocks are consumed; every
/// other kind (tool use, images, ...) decodes to `Unsupported`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmTokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub model: String,
    pub provider_request_id: Option<String>,
    pub content: Vec<ContentBlock>,
    pub usage: Option<LlmTokenUsage>,
}

impl CompletionResponse {
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::Unsupported => None,
        })
    }
}

#[derive(Debug, Error)]
pub enum LlmGatewayError {
    #[error("llm provider rejected the api key")]
    Unauthorized,
    #[error("llm provider rate limit exceeded")]
    RateLimited,
    #[error("llm provider request timed out")]
    Timeout,
    #[error("llm provider unreachable: {0}")]
    Unavailable(String),
    #[error("llm provider request failed with status {status}: {message}")]
    ProviderFailure { status: u16, message: String },
    #[error("llm provider returned an invalid payload: {0}")]
    InvalidProviderPayload(String),
}

pub trait LlmGateway: Send + Sync {
    fn complete<'a>(&'a self, request: CompletionRequest) -> LlmGatewayFuture<'a>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CompletionResponse, ContentBlock};

    #[test]
    fn first_text_skips_non_text_blocks() {
        let content: Vec<ContentBlock> = serde_json::from_value(json!([
            { "type": "tool_use", "id": "toolu_1", "name": "lookup", "input": {} },
            { "type": "text", "text": "first" },
            { "type": "text", "text": "second" }
        ]))
        .expect("content blocks should decode");

        let response = CompletionResponse {
            model: "test-model".to_string(),
            provider_request_id: None,
            content,
            usage: None,
        };

        assert_eq!(response.first_text(), Some("first"));
    }

    #[test]
    fn first_text_is_none_without_text_blocks() {
        let response = CompletionResponse {
            model: "test-model".to_string(),
            provider_request_id: None,
            content: vec![ContentBlock::Unsupported],
            usage: None,
        };

        assert_eq!(response.first_text(), None);
    }
}
