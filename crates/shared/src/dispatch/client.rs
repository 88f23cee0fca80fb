use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::config::DispatcherConfig;
use crate::models::ConversationRequest;

#[derive(Debug, Clone)]
pub struct RelayReply {
    pub status: StatusCode,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum RelayTransportError {
    #[error("relay request timed out")]
    Timeout,
    #[error("relay unreachable: {0}")]
    Unreachable(String),
    #[error("failed to build relay http client: {0}")]
    HttpClient(String),
}

/// Thin HTTP client for the relay's `/api/chat` route.
#[derive(Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    chat_url: String,
}

impl RelayClient {
    pub fn new(config: &DispatcherConfig) -> Result<Self, RelayTransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| RelayTransportError::HttpClient(err.to_string()))?;

        Ok(Self {
            client,
            chat_url: format!("{}/api/chat", config.relay_url.trim_end_matches('/')),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    pub async fn post_chat(
        &self,
        request: &ConversationRequest,
    ) -> Result<RelayReply, RelayTransportError> {
        let response = self
            .client
            .post(&self.chat_url)
            .json(request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    RelayTransportError::Timeout
                } else {
                    RelayTransportError::Unreachable(err.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| RelayTransportError::Unreachable(err.to_string()))?;

        Ok(RelayReply { status, body })
    }
}
