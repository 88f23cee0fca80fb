mod client;

use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

pub use client::{RelayClient, RelayReply, RelayTransportError};

use crate::fallback::fallback_response;
use crate::llm::build_system_prompt;
use crate::models::{AssessmentAnswers, ChatMessage, CompletionResult, ConversationRequest};
use crate::progress::split_reply;

pub const INVALID_API_KEY_MESSAGE: &str = "Invalid API key\n\nThe relay server's ANTHROPIC_API_KEY was rejected by the provider; check that it was copied correctly from https://console.anthropic.com/";
pub const RATE_LIMITED_MESSAGE: &str = "Rate Limit: The assistant has exceeded its API usage limits. Please wait a moment and try again.";

const MISSING_KEY_HINT: &str = "not configured";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("relay returned status {status}: {message}")]
    Relay { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct RelayMessageBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RelayErrorBody {
    error: String,
}

/// Orchestrates one chat turn: builds the request, calls the relay, and
/// degrades to the canned fallback whenever no live provider is reachable.
#[derive(Clone)]
pub struct Dispatcher {
    relay: Option<RelayClient>,
}

impl Dispatcher {
    pub fn new(relay: RelayClient) -> Self {
        Self { relay: Some(relay) }
    }

    /// A dispatcher that never contacts a relay and always answers from
    /// the fallback generator.
    pub fn offline() -> Self {
        Self { relay: None }
    }

    pub fn is_offline(&self) -> bool {
        self.relay.is_none()
    }

    pub async fn send_message(
        &self,
        user_text: &str,
        history: &[ChatMessage],
        answers: &AssessmentAnswers,
    ) -> Result<CompletionResult, DispatchError> {
        let Some(relay) = self.relay.as_ref() else {
            return Ok(fallback_response(user_text, answers));
        };

        let mut messages = history.to_vec();
        messages.push(ChatMessage::user(user_text));
        let request = ConversationRequest {
            messages,
            system_prompt: Some(build_system_prompt(answers)),
        };

        let reply = match relay.post_chat(&request).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(url = %relay.chat_url(), "relay unavailable, using fallback response: {err}");
                return Ok(fallback_response(user_text, answers));
            }
        };

        interpret_reply(reply, user_text, answers)
    }
}

fn interpret_reply(
    reply: RelayReply,
    user_text: &str,
    answers: &AssessmentAnswers,
) -> Result<CompletionResult, DispatchError> {
    match reply.status {
        StatusCode::UNAUTHORIZED => {
            return Ok(CompletionResult::text_only(INVALID_API_KEY_MESSAGE));
        }
        StatusCode::TOO_MANY_REQUESTS => {
            return Ok(CompletionResult::text_only(RATE_LIMITED_MESSAGE));
        }
        status if !status.is_success() => {
            let message = relay_error_message(&reply.body, status);
            if status == StatusCode::INTERNAL_SERVER_ERROR && message.contains(MISSING_KEY_HINT) {
                info!("relay has no provider key configured, using fallback response");
                return Ok(fallback_response(user_text, answers));
            }
            return Err(DispatchError::Relay {
                status: status.as_u16(),
                message,
            });
        }
        _ => {}
    }

    let body = serde_json::from_str::<RelayMessageBody>(&reply.body).map_err(|err| {
        DispatchError::Relay {
            status: reply.status.as_u16(),
            message: format!("relay returned an unreadable chat body: {err}"),
        }
    })?;

    let (message, progress_items) = split_reply(&body.message, Utc::now());
    Ok(CompletionResult {
        message,
        progress_items,
    })
}

fn relay_error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<RelayErrorBody>(body)
        .map(|parsed| parsed.error)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("Unknown relay error")
                .to_string()
        })
}
