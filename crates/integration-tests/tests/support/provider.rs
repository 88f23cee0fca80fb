use std::collections::VecDeque;
use std::sync::Arc;

use shared::llm::{
    CompletionRequest, CompletionResponse, ContentBlock, LlmGateway, LlmGatewayError,
    LlmGatewayFuture,
};
use tokio::sync::Mutex;

/// One scripted provider outcome, consumed in order.
#[derive(Debug, Clone)]
pub enum ProviderOutcome {
    Text(String),
    NoText,
    Unauthorized,
    RateLimited,
    Failure { status: u16, message: String },
}

impl ProviderOutcome {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

#[derive(Clone, Default)]
pub struct MockProvider {
    outcomes: Arc<Mutex<VecDeque<ProviderOutcome>>>,
    seen: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockProvider {
    pub fn with_outcomes(outcomes: Vec<ProviderOutcome>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(VecDeque::from(outcomes))),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn seen_requests(&self) -> Vec<CompletionRequest> {
        self.seen.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.seen.lock().await.len()
    }

    pub fn as_gateway(&self) -> Arc<dyn LlmGateway> {
        Arc::new(self.clone())
    }
}

impl LlmGateway for MockProvider {
    fn complete<'a>(&'a self, request: CompletionRequest) -> LlmGatewayFuture<'a> {
        Box::pin(async move {
            self.seen.lock().await.push(request);
            let outcome = self
                .outcomes
                .lock()
                .await
                .pop_front()
                .unwrap_or(ProviderOutcome::Failure {
                    status: 500,
                    message: "exhausted mock outcomes".to_string(),
                });

            let content = match outcome {
                ProviderOutcome::Text(text) => vec![ContentBlock::Text { text }],
                ProviderOutcome::NoText => vec![ContentBlock::Unsupported],
                ProviderOutcome::Unauthorized => return Err(LlmGatewayError::Unauthorized),
                ProviderOutcome::RateLimited => return Err(LlmGatewayError::RateLimited),
                ProviderOutcome::Failure { status, message } => {
                    return Err(LlmGatewayError::ProviderFailure { status, message });
                }
            };

            Ok(CompletionResponse {
                model: "mock-model".to_string(),
                provider_request_id: Some("mock-request".to_string()),
                content,
                usage: None,
            })
        })
    }
}
