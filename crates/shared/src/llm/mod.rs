pub mod anthropic;
pub mod gateway;
pub mod prompts;

pub use anthropic::{AnthropicGateway, AnthropicGatewayConfig};
pub use gateway::{
    CompletionRequest, CompletionResponse, ContentBlock, LlmGateway, LlmGatewayError,
    LlmGatewayFuture, LlmTokenUsage,
};
pub use prompts::{PROGRESS_ITEMS_MARKER, build_system_prompt, welcome_message};
