pub mod anthropic;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};

use crate::config::{ApiProvider, AppConfig};
use crate::errors::{AssistantError, Result};
use crate::models::ApiErrorResponse;

pub use self::anthropic::AnthropicChat;
pub use self::openai::OpenAiChat;

/// "Prompt in, text out" view of a chat-completion service.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<String>;

    fn model_name(&self) -> &str;
}

/// Build the chat client selected by `API_PROVIDER`.
pub fn create_chat_model(config: &AppConfig) -> Result<Arc<dyn ChatModel>> {
    let key = config
        .api_key()
        .cloned()
        .ok_or_else(|| match config.api.provider {
            ApiProvider::Anthropic => AssistantError::MissingConfig("ANTHROPIC_API_KEY".into()),
            ApiProvider::OpenAi => AssistantError::MissingConfig("OPENAI_API_KEY".into()),
        })?;
    let client = http_client(config.api.request_timeout)?;

    let model: Arc<dyn ChatModel> = match config.api.provider {
        ApiProvider::Anthropic => Arc::new(AnthropicChat::new(
            client,
            config.api.anthropic_base_url.clone(),
            key,
            config.llm.anthropic_model.clone(),
            config.llm.temperature,
            config.llm.max_tokens,
        )),
        ApiProvider::OpenAi => Arc::new(OpenAiChat::new(
            client,
            config.api.openai_base_url.clone(),
            key,
            config.llm.openai_model.clone(),
            config.llm.temperature,
            config.llm.max_tokens,
        )),
    };
    tracing::debug!("Created chat model {}", model.model_name());
    Ok(model)
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AssistantError::provider("http", e))
}

/// Turn a non-success response into a provider error, preferring the
/// API's own error message over the raw body.
pub(crate) async fn error_from_response(provider: &str, response: Response) -> AssistantError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    AssistantError::provider(provider, format!("{} - {}", status, message))
}
