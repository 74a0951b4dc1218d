use async_trait::async_trait;
use reqwest::Client;

use super::{error_from_response, ChatModel};
use crate::config::ApiKey;
use crate::errors::{AssistantError, Result};
use crate::models::{ChatRequest, ChatResponse, Message};

const PROVIDER: &str = "OpenAI";

pub struct OpenAiChat {
    client: Client,
    base_url: String,
    api_key: ApiKey,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiChat {
    pub fn new(
        client: Client,
        base_url: String,
        api_key: ApiKey,
        model: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
            temperature,
            max_tokens,
        }
    }

    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::provider(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(PROVIDER, response).await);
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| AssistantError::provider(PROVIDER, format!("invalid response: {}", e)))
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::user(prompt)],
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        };

        tracing::debug!("Sending {} chars to {}", prompt.len(), self.model);
        let response = self.chat_completion(request).await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AssistantError::provider(PROVIDER, "response contained no choices"))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
