use async_trait::async_trait;
use reqwest::Client;

use super::{error_from_response, ChatModel};
use crate::config::ApiKey;
use crate::errors::{AssistantError, Result};
use crate::models::{AnthropicRequest, AnthropicResponse, Message};

const PROVIDER: &str = "Anthropic";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicChat {
    client: Client,
    base_url: String,
    api_key: ApiKey,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicChat {
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
}

fn response_text(response: AnthropicResponse) -> Option<String> {
    let text: Vec<String> = response
        .content
        .into_iter()
        .filter(|block| block.block_type.is_empty() || block.block_type == "text")
        .filter_map(|block| block.text)
        .collect();

    if text.is_empty() {
        None
    } else {
        Some(text.join(""))
    }
}

#[async_trait]
impl ChatModel for AnthropicChat {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/messages", self.base_url);
        let request = AnthropicRequest {
            model: self.model.clone(),
            messages: vec![Message::user(prompt)],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        tracing::debug!("Sending {} chars to {}", prompt.len(), self.model);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::provider(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(PROVIDER, response).await);
        }

        let body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::provider(PROVIDER, format!("invalid response: {}", e)))?;

        response_text(body)
            .ok_or_else(|| AssistantError::provider(PROVIDER, "response contained no text"))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn test_text_blocks_are_concatenated() {
        let body = r#"{"content":[
            {"type":"text","text":"Use "},
            {"type":"tool_use","id":"x"},
            {"type":"text","text":"move_and_slide()."}
        ]}"#;
        let response: AnthropicResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response_text(response).as_deref(), Some("Use move_and_slide()."));
    }

    #[test]
    fn test_empty_content_has_no_text() {
        let response: AnthropicResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert!(response_text(response).is_none());
    }

    fn chat(base_url: String) -> AnthropicChat {
        AnthropicChat::new(
            Client::new(),
            base_url,
            ApiKey::new("test_key"),
            "claude-sonnet-4-20250514".to_string(),
            0.0,
            4096,
        )
    }

    #[tokio::test]
    async fn test_invoke_posts_messages_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "test_key")
            .match_header("anthropic-version", "2023-06-01")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 4096,
                "messages": [{"role": "user", "content": "How do I jump?"}]
            })))
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"Call jump()."}]}"#)
            .create_async()
            .await;

        let answer = chat(server.url()).invoke("How do I jump?").await.unwrap();

        assert_eq!(answer, "Call jump().");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invoke_maps_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/messages")
            .with_status(401)
            .with_body(r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#)
            .create_async()
            .await;

        let err = chat(server.url()).invoke("hi").await.unwrap_err();

        match err {
            AssistantError::Provider { provider, message } => {
                assert_eq!(provider, "Anthropic");
                assert_eq!(message, "401 Unauthorized - invalid x-api-key");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invoke_without_text_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(r#"{"content":[]}"#)
            .create_async()
            .await;

        let err = chat(server.url()).invoke("hi").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Anthropic request failed: response contained no text"
        );
    }
}
