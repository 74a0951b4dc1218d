use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{
    EmbeddingModel, InitOptions, InitOptionsUserDefined, TextEmbedding, TokenizerFiles,
    UserDefinedEmbeddingModel,
};
use reqwest::Client;

use crate::config::{ApiKey, AppConfig, EmbeddingBackend};
use crate::errors::{AssistantError, Result};
use crate::llm::{error_from_response, http_client};
use crate::models::{EmbeddingRequest, EmbeddingResponse};

/// Vector size of all-MiniLM-L6-v2 and bge-small-en-v1.5.
pub const LOCAL_DIMENSION: usize = 384;
/// Vector size of text-embedding-ada-002.
pub const OPENAI_DIMENSION: usize = 1536;

/// Turns text into fixed-size vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| AssistantError::provider(self.name(), "no embedding returned"))
    }

    fn dimension(&self) -> usize;

    fn name(&self) -> &str;
}

pub fn create_embeddings(config: &AppConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.embedding.provider {
        EmbeddingBackend::Local => match &config.embedding.model_dir {
            Some(dir) => Arc::new(LocalEmbeddings::from_dir(dir)?),
            None => Arc::new(LocalEmbeddings::new()?),
        },
        EmbeddingBackend::OpenAi => {
            let key = config
                .api
                .openai_key
                .clone()
                .ok_or_else(|| AssistantError::MissingConfig("OPENAI_API_KEY".into()))?;
            Arc::new(OpenAiEmbeddings::new(
                http_client(config.api.request_timeout)?,
                config.api.openai_base_url.clone(),
                key,
                config.embedding.openai_model.clone(),
            ))
        }
    };
    Ok(provider)
}

pub struct LocalEmbeddings {
    model: TextEmbedding,
    name: String,
}

impl LocalEmbeddings {
    /// Downloads (or reuses the cached) all-MiniLM-L6-v2.
    pub fn new() -> Result<Self> {
        tracing::info!("Initializing local embedding model all-MiniLM-L6-v2...");
        let options = InitOptions {
            model_name: EmbeddingModel::AllMiniLML6V2,
            show_download_progress: true,
            ..Default::default()
        };
        let model = TextEmbedding::try_new(options)
            .map_err(|e| AssistantError::provider("fastembed", e))?;

        tracing::info!("Embedding model initialized successfully");
        Ok(Self {
            model,
            name: "all-MiniLM-L6-v2".to_string(),
        })
    }

    /// Loads an ONNX model and its tokenizer files from a local directory.
    pub fn from_dir(model_dir: &Path) -> Result<Self> {
        tracing::info!("Initializing embedding model from {}", model_dir.display());

        if !model_dir.exists() {
            return Err(AssistantError::InvalidConfig(format!(
                "Model directory not found: {}",
                model_dir.display()
            )));
        }

        let read = |name: &str| {
            std::fs::read(model_dir.join(name)).map_err(|e| {
                AssistantError::provider("fastembed", format!("Failed to read {}: {}", name, e))
            })
        };

        let user_model = UserDefinedEmbeddingModel {
            onnx_file: read("model.onnx")?,
            tokenizer_files: TokenizerFiles {
                tokenizer_file: read("tokenizer.json")?,
                config_file: read("config.json")?,
                special_tokens_map_file: read("special_tokens_map.json")?,
                tokenizer_config_file: read("tokenizer_config.json")?,
            },
        };

        let model =
            TextEmbedding::try_new_from_user_defined(user_model, InitOptionsUserDefined::default())
                .map_err(|e| AssistantError::provider("fastembed", e))?;

        let name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "local".to_string());

        tracing::info!("Embedding model initialized successfully");
        Ok(Self { model, name })
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddings {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.model
            .embed(texts.to_vec(), None)
            .map_err(|e| AssistantError::provider("fastembed", e))
    }

    fn dimension(&self) -> usize {
        LOCAL_DIMENSION
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub struct OpenAiEmbeddings {
    client: Client,
    base_url: String,
    api_key: ApiKey,
    model: String,
}

impl OpenAiEmbeddings {
    pub fn new(client: Client, base_url: String, api_key: ApiKey, model: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            encoding_format: "float",
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::provider("OpenAI embeddings", e))?;

        if !response.status().is_success() {
            return Err(error_from_response("OpenAI embeddings", response).await);
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::provider("OpenAI embeddings", e))?;

        Ok(ordered_vectors(body))
    }

    fn dimension(&self) -> usize {
        OPENAI_DIMENSION
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// The API may return items out of order; `index` ties each back to its input.
fn ordered_vectors(mut response: EmbeddingResponse) -> Vec<Vec<f32>> {
    response.data.sort_by_key(|d| d.index);
    response.data.into_iter().map(|d| d.embedding).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEmbeddings;
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn test_embedding_request_shape() {
        let input = vec!["Node2D".to_string(), "Sprite2D".to_string()];
        let request = EmbeddingRequest {
            model: "text-embedding-ada-002",
            input: &input,
            encoding_format: "float",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "text-embedding-ada-002");
        assert_eq!(json["input"][1], "Sprite2D");
        assert_eq!(json["encoding_format"], "float");
    }

    #[test]
    fn test_vectors_follow_input_order() {
        let body = r#"{"data":[
            {"index":1,"embedding":[0.5]},
            {"index":0,"embedding":[0.25]}
        ]}"#;
        let response: EmbeddingResponse = serde_json::from_str(body).unwrap();
        assert_eq!(ordered_vectors(response), vec![vec![0.25], vec![0.5]]);
    }

    #[tokio::test]
    async fn test_embed_query_uses_document_path() {
        let embeddings = FakeEmbeddings::new(8);
        let query = embeddings.embed_query("signals").await.unwrap();
        let docs = embeddings
            .embed_documents(&["signals".to_string()])
            .await
            .unwrap();
        assert_eq!(query, docs[0]);
        assert_eq!(query.len(), 8);
    }

    #[test]
    fn test_missing_model_dir_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            LocalEmbeddings::from_dir(&missing),
            Err(AssistantError::InvalidConfig(_))
        ));
    }

    fn openai(base_url: String) -> OpenAiEmbeddings {
        OpenAiEmbeddings::new(
            Client::new(),
            base_url,
            ApiKey::new("sk-test"),
            "text-embedding-ada-002".to_string(),
        )
    }

    #[tokio::test]
    async fn test_openai_posts_embeddings_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::Json(json!({
                "model": "text-embedding-ada-002",
                "input": ["Node2D", "Sprite2D"],
                "encoding_format": "float"
            })))
            .with_status(200)
            .with_body(
                r#"{"data":[{"index":1,"embedding":[0.5,0.5]},{"index":0,"embedding":[1.0,0.0]}]}"#,
            )
            .create_async()
            .await;

        let vectors = openai(server.url())
            .embed_documents(&["Node2D".to_string(), "Sprite2D".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.5, 0.5]]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_openai_empty_input_skips_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .expect(0)
            .create_async()
            .await;

        let vectors = openai(server.url()).embed_documents(&[]).await.unwrap();

        assert!(vectors.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_openai_maps_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/embeddings")
            .with_status(400)
            .with_body(r#"{"error":{"message":"Invalid model","type":"invalid_request_error"}}"#)
            .create_async()
            .await;

        let err = openai(server.url()).embed_query("signals").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "OpenAI embeddings request failed: 400 Bad Request - Invalid model"
        );
    }
}
