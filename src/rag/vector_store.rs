use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    PointStruct, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde_json::{Map as JsonMap, Value as JsonValue};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::errors::{AssistantError, Result};
use crate::models::{DocumentChunk, SourceType};

/// Nearest-neighbour storage for embedded chunks.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn ensure_collection(&self, dimension: usize) -> Result<()>;

    /// `vectors[i]` is the embedding of `chunks[i]`.
    async fn upsert(&self, chunks: &[DocumentChunk], vectors: Vec<Vec<f32>>) -> Result<()>;

    async fn search(&self, vector: Vec<f32>, k: usize) -> Result<Vec<DocumentChunk>>;

    async fn count(&self) -> Result<u64>;

    /// Removes every chunk whose `source` matches.
    async fn delete_source(&self, source: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Stable id for a chunk: the first 8 bytes of SHA-256 over `source#index`.
/// Re-indexing the same file overwrites its points instead of duplicating them.
pub fn chunk_point_id(source: &str, chunk_index: usize) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"#");
    hasher.update(chunk_index.to_string().as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

fn chunk_payload(chunk: &DocumentChunk) -> JsonMap<String, JsonValue> {
    let mut payload = JsonMap::new();
    payload.insert("text".to_string(), JsonValue::String(chunk.text.clone()));
    payload.insert("source".to_string(), JsonValue::String(chunk.source.clone()));
    payload.insert(
        "source_type".to_string(),
        JsonValue::String(chunk.source_type.as_str().to_string()),
    );
    payload.insert(
        "chunk_index".to_string(),
        JsonValue::from(chunk.chunk_index as u64),
    );
    payload
}

fn chunk_from_payload(payload: &HashMap<String, QdrantValue>) -> Option<DocumentChunk> {
    let text = payload.get("text")?.as_str()?.to_string();
    let source = payload
        .get("source")
        .and_then(|v| v.as_str())
        .cloned()
        .unwrap_or_default();
    let source_type = payload
        .get("source_type")
        .and_then(|v| v.as_str())
        .and_then(|s| SourceType::parse(s))
        .unwrap_or(SourceType::Documentation);
    let chunk_index = payload
        .get("chunk_index")
        .and_then(|v| v.as_integer())
        .unwrap_or(0) as usize;

    Some(DocumentChunk {
        text,
        source,
        source_type,
        chunk_index,
    })
}

pub struct QdrantStore {
    client: Qdrant,
    collection_name: String,
}

impl QdrantStore {
    pub fn new(url: &str, collection_name: &str) -> Result<Self> {
        tracing::info!("Building Qdrant client for URL: {}", url);
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| AssistantError::provider("Qdrant", e))?;

        Ok(Self {
            client,
            collection_name: collection_name.to_string(),
        })
    }

    async fn exists(&self) -> Result<bool> {
        self.client
            .collection_exists(&self.collection_name)
            .await
            .map_err(|e| AssistantError::provider("Qdrant", e))
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        if self.exists().await? {
            return Ok(());
        }

        tracing::info!(
            "Creating Qdrant collection {} ({} dims)",
            self.collection_name,
            dimension
        );
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection_name)
                    .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| AssistantError::provider("Qdrant", e))?;
        Ok(())
    }

    async fn upsert(&self, chunks: &[DocumentChunk], vectors: Vec<Vec<f32>>) -> Result<()> {
        if chunks.len() != vectors.len() {
            return Err(AssistantError::provider(
                "Qdrant",
                format!("{} chunks but {} vectors", chunks.len(), vectors.len()),
            ));
        }
        if chunks.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                PointStruct::new(
                    chunk_point_id(&chunk.source, chunk.chunk_index),
                    vector,
                    chunk_payload(chunk),
                )
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection_name, points).wait(true))
            .await
            .map_err(|e| AssistantError::provider("Qdrant", e))?;
        Ok(())
    }

    async fn search(&self, vector: Vec<f32>, k: usize) -> Result<Vec<DocumentChunk>> {
        let search_result = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection_name, vector, k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| AssistantError::provider("Qdrant", e))?;

        Ok(search_result
            .result
            .iter()
            .filter_map(|point| chunk_from_payload(&point.payload))
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        if !self.exists().await? {
            return Ok(0);
        }
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection_name).exact(true))
            .await
            .map_err(|e| AssistantError::provider("Qdrant", e))?;
        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    async fn delete_source(&self, source: &str) -> Result<()> {
        if !self.exists().await? {
            return Ok(());
        }
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection_name)
                    .points(Filter::must([Condition::matches("source", source.to_string())]))
                    .wait(true),
            )
            .await
            .map_err(|e| AssistantError::provider("Qdrant", e))?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if self.exists().await? {
            tracing::info!("Dropping Qdrant collection {}", self.collection_name);
            self.client
                .delete_collection(&self.collection_name)
                .await
                .map_err(|e| AssistantError::provider("Qdrant", e))?;
        }
        Ok(())
    }
}
