pub mod embeddings;
pub mod ingest;
pub mod vector_store;

use std::sync::Arc;

use crate::errors::Result;
use crate::models::DocumentChunk;
use self::embeddings::EmbeddingProvider;
use self::vector_store::VectorStore;

/// Chunks embedded per request to the embedding backend.
pub const EMBED_BATCH_SIZE: usize = 32;

/// Embedding provider plus vector store: "embed text, query nearest neighbours".
pub struct RagIndex {
    embeddings: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl RagIndex {
    pub fn new(embeddings: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embeddings, store }
    }

    pub async fn ensure_ready(&self) -> Result<()> {
        self.store
            .ensure_collection(self.embeddings.dimension())
            .await
    }

    async fn add_batch(&self, chunks: &[DocumentChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embeddings.embed_documents(&texts).await?;
        self.store.upsert(chunks, vectors).await
    }

    pub async fn add_chunks(&self, chunks: &[DocumentChunk]) -> Result<usize> {
        self.ensure_ready().await?;
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            self.add_batch(batch).await?;
        }
        Ok(chunks.len())
    }

    /// Replaces everything stored for `source` with `chunks`. Point ids come
    /// from `(source, chunk_index)`, so a file that shrank would otherwise
    /// keep its old trailing chunks.
    pub async fn replace_source(&self, source: &str, chunks: &[DocumentChunk]) -> Result<usize> {
        self.store.delete_source(source).await?;
        self.add_chunks(chunks).await
    }

    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<DocumentChunk>> {
        let vector = self.embeddings.embed_query(query).await?;
        self.store.search(vector, k).await
    }

    pub async fn document_count(&self) -> Result<u64> {
        self.store.count().await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }
}
