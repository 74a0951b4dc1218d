//! In-memory doubles for the network-backed adapters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::errors::{AssistantError, Result};
use crate::llm::ChatModel;
use crate::models::DocumentChunk;
use crate::rag::embeddings::EmbeddingProvider;
use crate::rag::vector_store::VectorStore;

/// Replies with a fixed answer and remembers every prompt.
pub struct MockChatModel {
    answer: String,
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

impl MockChatModel {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("")
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(AssistantError::provider("mock", "503 - overloaded"));
        }
        Ok(self.answer.clone())
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Deterministic pseudo-embeddings: equal texts get equal unit vectors.
pub struct FakeEmbeddings {
    dimension: usize,
}

impl FakeEmbeddings {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut values = Vec::with_capacity(self.dimension);
        let mut counter = 0u32;
        while values.len() < self.dimension {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hasher.update(counter.to_be_bytes());
            for byte in hasher.finalize() {
                if values.len() == self.dimension {
                    break;
                }
                values.push(byte as f32 - 127.5);
            }
            counter += 1;
        }
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        values.iter().map(|v| v / norm).collect()
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbeddings {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Brute-force cosine search over a vector of points.
#[derive(Default)]
pub struct MemoryStore {
    points: Mutex<Vec<(DocumentChunk, Vec<f32>)>>,
    dimension: Mutex<Option<usize>>,
    upserts: AtomicUsize,
}

impl MemoryStore {
    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn dimension(&self) -> Option<usize> {
        *self.dimension.lock().unwrap()
    }

    pub fn chunks(&self) -> Vec<DocumentChunk> {
        self.points
            .lock()
            .unwrap()
            .iter()
            .map(|(c, _)| c.clone())
            .collect()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        self.dimension.lock().unwrap().get_or_insert(dimension);
        Ok(())
    }

    async fn upsert(&self, chunks: &[DocumentChunk], vectors: Vec<Vec<f32>>) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        let mut points = self.points.lock().unwrap();
        for (chunk, vector) in chunks.iter().zip(vectors) {
            points.retain(|(c, _)| !(c.source == chunk.source && c.chunk_index == chunk.chunk_index));
            points.push((chunk.clone(), vector));
        }
        Ok(())
    }

    async fn search(&self, vector: Vec<f32>, k: usize) -> Result<Vec<DocumentChunk>> {
        let points = self.points.lock().unwrap();
        let mut scored: Vec<(f32, &DocumentChunk)> = points
            .iter()
            .map(|(chunk, v)| (cosine(&vector, v), chunk))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored.into_iter().take(k).map(|(_, c)| c.clone()).collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.points.lock().unwrap().len() as u64)
    }

    async fn delete_source(&self, source: &str) -> Result<()> {
        self.points.lock().unwrap().retain(|(c, _)| c.source != source);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.points.lock().unwrap().clear();
        *self.dimension.lock().unwrap() = None;
        Ok(())
    }
}
