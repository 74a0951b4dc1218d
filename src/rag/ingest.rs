use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::errors::Result;
use crate::indexer::chunker::split_document;
use crate::indexer::loader::load_documents;
use crate::indexer::walker::walk_directory;
use crate::models::{DocumentChunk, SourceDocument, SourceType};
use super::RagIndex;

/// Outcome of [`load_or_create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// An existing collection was reused.
    Loaded(u64),
    /// The collection was empty and got populated with this many chunks.
    Created(usize),
}

/// Documentation (`**/*.rst`) followed by lore (`txt`, `md`, `rst`).
pub fn collect_documents(config: &AppConfig) -> Vec<SourceDocument> {
    let mut documents = load_documents(&config.paths.docs_path, SourceType::Documentation);
    documents.extend(load_documents(&config.paths.lore_path, SourceType::Lore));
    documents
}

pub fn split_documents(documents: &[SourceDocument], config: &AppConfig) -> Vec<DocumentChunk> {
    documents
        .iter()
        .flat_map(|doc| split_document(doc, config.rag.chunk_size, config.rag.chunk_overlap))
        .collect()
}

/// Loads, splits and embeds every document into `index`.
pub async fn ingest(index: &RagIndex, config: &AppConfig) -> Result<usize> {
    let documents = collect_documents(config);
    if documents.is_empty() {
        tracing::warn!(
            "No documents found! Add documentation to {} and/or lore to {}",
            config.paths.docs_path.display(),
            config.paths.lore_path.display()
        );
        return Ok(0);
    }

    let lore = documents
        .iter()
        .filter(|d| d.source_type == SourceType::Lore)
        .count();
    tracing::info!(
        "Total documents to process: {} ({} documentation, {} lore)",
        documents.len(),
        documents.len() - lore,
        lore
    );

    let chunks = split_documents(&documents, config);
    tracing::info!("Created {} chunks", chunks.len());

    let added = index.add_chunks(&chunks).await?;
    tracing::info!("Vector database created successfully");
    Ok(added)
}

/// Reuses the collection when it already holds points, otherwise ingests.
pub async fn load_or_create(index: &RagIndex, config: &AppConfig) -> Result<IndexState> {
    index.ensure_ready().await?;

    let count = index.document_count().await?;
    if count > 0 {
        tracing::info!("Loaded existing vector database with {} chunks", count);
        return Ok(IndexState::Loaded(count));
    }

    tracing::info!("Creating new vector database from Godot documentation and lore...");
    Ok(IndexState::Created(ingest(index, config).await?))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoreFile {
    pub path: String,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct LoreStatus {
    pub path: PathBuf,
    pub exists: bool,
    pub files: Vec<LoreFile>,
}

pub fn lore_status(lore_path: &Path) -> LoreStatus {
    let exists = lore_path.is_dir();
    let files = if exists {
        walk_directory(lore_path, SourceType::Lore)
            .into_iter()
            .map(|path| {
                let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                let rel = path
                    .strip_prefix(lore_path)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .replace('\\', "/");
                LoreFile { path: rel, size }
            })
            .collect()
    } else {
        Vec::new()
    };

    LoreStatus {
        path: lore_path.to_path_buf(),
        exists,
        files,
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl fmt::Display for LoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(80);
        writeln!(f, "Lore Status:")?;
        writeln!(f, "{}", rule)?;

        if !self.exists {
            writeln!(f, "❌ Lore directory not found: {}", self.path.display())?;
            writeln!(f, "Create the directory and add .txt, .md, or .rst files")?;
        } else {
            writeln!(f, "✓ Lore directory: {}", self.path.display())?;
            if self.files.is_empty() {
                writeln!(f, "⚠ No lore files found")?;
                writeln!(f, "Add .txt, .md, or .rst files to the lore directory")?;
            } else {
                writeln!(f, "✓ Found {} lore files:", self.files.len())?;
                for file in &self.files {
                    writeln!(f, "  - {} ({} bytes)", file.path, group_thousands(file.size))?;
                }
            }
        }

        write!(f, "{}", rule)
    }
}
