use std::path::Path;

use crate::errors::Result;
use crate::models::{SourceDocument, SourceType};
use super::walker::walk_directory;

/// Reads a text file, replacing invalid UTF-8 sequences instead of failing.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!("{} is not valid UTF-8, decoding lossily", path.display());
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    })
}

/// Loads every matching file under `dir`. A missing directory yields no
/// documents; unreadable files are logged and skipped.
pub fn load_documents(dir: &Path, source_type: SourceType) -> Vec<SourceDocument> {
    if !dir.exists() {
        tracing::warn!("{} directory not found: {}", source_type, dir.display());
        return Vec::new();
    }

    let mut documents = Vec::new();
    for path in walk_directory(dir, source_type) {
        match read_text(&path) {
            Ok(text) => documents.push(SourceDocument {
                text,
                source: path.to_string_lossy().into_owned(),
                source_type,
            }),
            Err(e) => tracing::warn!("Failed to read {}: {}", path.display(), e),
        }
    }

    tracing::info!(
        "Loaded {} {} files from {}",
        documents.len(),
        source_type,
        dir.display()
    );
    documents
}
