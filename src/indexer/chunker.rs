use crate::models::{DocumentChunk, SourceDocument};

#[derive(Debug, Clone)]
pub struct TextChunk {
    pub text: String,
    pub chunk_index: usize,
}

/// Rounds a byte offset up to the next char boundary.
fn ceil_char_boundary(text: &str, byte_pos: usize) -> usize {
    if byte_pos >= text.len() {
        return text.len();
    }
    let mut pos = byte_pos;
    while pos < text.len() && !text.is_char_boundary(pos) {
        pos += 1;
    }
    pos
}

/// Rounds a byte offset down to the previous char boundary.
fn floor_char_boundary(text: &str, byte_pos: usize) -> usize {
    if byte_pos >= text.len() {
        return text.len();
    }
    let mut pos = byte_pos;
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Splits `text` into pieces of at most `max_chunk_size` bytes, each
/// starting `overlap` bytes before the previous one ended.
pub fn chunk_text(text: &str, max_chunk_size: usize, overlap: usize) -> Vec<TextChunk> {
    let text = text.trim();
    if text.is_empty() || max_chunk_size == 0 {
        return Vec::new();
    }

    if text.len() <= max_chunk_size {
        return vec![TextChunk {
            text: text.to_string(),
            chunk_index: 0,
        }];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut chunk_index = 0;

    while start < text.len() {
        let end = floor_char_boundary(text, (start + max_chunk_size).min(text.len()));
        let end = if end <= start {
            ceil_char_boundary(text, start + 1)
        } else {
            end
        };

        let actual_end = if end < text.len() {
            find_break_point(text, start, end)
        } else {
            end
        };

        let piece = text[start..actual_end].trim();
        if !piece.is_empty() {
            chunks.push(TextChunk {
                text: piece.to_string(),
                chunk_index,
            });
            chunk_index += 1;
        }

        if actual_end >= text.len() {
            break;
        }

        let next_start = if actual_end > overlap {
            ceil_char_boundary(text, actual_end - overlap)
        } else {
            actual_end
        };

        start = if next_start <= start { actual_end } else { next_start };
    }

    chunks
}

fn find_break_point(text: &str, start: usize, max_end: usize) -> usize {
    let segment = &text[start..max_end];

    if let Some(pos) = segment.rfind("\n\n") {
        if pos > 0 {
            return start + pos + 2;
        }
    }
    if let Some(pos) = segment.rfind('\n') {
        if pos > 0 {
            return start + pos + 1;
        }
    }
    for sentinel in [". ", "? ", "! "] {
        if let Some(pos) = segment.rfind(sentinel) {
            return start + pos + sentinel.len();
        }
    }
    if let Some(pos) = segment.rfind(' ') {
        if pos > 0 {
            return start + pos + 1;
        }
    }
    max_end
}

/// Chunks one loaded document, carrying its source metadata onto each piece.
pub fn split_document(
    document: &SourceDocument,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<DocumentChunk> {
    chunk_text(&document.text, chunk_size, chunk_overlap)
        .into_iter()
        .map(|chunk| DocumentChunk {
            text: chunk.text,
            source: document.source.clone(),
            source_type: document.source_type,
            chunk_index: chunk.chunk_index,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceType;

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_text("short", 100, 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "short");
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_text("", 100, 10).is_empty());
        assert!(chunk_text("   \n\n  ", 100, 10).is_empty());
    }

    #[test]
    fn test_chunks_respect_size_limit() {
        let text = "Nodes are the building blocks of a scene. ".repeat(60);
        let chunks = chunk_text(&text, 200, 40);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.len() <= 200, "chunk too long: {}", chunk.text.len());
        }
        let indexes: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indexes, (0..chunks.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let first = "A".repeat(60);
        let second = "B".repeat(60);
        let text = format!("{}\n\n{}", first, second);
        let chunks = chunk_text(&text, 100, 0);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, first);
        assert_eq!(chunks[1].text, second);
    }

    #[test]
    fn test_overlap_repeats_tail() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let chunks = chunk_text(text, 30, 10);
        assert!(chunks.len() >= 2);
        let tail_word = chunks[0].text.split_whitespace().last().unwrap();
        assert!(chunks[1].text.contains(tail_word));
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let text = "Génération procédurale de donjons : très utile. ".repeat(20);
        let chunks = chunk_text(&text, 50, 10);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(!chunk.text.is_empty());
        }
    }

    #[test]
    fn test_unbroken_text_is_hard_split() {
        let text = "x".repeat(250);
        let chunks = chunk_text(&text, 100, 0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].text.len(), 50);
    }

    #[test]
    fn test_split_document_keeps_metadata() {
        let doc = SourceDocument {
            text: "The hero was born in Aster.\n\nShe left at sixteen.".to_string(),
            source: "/app/data/lore/hero.md".to_string(),
            source_type: SourceType::Lore,
        };
        let chunks = split_document(&doc, 30, 0);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.source == doc.source));
        assert!(chunks.iter().all(|c| c.source_type == SourceType::Lore));
        assert_eq!(chunks[1].chunk_index, 1);
    }
}
