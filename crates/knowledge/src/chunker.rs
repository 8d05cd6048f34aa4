//! Text chunking with configurable size and overlap.
//!
//! Segments are bounded in characters (not bytes) so Cyrillic and Latin text
//! get the same budget. Chunk ids are `<source_id>_<index>`, which makes
//! re-ingesting a source overwrite its previous segments.

use crate::types::{
    ChunkMetadata, KnowledgeChunk, MetadataTemplate, Namespace, SourceDocument,
    TEXT_SNIPPET_CHARS,
};
use gradus_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use text_splitter::{ChunkConfig, TextSplitter};

/// Derive a stable source id from a URL or path.
pub fn source_id_for(url: &str) -> String {
    let digest = Sha256::digest(url.trim().as_bytes());
    digest.iter().take(8).map(|b| format!("{:02x}", b)).collect()
}

/// Build the id of the `index`-th segment of a source.
pub fn chunk_id(source_id: &str, index: u32) -> String {
    format!("{}_{}", source_id, index)
}

/// Split text into overlapping segments of at most `chunk_size` characters.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> AppResult<Vec<String>> {
    let config = ChunkConfig::new(chunk_size)
        .with_overlap(overlap)
        .map_err(|e| {
            AppError::Config(format!(
                "Invalid chunk settings (size {}, overlap {}): {}",
                chunk_size, overlap, e
            ))
        })?;

    let splitter = TextSplitter::new(config);
    let segments: Vec<String> = splitter
        .chunks(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    tracing::debug!(
        "Chunked text into {} segments (size: {}, overlap: {})",
        segments.len(),
        chunk_size,
        overlap
    );

    Ok(segments)
}

/// Chunk a source document into knowledge chunks for `namespace`.
pub fn chunk_document(
    source: &SourceDocument,
    namespace: &Namespace,
    template: &MetadataTemplate,
    chunk_size: usize,
    overlap: usize,
) -> AppResult<Vec<KnowledgeChunk>> {
    let segments = split_text(&source.text, chunk_size, overlap)?;

    Ok(segments
        .into_iter()
        .enumerate()
        .map(|(index, text)| {
            let index = index as u32;
            let metadata = ChunkMetadata {
                brand: template.brand.clone(),
                content_type: template.content_type.clone(),
                source_type: template.source_type.clone(),
                text_snippet: text.chars().take(TEXT_SNIPPET_CHARS).collect(),
                source_id: source.id.clone(),
                source_url: source.source_url.clone(),
                title: source.title.clone(),
                chunk_index: index,
            };

            KnowledgeChunk {
                id: chunk_id(&source.id, index),
                namespace: namespace.clone(),
                text,
                metadata,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_source(text: &str) -> SourceDocument {
        SourceDocument {
            id: "greenday".to_string(),
            title: "GREENDAY".to_string(),
            source_url: "https://greenday.ua".to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_split_text_respects_bound() {
        let text = "горілка ".repeat(200);
        let segments = split_text(&text, 100, 10).unwrap();

        assert!(segments.len() > 1);
        for segment in &segments {
            assert!(segment.chars().count() <= 100);
        }
    }

    #[test]
    fn test_split_text_empty() {
        assert!(split_text("", 100, 10).unwrap().is_empty());
        assert!(split_text("   \n  ", 100, 10).unwrap().is_empty());
    }

    #[test]
    fn test_overlap_not_smaller_than_size_is_config_error() {
        let result = split_text("some text", 50, 50);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_chunk_ids_are_stable() {
        let ns = Namespace::new("company_knowledge").unwrap();
        let template = MetadataTemplate::new("GREENDAY", "product_manual", "brand_website");
        let source = sample_source(&"premium vodka from Ukraine. ".repeat(60));

        let first = chunk_document(&source, &ns, &template, 200, 20).unwrap();
        let second = chunk_document(&source, &ns, &template, 200, 20).unwrap();

        let ids: Vec<_> = first.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, second.iter().map(|c| c.id.clone()).collect::<Vec<_>>());
        assert_eq!(ids[0], "greenday_0");
        assert_eq!(ids[1], "greenday_1");
        assert_eq!(first[1].metadata.chunk_index, 1);
        assert_eq!(first[0].metadata.brand, "GREENDAY");
    }

    #[test]
    fn test_text_snippet_truncated() {
        let ns = Namespace::new("ns").unwrap();
        let source = sample_source(&"а".repeat(1500));
        let chunks =
            chunk_document(&source, &ns, &MetadataTemplate::default(), 1500, 0).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.text_snippet.chars().count(), TEXT_SNIPPET_CHARS);
        assert_eq!(chunks[0].text.chars().count(), 1500);
    }

    #[test]
    fn test_source_id_for_url_is_deterministic() {
        let a = source_id_for("https://villa.ua/wines");
        let b = source_id_for(" https://villa.ua/wines ");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert_ne!(a, source_id_for("https://villa.ua/"));
    }
}
