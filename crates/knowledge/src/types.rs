//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use gradus_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of the `text_snippet` stored alongside each vector.
pub const TEXT_SNIPPET_CHARS: usize = 1000;

/// Partition key isolating unrelated knowledge domains in one vector store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Create a namespace. Blank names are a configuration error.
    pub fn new(name: impl Into<String>) -> AppResult<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::Config("Namespace must not be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Namespace {
    type Error = AppError;

    fn try_from(value: String) -> AppResult<Self> {
        Self::new(value)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.0
    }
}

/// A raw document handed to the ingestor (web page, article, manual).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Stable source identifier; chunk ids derive from it
    pub id: String,

    /// Human-readable title
    #[serde(default)]
    pub title: String,

    /// Where the content came from
    #[serde(default)]
    pub source_url: String,

    /// Clean text content
    pub text: String,
}

impl SourceDocument {
    /// Create a source whose id is derived from its URL, so re-ingesting the
    /// same URL overwrites the previous chunks.
    pub fn from_url(
        url: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let source_url = url.into();
        Self {
            id: crate::chunker::source_id_for(&source_url),
            title: title.into(),
            source_url,
            text: text.into(),
        }
    }
}

/// Metadata applied to every chunk of an ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataTemplate {
    /// Brand or tag (e.g. "GREENDAY")
    #[serde(default)]
    pub brand: String,

    /// Content type (e.g. "product_manual")
    #[serde(default)]
    pub content_type: String,

    /// Source type (e.g. "brand_website", "hr_docs")
    #[serde(default)]
    pub source_type: String,
}

impl MetadataTemplate {
    pub fn new(
        brand: impl Into<String>,
        content_type: impl Into<String>,
        source_type: impl Into<String>,
    ) -> Self {
        Self {
            brand: brand.into(),
            content_type: content_type.into(),
            source_type: source_type.into(),
        }
    }
}

/// Metadata stored with each vector. Field names are part of the stored
/// format and must not change between versions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default)]
    pub brand: String,

    #[serde(default)]
    pub content_type: String,

    #[serde(default)]
    pub source_type: String,

    #[serde(default)]
    pub text_snippet: String,

    #[serde(default)]
    pub source_id: String,

    #[serde(default)]
    pub source_url: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub chunk_index: u32,
}

impl ChunkMetadata {
    /// Look up a field by its stored name, for metadata filtering.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "brand" => Some(self.brand.clone()),
            "content_type" => Some(self.content_type.clone()),
            "source_type" => Some(self.source_type.clone()),
            "text_snippet" => Some(self.text_snippet.clone()),
            "source_id" => Some(self.source_id.clone()),
            "source_url" => Some(self.source_url.clone()),
            "title" => Some(self.title.clone()),
            "chunk_index" => Some(self.chunk_index.to_string()),
            _ => None,
        }
    }
}

/// A bounded text segment of a source document, ready for embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// `<source_id>_<index>`, unique within a namespace
    pub id: String,

    /// Namespace the chunk is stored under
    pub namespace: Namespace,

    /// Segment text
    pub text: String,

    /// Stored metadata
    pub metadata: ChunkMetadata,
}

/// Per-segment failure recorded during ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentFailure {
    pub chunk_id: String,
    pub reason: String,
}

/// Statistics from an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStats {
    /// Segments produced by chunking
    pub total: u32,

    /// Segments embedded and upserted
    pub succeeded: u32,

    /// Segments that failed after retries
    pub failed: u32,

    /// Failure details, one per failed segment
    pub failures: Vec<SegmentFailure>,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// A record in the relational document catalog. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub document_type: String,
    /// Canonical `№<number>` form
    pub document_number: String,
    pub url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Which retrieval strategy produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HitOrigin {
    Vector,
    NumberMatch,
    TopicMatch,
}

/// What a hit carries, depending on its origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HitPayload {
    Chunk { metadata: ChunkMetadata },
    Document { record: DocumentRecord },
}

/// One retrieval result, produced per query and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    /// Identity used for deduplication across strategies
    pub id: String,

    /// Similarity score for vector hits; 1.0 for structured matches
    pub score: f32,

    pub origin: HitOrigin,

    pub payload: HitPayload,
}

impl RetrievalHit {
    /// Build a structured hit from a catalog record.
    pub fn from_document(record: DocumentRecord, origin: HitOrigin) -> Self {
        Self {
            id: record.id.to_string(),
            score: 1.0,
            origin,
            payload: HitPayload::Document { record },
        }
    }

    /// Title to show in citations.
    pub fn display_title(&self) -> &str {
        match &self.payload {
            HitPayload::Document { record } => &record.title,
            HitPayload::Chunk { metadata } => {
                if !metadata.title.is_empty() {
                    &metadata.title
                } else if !metadata.brand.is_empty() {
                    &metadata.brand
                } else {
                    &metadata.source_id
                }
            }
        }
    }

    /// Reference URL to show in citations.
    pub fn reference_url(&self) -> &str {
        match &self.payload {
            HitPayload::Document { record } => &record.url,
            HitPayload::Chunk { metadata } => &metadata.source_url,
        }
    }
}

/// Ordered, deduplicated, capped evidence bundle for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundedContext {
    pub hits: Vec<RetrievalHit>,
}

impl GroundedContext {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}
