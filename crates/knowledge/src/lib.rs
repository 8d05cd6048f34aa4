//! Knowledge ingestion and retrieval-augmented grounding.
//!
//! Source text is chunked, embedded and stored per namespace in a vector
//! store. At query time the grounding service combines semantic retrieval
//! with structured lookups against a document catalog and renders the fused
//! result as citations.

pub mod catalog;
pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod ingest;
pub mod parser;
pub mod progress;
pub mod rag;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use catalog::{DocumentCatalog, SqliteCatalog, UnavailableCatalog};
pub use config::NamespaceConfig;
pub use embeddings::{EmbeddingConfig, Embedder};
pub use ingest::ChunkIngestor;
pub use progress::{ProgressEvent, ProgressReporter};
pub use rag::{GroundingConfig, GroundingOutcome, GroundingService};
pub use store::{
    InMemoryVectorStore, MetadataFilter, SqliteVectorStore, StoreStats, UnavailableStore,
    VectorStore,
};
pub use types::{
    DocumentRecord, GroundedContext, IngestStats, KnowledgeChunk, MetadataTemplate, Namespace,
    RetrievalHit, SourceDocument,
};

use gradus_core::config::StoreBackend;
use gradus_core::{AppConfig, AppError, AppResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Inputs for ingesting files into a namespace.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub namespace: Namespace,
    pub paths: Vec<PathBuf>,
    /// Canonical URL; only honoured when a single file is ingested
    pub url: Option<String>,
    pub template: MetadataTemplate,
    /// Embedding settings for a namespace that has none pinned yet
    pub embedding: Option<EmbeddingConfig>,
}

/// Inputs for grounding one query.
#[derive(Debug, Clone)]
pub struct GroundRequest {
    pub namespace: Namespace,
    pub query: String,
    pub candidate_answer: String,
    pub filter: Option<MetadataFilter>,
}

/// Open the vector store selected by the application config.
pub fn open_store(config: &AppConfig) -> AppResult<Arc<dyn VectorStore>> {
    match config.store_backend {
        StoreBackend::Sqlite => Ok(Arc::new(SqliteVectorStore::open(
            &config.resolved_store_path(),
        )?)),
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory vector store; nothing will persist");
            Ok(Arc::new(InMemoryVectorStore::new()))
        }
    }
}

/// Open the document catalog of the workspace.
pub fn open_catalog(config: &AppConfig) -> AppResult<SqliteCatalog> {
    SqliteCatalog::open(&config.resolved_catalog_path())
}

/// Open the vector store for grounding.
///
/// A store that cannot be opened is replaced by one whose queries fail, so
/// grounding degrades to catalog matches. Only fatal errors are returned.
pub fn open_store_for_grounding(config: &AppConfig) -> AppResult<Arc<dyn VectorStore>> {
    match open_store(config) {
        Ok(store) => Ok(store),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            tracing::warn!("Vector store unavailable, grounding without it: {}", e);
            Ok(Arc::new(UnavailableStore::new(e.to_string())))
        }
    }
}

/// Open the document catalog for grounding, degrading like
/// [`open_store_for_grounding`].
pub fn open_catalog_for_grounding(config: &AppConfig) -> AppResult<Arc<dyn DocumentCatalog>> {
    match open_catalog(config) {
        Ok(catalog) => Ok(Arc::new(catalog)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            tracing::warn!("Document catalog unavailable, grounding without it: {}", e);
            Ok(Arc::new(UnavailableCatalog::new(e.to_string())))
        }
    }
}

/// Read every file under `paths` as a source document.
///
/// Unreadable and binary files are skipped with a warning.
pub fn collect_sources(paths: &[PathBuf], url: Option<&str>) -> AppResult<Vec<SourceDocument>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            files.extend(
                WalkDir::new(path)
                    .follow_links(false)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                    .map(|e| e.into_path()),
            );
        } else {
            return Err(AppError::Knowledge(format!("Path not found: {:?}", path)));
        }
    }

    let url = if files.len() == 1 { url } else { None };

    let mut sources = Vec::with_capacity(files.len());
    for file in &files {
        match parser::load_source(file, url) {
            Ok(source) => sources.push(source),
            Err(e) => tracing::warn!("Skipping {:?}: {}", file, e),
        }
    }

    Ok(sources)
}

/// Ingest files into a namespace, pinning its embedding settings on first use.
pub async fn ingest(
    workspace: &Path,
    store: Arc<dyn VectorStore>,
    options: IngestOptions,
    api_key: Option<&str>,
    progress: ProgressReporter,
) -> AppResult<IngestStats> {
    let config = match &options.embedding {
        Some(embedding) => config::pin_embedding(workspace, &options.namespace, embedding)?,
        None => {
            let config = config::load_config(workspace, &options.namespace)?;
            config::pin_embedding(workspace, &options.namespace, &config.embedding)?
        }
    };

    let sources = collect_sources(&options.paths, options.url.as_deref())?;
    if sources.is_empty() {
        tracing::warn!("No readable sources found in {:?}", options.paths);
    }

    let embedder = Embedder::from_config(&config.embedding, api_key)?;
    ChunkIngestor::new(embedder, store, &config)
        .with_progress(progress)
        .ingest(&sources, &options.namespace, &options.template)
        .await
}

/// What a maintenance delete removes.
#[derive(Debug, Clone)]
pub enum DeleteTarget {
    Ids(Vec<String>),
    Filter(MetadataFilter),
}

/// Delete records from a namespace in paced batches.
pub async fn delete(
    workspace: &Path,
    store: Arc<dyn VectorStore>,
    namespace: &Namespace,
    target: DeleteTarget,
    api_key: Option<&str>,
    progress: ProgressReporter,
) -> AppResult<u64> {
    let config = config::load_config(workspace, namespace)?;
    let embedder = Embedder::from_config(&config.embedding, api_key)?;
    let ingestor = ChunkIngestor::new(embedder, store, &config).with_progress(progress);

    match target {
        DeleteTarget::Ids(ids) => ingestor.delete_by_ids(namespace, &ids).await,
        DeleteTarget::Filter(filter) => ingestor.delete_by_filter(namespace, &filter).await,
    }
}

/// Ground a query against a namespace and the document catalog.
pub async fn ground(
    workspace: &Path,
    store: Arc<dyn VectorStore>,
    catalog: Arc<dyn DocumentCatalog>,
    request: GroundRequest,
    api_key: Option<&str>,
) -> AppResult<GroundingOutcome> {
    let namespace_config = config::load_config(workspace, &request.namespace)?;
    let grounding_config = GroundingConfig::load(workspace)?;

    let embedder = Embedder::from_config(&namespace_config.embedding, api_key)?;
    let retriever = rag::VectorRetriever::new(embedder, store, namespace_config.min_score);
    let matcher = rag::StructuredMatcher::new(catalog, &grounding_config);
    let service = GroundingService::new(
        &grounding_config,
        retriever,
        matcher,
        namespace_config.top_k,
    );

    service
        .ground(
            &request.query,
            &request.candidate_answer,
            &request.namespace,
            request.filter.as_ref(),
        )
        .await
}
