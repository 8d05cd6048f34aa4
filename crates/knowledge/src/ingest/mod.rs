//! Chunk ingestion and corpus maintenance.
//!
//! Sources are chunked, embedded with bounded concurrency, and upserted in
//! paced batches. A failing segment is counted and skipped; only fatal
//! (configuration) errors abort a run.

pub mod retry;

pub use retry::RetryPolicy;

use crate::chunker;
use crate::config::{IngestSettings, NamespaceConfig};
use crate::embeddings::Embedder;
use crate::progress::ProgressReporter;
use crate::store::{MetadataFilter, VectorRecord, VectorStore};
use crate::types::{
    IngestStats, KnowledgeChunk, MetadataTemplate, Namespace, SegmentFailure, SourceDocument,
};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use gradus_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Instant;

/// Writes chunks of source documents into a vector store.
pub struct ChunkIngestor {
    embedder: Embedder,
    store: Arc<dyn VectorStore>,
    chunk_size: usize,
    chunk_overlap: usize,
    settings: IngestSettings,
    retry: RetryPolicy,
    progress: ProgressReporter,
}

impl ChunkIngestor {
    pub fn new(embedder: Embedder, store: Arc<dyn VectorStore>, config: &NamespaceConfig) -> Self {
        Self {
            embedder,
            store,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            retry: RetryPolicy::from(&config.ingest.retry),
            settings: config.ingest.clone(),
            progress: ProgressReporter::noop(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Chunk, embed and upsert `sources` into `namespace`.
    pub async fn ingest(
        &self,
        sources: &[SourceDocument],
        namespace: &Namespace,
        template: &MetadataTemplate,
    ) -> AppResult<IngestStats> {
        let started_at = Utc::now();
        let start = Instant::now();

        tracing::info!(
            "Ingesting {} sources into namespace '{}' ({} / {})",
            sources.len(),
            namespace,
            self.embedder.provider_name(),
            self.embedder.model_name()
        );

        let mut chunks = Vec::new();
        for (i, source) in sources.iter().enumerate() {
            let produced = chunker::chunk_document(
                source,
                namespace,
                template,
                self.chunk_size,
                self.chunk_overlap,
            )?;
            self.progress
                .chunk(i as u64 + 1, Some(sources.len() as u64), produced.len());
            chunks.extend(produced);
        }

        let total = chunks.len();
        let mut failures = Vec::new();

        let records = self.embed_all(chunks, &mut failures).await?;
        let stored = self.upsert_all(namespace, records, &mut failures).await?;

        let stats = IngestStats {
            total: total as u32,
            succeeded: stored as u32,
            failed: failures.len() as u32,
            failures,
            started_at,
            duration_secs: start.elapsed().as_secs_f64(),
        };

        tracing::info!(
            "Ingestion into '{}' finished: {} segments, {} stored, {} failed in {:.2}s",
            namespace,
            stats.total,
            stats.succeeded,
            stats.failed,
            stats.duration_secs
        );

        Ok(stats)
    }

    /// Embed every chunk with bounded concurrency, keeping chunk order.
    async fn embed_all(
        &self,
        chunks: Vec<KnowledgeChunk>,
        failures: &mut Vec<SegmentFailure>,
    ) -> AppResult<Vec<VectorRecord>> {
        let total = chunks.len() as u64;
        let embedder = &self.embedder;
        let retry = &self.retry;

        let mut results: Vec<(usize, KnowledgeChunk, AppResult<Vec<f32>>)> =
            stream::iter(chunks.into_iter().enumerate())
                .map(|(index, chunk)| async move {
                    let label = format!("Embedding segment {}", chunk.id);
                    let vector = retry.run(&label, || embedder.embed(&chunk.text)).await;
                    (index, chunk, vector)
                })
                .buffer_unordered(self.settings.concurrency.max(1))
                .collect()
                .await;

        results.sort_by_key(|(index, _, _)| *index);

        let mut records = Vec::with_capacity(results.len());
        for (done, (_, chunk, vector)) in results.into_iter().enumerate() {
            match vector {
                Ok(vector) => records.push(VectorRecord {
                    id: chunk.id,
                    vector,
                    metadata: chunk.metadata,
                }),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!("Segment {} failed to embed: {}", chunk.id, e);
                    failures.push(SegmentFailure {
                        chunk_id: chunk.id,
                        reason: e.to_string(),
                    });
                }
            }
            self.progress
                .embed(done as u64 + 1, total, self.embedder.model_name());
        }

        Ok(records)
    }

    /// Upsert in paced batches. Returns how many records were stored.
    async fn upsert_all(
        &self,
        namespace: &Namespace,
        records: Vec<VectorRecord>,
        failures: &mut Vec<SegmentFailure>,
    ) -> AppResult<usize> {
        let total = records.len() as u64;
        let mut stored = 0usize;
        let mut processed = 0u64;
        let batch_size = self.settings.upsert_batch_size.max(1);

        for (i, batch) in records.chunks(batch_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(self.settings.pacing()).await;
            }

            let result = self
                .retry
                .run("Vector upsert", || self.store.upsert(namespace, batch.to_vec()))
                .await;

            match result {
                Ok(()) => stored += batch.len(),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!("Upsert of {} segments failed: {}", batch.len(), e);
                    failures.extend(batch.iter().map(|r| SegmentFailure {
                        chunk_id: r.id.clone(),
                        reason: e.to_string(),
                    }));
                }
            }

            processed += batch.len() as u64;
            self.progress.upsert(processed, total, namespace.as_str());
        }

        Ok(stored)
    }

    /// Delete records by id in paced batches. Returns how many existed.
    pub async fn delete_by_ids(&self, namespace: &Namespace, ids: &[String]) -> AppResult<u64> {
        let total = ids.len() as u64;
        let batch_size = self.settings.delete_batch_size.max(1);
        let mut deleted = 0u64;
        let mut processed = 0u64;

        for (i, batch) in ids.chunks(batch_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(self.settings.pacing()).await;
            }

            deleted += self
                .retry
                .run("Vector delete", || self.store.delete_ids(namespace, batch))
                .await?;

            processed += batch.len() as u64;
            self.progress.delete(processed, Some(total), namespace.as_str());
        }

        tracing::info!(
            "Deleted {} of {} requested ids from namespace '{}'",
            deleted,
            total,
            namespace
        );
        Ok(deleted)
    }

    /// Delete every record matching `filter`, in paced id batches.
    pub async fn delete_by_filter(
        &self,
        namespace: &Namespace,
        filter: &MetadataFilter,
    ) -> AppResult<u64> {
        if filter.is_empty() {
            return Err(AppError::Config(
                "Refusing filtered delete with an empty filter".to_string(),
            ));
        }

        let ids = self
            .retry
            .run("Vector listing", || self.store.list_ids(namespace, filter))
            .await?;

        tracing::info!(
            "Found {} records matching filter in namespace '{}'",
            ids.len(),
            namespace
        );

        self.delete_by_ids(namespace, &ids).await
    }
}
