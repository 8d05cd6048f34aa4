//! Tests for ingestion, re-ingestion and workspace-level operations.

use crate::config::{self, NamespaceConfig};
use crate::embeddings::providers::mock::MockProvider;
use crate::embeddings::{EmbeddingConfig, EmbeddingProvider, Embedder};
use crate::ingest::ChunkIngestor;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::store::{
    InMemoryVectorStore, MetadataFilter, SqliteVectorStore, StoreStats, VectorMatch,
    VectorRecord, VectorStore,
};
use crate::types::{MetadataTemplate, Namespace, SourceDocument};
use crate::{DeleteTarget, GroundRequest, IngestOptions, SqliteCatalog};
use async_trait::async_trait;
use gradus_core::{AppError, AppResult};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> NamespaceConfig {
        let mut config = NamespaceConfig {
            chunk_size: 200,
            chunk_overlap: 20,
            ..Default::default()
        };
        config.ingest.pacing_ms = 0;
        config.ingest.retry.initial_backoff_ms = 1;
        config
    }

    fn embedder() -> Embedder {
        Embedder::from_config(&EmbeddingConfig::default(), None).unwrap()
    }

    fn villa_page() -> SourceDocument {
        SourceDocument::from_url(
            "https://villa.ua/about",
            "VILLA",
            "Українське вино VILLA з виноградників півдня. ".repeat(20),
        )
    }

    fn template() -> MetadataTemplate {
        MetadataTemplate::new("VILLA", "product", "brand_website")
    }

    #[tokio::test]
    async fn test_reingest_overwrites_instead_of_duplicating() {
        let store = Arc::new(InMemoryVectorStore::new());
        let ns = Namespace::new("brand_catalog").unwrap();
        let ingestor = ChunkIngestor::new(embedder(), store.clone(), &quick_config());

        let first = ingestor.ingest(&[villa_page()], &ns, &template()).await.unwrap();
        let count_after_first = store.describe_stats().await.unwrap().total_vector_count;

        let second = ingestor.ingest(&[villa_page()], &ns, &template()).await.unwrap();
        let count_after_second = store.describe_stats().await.unwrap().total_vector_count;

        assert_eq!(first.total, second.total);
        assert_eq!(count_after_first, first.total as u64);
        assert_eq!(count_after_first, count_after_second);
    }

    #[tokio::test]
    async fn test_sqlite_store_reingest_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(SqliteVectorStore::open(&temp.path().join("vectors.sqlite")).unwrap());
        let ns = Namespace::new("brand_catalog").unwrap();
        let ingestor = ChunkIngestor::new(embedder(), store.clone(), &quick_config());

        let stats = ingestor.ingest(&[villa_page()], &ns, &template()).await.unwrap();
        ingestor.ingest(&[villa_page()], &ns, &template()).await.unwrap();

        let summary = store.describe_stats().await.unwrap();
        assert_eq!(summary.namespaces["brand_catalog"].vector_count, stats.total as u64);
        assert_eq!(summary.namespaces["brand_catalog"].dimension, 384);
    }

    /// Fails the first `failures` upserts, then delegates.
    struct FlakyStore {
        inner: InMemoryVectorStore,
        remaining_failures: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                inner: InMemoryVectorStore::new(),
                remaining_failures: AtomicU32::new(failures),
            }
        }
    }

    #[async_trait]
    impl VectorStore for FlakyStore {
        async fn upsert(&self, namespace: &Namespace, records: Vec<VectorRecord>) -> AppResult<()> {
            let left = self.remaining_failures.load(Ordering::SeqCst);
            if left > 0 {
                self.remaining_failures.store(left - 1, Ordering::SeqCst);
                return Err(AppError::VectorStore("503 Service Unavailable".to_string()));
            }
            self.inner.upsert(namespace, records).await
        }

        async fn query(
            &self,
            namespace: &Namespace,
            vector: &[f32],
            top_k: usize,
            filter: Option<&MetadataFilter>,
        ) -> AppResult<Vec<VectorMatch>> {
            self.inner.query(namespace, vector, top_k, filter).await
        }

        async fn delete_ids(&self, namespace: &Namespace, ids: &[String]) -> AppResult<u64> {
            self.inner.delete_ids(namespace, ids).await
        }

        async fn delete_by_filter(
            &self,
            namespace: &Namespace,
            filter: &MetadataFilter,
        ) -> AppResult<u64> {
            self.inner.delete_by_filter(namespace, filter).await
        }

        async fn list_ids(
            &self,
            namespace: &Namespace,
            filter: &MetadataFilter,
        ) -> AppResult<Vec<String>> {
            self.inner.list_ids(namespace, filter).await
        }

        async fn describe_stats(&self) -> AppResult<StoreStats> {
            self.inner.describe_stats().await
        }
    }

    #[tokio::test]
    async fn test_transient_upsert_failure_is_retried() {
        let store = Arc::new(FlakyStore::new(2));
        let ns = Namespace::new("brand_catalog").unwrap();
        let ingestor = ChunkIngestor::new(embedder(), store.clone(), &quick_config());

        let stats = ingestor.ingest(&[villa_page()], &ns, &template()).await.unwrap();

        assert_eq!(stats.failed, 0);
        assert_eq!(stats.succeeded, stats.total);
    }

    #[tokio::test]
    async fn test_exhausted_batch_is_counted_and_run_continues() {
        let mut config = quick_config();
        config.ingest.upsert_batch_size = 1;
        config.ingest.retry.max_attempts = 2;

        // Both attempts of the first batch fail; later batches succeed.
        let store = Arc::new(FlakyStore::new(2));
        let ns = Namespace::new("brand_catalog").unwrap();
        let ingestor = ChunkIngestor::new(embedder(), store.clone(), &config);

        let stats = ingestor.ingest(&[villa_page()], &ns, &template()).await.unwrap();

        assert!(stats.total > 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.succeeded, stats.total - 1);
        assert_eq!(stats.failures[0].chunk_id, format!("{}_0", villa_page().id));
    }

    /// Mock embeddings, except for any text containing the marker.
    #[derive(Debug)]
    struct RejectingProvider {
        inner: MockProvider,
        marker: &'static str,
        calls: AtomicU32,
    }

    #[async_trait]
    impl EmbeddingProvider for RejectingProvider {
        fn provider_name(&self) -> &str {
            "rejecting"
        }

        fn model_name(&self) -> &str {
            "rejecting-v1"
        }

        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            if texts.iter().any(|t| t.contains(self.marker)) {
                self.calls.fetch_add(1, Ordering::SeqCst);
                return Err(AppError::EmbeddingProvider("400 content rejected".to_string()));
            }
            self.inner.embed_batch(texts).await
        }
    }

    #[tokio::test]
    async fn test_failed_embedding_is_counted_and_others_stored() {
        let provider = Arc::new(RejectingProvider {
            inner: MockProvider::new(384),
            marker: "CORRUPTED",
            calls: AtomicU32::new(0),
        });
        let embedder = Embedder::new(provider.clone(), 384).unwrap();
        let store = Arc::new(InMemoryVectorStore::new());
        let ns = Namespace::new("brand_catalog").unwrap();
        let ingestor = ChunkIngestor::new(embedder, store.clone(), &quick_config());

        let broken = SourceDocument::from_url(
            "https://villa.ua/broken",
            "VILLA",
            "CORRUPTED page body",
        );
        let stats = ingestor
            .ingest(&[villa_page(), broken.clone()], &ns, &template())
            .await
            .unwrap();

        let broken_id = format!("{}_0", broken.id);
        assert!(stats.total > 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.succeeded, stats.total - 1);
        assert_eq!(stats.failures[0].chunk_id, broken_id);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);

        let stored = store
            .list_ids(&ns, &MetadataFilter::new().eq("brand", "VILLA"))
            .await
            .unwrap();
        assert_eq!(stored.len() as u32, stats.succeeded);
        assert!(!stored.contains(&broken_id));
    }

    #[tokio::test]
    async fn test_progress_events_cover_every_phase() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress = ProgressReporter::new(Arc::new(move |event: ProgressEvent| {
            sink.lock().unwrap().push(event.phase);
        }));

        let store = Arc::new(InMemoryVectorStore::new());
        let ns = Namespace::new("brand_catalog").unwrap();
        let ingestor =
            ChunkIngestor::new(embedder(), store, &quick_config()).with_progress(progress);

        ingestor.ingest(&[villa_page()], &ns, &template()).await.unwrap();
        ingestor
            .delete_by_filter(&ns, &MetadataFilter::new().eq("brand", "VILLA"))
            .await
            .unwrap();

        let phases = seen.lock().unwrap();
        for phase in ["chunk", "embed", "upsert", "delete"] {
            assert!(phases.iter().any(|p| p == phase), "missing {}", phase);
        }
    }

    #[tokio::test]
    async fn test_workspace_ingest_ground_and_delete() {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(
            docs.join("helsinki.md"),
            "# HELSINKI\n\nScandinavian premium vodka HELSINKI, triple filtered.",
        )
        .unwrap();
        std::fs::write(docs.join("logo.png"), [0x89, 0x50, 0x00, 0x47]).unwrap();

        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let ns = Namespace::new("brand_catalog").unwrap();

        let stats = crate::ingest(
            temp.path(),
            store.clone(),
            IngestOptions {
                namespace: ns.clone(),
                paths: vec![docs.clone()],
                url: None,
                template: MetadataTemplate::new("HELSINKI", "product", "brand_website"),
                embedding: None,
            },
            None,
            ProgressReporter::noop(),
        )
        .await
        .unwrap();
        assert_eq!(stats.total, 1);
        assert!(config::get_config_path(temp.path(), &ns).exists());

        let catalog = Arc::new(SqliteCatalog::open_in_memory().unwrap());
        let outcome = crate::ground(
            temp.path(),
            store.clone(),
            catalog,
            GroundRequest {
                namespace: ns.clone(),
                query: "Scandinavian premium vodka HELSINKI, triple filtered.".to_string(),
                candidate_answer: String::new(),
                filter: Some(MetadataFilter::new().eq("source_type", "brand_website")),
            },
            None,
        )
        .await
        .unwrap();
        assert_eq!(outcome.context.len(), 1);
        assert!(outcome.rendered.contains("helsinki.md"));

        let deleted = crate::delete(
            temp.path(),
            store.clone(),
            &ns,
            DeleteTarget::Filter(MetadataFilter::new().eq("brand", "HELSINKI")),
            None,
            ProgressReporter::noop(),
        )
        .await
        .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.describe_stats().await.unwrap().total_vector_count, 0);
    }

    #[tokio::test]
    async fn test_changing_embedding_dimension_is_fatal() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("note.txt");
        std::fs::write(&file, "Корпоративна політика відпусток").unwrap();
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let ns = Namespace::new("hr_policies").unwrap();

        let options = |embedding: EmbeddingConfig| IngestOptions {
            namespace: ns.clone(),
            paths: vec![file.clone()],
            url: Some("https://hr.example/vacations".to_string()),
            template: MetadataTemplate::new("", "policy", "manual"),
            embedding: Some(embedding),
        };

        crate::ingest(
            temp.path(),
            store.clone(),
            options(EmbeddingConfig::default()),
            None,
            ProgressReporter::noop(),
        )
        .await
        .unwrap();

        let narrower = EmbeddingConfig {
            dimensions: 128,
            ..EmbeddingConfig::default()
        };
        let err = crate::ingest(
            temp.path(),
            store,
            options(narrower),
            None,
            ProgressReporter::noop(),
        )
        .await
        .unwrap_err();
        assert!(err.is_fatal());
    }
}
