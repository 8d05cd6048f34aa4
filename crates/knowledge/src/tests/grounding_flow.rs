//! Tests for the query-time grounding flow.

use crate::catalog::{DocumentCatalog, SqliteCatalog};
use crate::progress::ProgressReporter;
use crate::embeddings::{EmbeddingConfig, Embedder};
use crate::rag::{GroundingConfig, GroundingService, StructuredMatcher, VectorRetriever};
use crate::store::{
    InMemoryVectorStore, MetadataFilter, StoreStats, VectorMatch, VectorRecord, VectorStore,
};
use crate::types::{ChunkMetadata, DocumentRecord, HitOrigin, MetadataTemplate, Namespace};
use crate::{GroundRequest, IngestOptions};
use async_trait::async_trait;
use gradus_core::{AppConfig, AppError, AppResult};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder() -> Embedder {
        Embedder::from_config(&EmbeddingConfig::default(), None).unwrap()
    }

    fn document(id: i64, number: &str, title: &str, topics: &[&str]) -> DocumentRecord {
        DocumentRecord {
            id,
            title: title.to_string(),
            document_type: "form".to_string(),
            document_number: number.to_string(),
            url: format!("https://hr.example/docs/{}", id),
            category: "hr".to_string(),
            description: String::new(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            is_active: true,
        }
    }

    async fn hr_catalog() -> Arc<SqliteCatalog> {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        catalog
            .import_records(vec![
                document(1, "№12", "Заява на відпустку", &["заява"]),
                document(2, "№20", "Графік відпусток", &["відпустка"]),
                document(3, "№21", "Наказ про відпустку", &["відпустка"]),
            ])
            .await
            .unwrap();
        Arc::new(catalog)
    }

    async fn put(store: &dyn VectorStore, ns: &Namespace, id: &str, text: &str) {
        let vector = embedder().embed(text).await.unwrap();
        store
            .upsert(
                ns,
                vec![VectorRecord {
                    id: id.to_string(),
                    vector,
                    metadata: ChunkMetadata {
                        title: format!("chunk {}", id),
                        source_url: format!("https://kb.example/{}", id),
                        text_snippet: text.to_string(),
                        ..Default::default()
                    },
                }],
            )
            .await
            .unwrap();
    }

    fn service(
        store: Arc<dyn VectorStore>,
        catalog: Arc<dyn DocumentCatalog>,
        config: &GroundingConfig,
    ) -> GroundingService {
        let retriever = VectorRetriever::new(embedder(), store, 0.5);
        let matcher = StructuredMatcher::new(catalog, config);
        GroundingService::new(config, retriever, matcher, 3)
    }

    #[tokio::test]
    async fn test_fusion_puts_number_match_first_without_duplicates() {
        let ns = Namespace::new("hr_docs").unwrap();
        let store = Arc::new(InMemoryVectorStore::new());
        // Same id as a topic-matched catalog record.
        put(store.as_ref(), &ns, "2", "відпустка").await;
        put(store.as_ref(), &ns, "kb_0", "відпустка").await;

        let config = GroundingConfig::default();
        let outcome = service(store, hr_catalog().await, &config)
            .ground("відпустка", "Заповніть бланк №12.", &ns, None)
            .await
            .unwrap();

        let ids: Vec<&str> = outcome.context.hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(outcome.context.hits[0].origin, HitOrigin::NumberMatch);
        assert_eq!(outcome.context.hits[1].origin, HitOrigin::TopicMatch);
        assert!(outcome.rendered.starts_with("📚 Документи:\n• Заява на відпустку"));
    }

    #[tokio::test]
    async fn test_vector_hits_fill_remaining_slots() {
        let ns = Namespace::new("hr_docs").unwrap();
        let store = Arc::new(InMemoryVectorStore::new());
        put(store.as_ref(), &ns, "kb_0", "лікарняний лист").await;

        let config = GroundingConfig::default();
        let outcome = service(store, hr_catalog().await, &config)
            .ground("лікарняний лист", "Див. шаблон 12", &ns, None)
            .await
            .unwrap();

        let ids: Vec<&str> = outcome.context.hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "kb_0"]);
        assert!(outcome.rendered.contains("https://kb.example/kb_0"));
    }

    struct BrokenStore;

    #[async_trait]
    impl VectorStore for BrokenStore {
        async fn upsert(&self, _: &Namespace, _: Vec<VectorRecord>) -> AppResult<()> {
            Err(AppError::VectorStore("unavailable".to_string()))
        }

        async fn query(
            &self,
            _: &Namespace,
            _: &[f32],
            _: usize,
            _: Option<&MetadataFilter>,
        ) -> AppResult<Vec<VectorMatch>> {
            Err(AppError::VectorStore("unavailable".to_string()))
        }

        async fn delete_ids(&self, _: &Namespace, _: &[String]) -> AppResult<u64> {
            Err(AppError::VectorStore("unavailable".to_string()))
        }

        async fn delete_by_filter(&self, _: &Namespace, _: &MetadataFilter) -> AppResult<u64> {
            Err(AppError::VectorStore("unavailable".to_string()))
        }

        async fn list_ids(&self, _: &Namespace, _: &MetadataFilter) -> AppResult<Vec<String>> {
            Err(AppError::VectorStore("unavailable".to_string()))
        }

        async fn describe_stats(&self) -> AppResult<StoreStats> {
            Err(AppError::VectorStore("unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_structured_hits() {
        let ns = Namespace::new("hr_docs").unwrap();
        let store: Arc<dyn VectorStore> = Arc::new(BrokenStore);

        let retriever = VectorRetriever::new(embedder(), store.clone(), 0.5);
        assert!(retriever.retrieve("відпустка", &ns, 3, None).await.unwrap().is_empty());

        let config = GroundingConfig::default();
        let outcome = service(store, hr_catalog().await, &config)
            .ground("відпустка", "див. №12", &ns, None)
            .await
            .unwrap();

        assert_eq!(outcome.context.len(), 3);
        assert!(outcome
            .context
            .hits
            .iter()
            .all(|h| h.origin != HitOrigin::Vector));
    }

    #[tokio::test]
    async fn test_namespace_isolation() {
        let a = Namespace::new("brand_catalog").unwrap();
        let b = Namespace::new("hr_policies").unwrap();
        let store = Arc::new(InMemoryVectorStore::new());
        put(store.as_ref(), &a, "greenday_0", "premium vodka greenday").await;

        let retriever = VectorRetriever::new(embedder(), store, -1.0);
        let in_a = retriever.retrieve("premium vodka greenday", &a, 3, None).await.unwrap();
        let in_b = retriever.retrieve("premium vodka greenday", &b, 3, None).await.unwrap();

        assert_eq!(in_a.len(), 1);
        assert!(in_b.is_empty());
    }

    #[tokio::test]
    async fn test_brand_query_is_expanded_before_retrieval() {
        let ns = Namespace::new("brand_catalog").unwrap();
        let store = Arc::new(InMemoryVectorStore::new());
        let config = GroundingConfig::default();
        let catalog = Arc::new(SqliteCatalog::open_in_memory().unwrap());

        let outcome = service(store, catalog, &config)
            .ground("розкажи про greenday", "", &ns, None)
            .await
            .unwrap();

        assert!(outcome.expanded_query.starts_with("розкажи про greenday ("));
        assert!(outcome.context.is_empty());
        assert_eq!(outcome.rendered, "");
    }

    /// A path whose parent is a regular file, so nothing can be opened there.
    fn blocked_path(temp: &TempDir, file: &str) -> PathBuf {
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        blocker.join(file)
    }

    fn request(ns: &Namespace, query: &str, answer: &str) -> GroundRequest {
        GroundRequest {
            namespace: ns.clone(),
            query: query.to_string(),
            candidate_answer: answer.to_string(),
            filter: None,
        }
    }

    #[tokio::test]
    async fn test_unopenable_catalog_still_returns_vector_hits() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig {
            workspace: temp.path().to_path_buf(),
            catalog_path: Some(blocked_path(&temp, "catalog.sqlite")),
            ..AppConfig::default()
        };
        assert!(crate::open_catalog(&config).is_err());

        let docs = temp.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("vacation.md"), "Щорічна відпустка триває 24 дні.").unwrap();

        let ns = Namespace::new("hr_docs").unwrap();
        crate::ingest(
            temp.path(),
            crate::open_store(&config).unwrap(),
            IngestOptions {
                namespace: ns.clone(),
                paths: vec![docs],
                url: None,
                template: MetadataTemplate::new("", "policy", "manual"),
                embedding: None,
            },
            None,
            ProgressReporter::noop(),
        )
        .await
        .unwrap();

        let outcome = crate::ground(
            temp.path(),
            crate::open_store_for_grounding(&config).unwrap(),
            crate::open_catalog_for_grounding(&config).unwrap(),
            request(&ns, "Щорічна відпустка триває 24 дні.", "Див. бланк №12"),
            None,
        )
        .await
        .unwrap();

        assert_eq!(outcome.context.len(), 1);
        assert_eq!(outcome.context.hits[0].origin, HitOrigin::Vector);
        assert!(outcome.rendered.contains("vacation.md"));
    }

    #[tokio::test]
    async fn test_unopenable_store_still_returns_catalog_matches() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig {
            workspace: temp.path().to_path_buf(),
            store_path: Some(blocked_path(&temp, "vectors.sqlite")),
            ..AppConfig::default()
        };
        assert!(crate::open_store(&config).is_err());

        crate::open_catalog(&config)
            .unwrap()
            .import_records(vec![document(1, "№12", "Заява на відпустку", &["заява"])])
            .await
            .unwrap();

        let ns = Namespace::new("hr_docs").unwrap();
        let outcome = crate::ground(
            temp.path(),
            crate::open_store_for_grounding(&config).unwrap(),
            crate::open_catalog_for_grounding(&config).unwrap(),
            request(&ns, "як оформити відпустку", "Заповніть бланк №12."),
            None,
        )
        .await
        .unwrap();

        let ids: Vec<&str> = outcome.context.hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
        assert_eq!(outcome.context.hits[0].origin, HitOrigin::NumberMatch);
    }
}
