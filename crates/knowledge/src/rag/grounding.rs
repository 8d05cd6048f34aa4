//! Query-time grounding: expand, retrieve and match concurrently, fuse, render.

use super::citation::CitationFormatter;
use super::config::GroundingConfig;
use super::expansion::QueryExpander;
use super::fusion::fuse;
use super::matcher::StructuredMatcher;
use super::retriever::VectorRetriever;
use crate::store::MetadataFilter;
use crate::types::{GroundedContext, Namespace};
use gradus_core::AppResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of grounding one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingOutcome {
    pub expanded_query: String,
    pub context: GroundedContext,
    pub rendered: String,
}

pub struct GroundingService {
    expander: QueryExpander,
    retriever: VectorRetriever,
    matcher: StructuredMatcher,
    formatter: CitationFormatter,
    top_k: usize,
    context_cap: usize,
    strategy_timeout: Duration,
}

impl GroundingService {
    pub fn new(
        config: &GroundingConfig,
        retriever: VectorRetriever,
        matcher: StructuredMatcher,
        top_k: usize,
    ) -> Self {
        Self {
            expander: QueryExpander::new(config),
            retriever,
            matcher,
            formatter: CitationFormatter::new(config.citation_header.clone()),
            top_k,
            context_cap: config.context_cap,
            strategy_timeout: config.strategy_timeout(),
        }
    }

    /// Ground `query` (and the candidate answer drafted for it).
    ///
    /// A strategy that fails or misses its deadline contributes nothing; the
    /// other still reaches the fused context. Only fatal configuration errors
    /// are returned.
    pub async fn ground(
        &self,
        query: &str,
        candidate_answer: &str,
        namespace: &Namespace,
        filter: Option<&MetadataFilter>,
    ) -> AppResult<GroundingOutcome> {
        let expanded_query = self.expander.expand(query);

        let (vector_result, structured_result) = tokio::join!(
            tokio::time::timeout(
                self.strategy_timeout,
                self.retriever
                    .retrieve(&expanded_query, namespace, self.top_k, filter)
            ),
            tokio::time::timeout(
                self.strategy_timeout,
                self.matcher.match_documents(query, candidate_answer)
            )
        );

        let vector_hits = match vector_result {
            Ok(hits) => hits?,
            Err(_) => {
                tracing::warn!(
                    "Vector retrieval timed out after {}ms",
                    self.strategy_timeout.as_millis()
                );
                Vec::new()
            }
        };

        let structured_hits = structured_result.unwrap_or_else(|_| {
            tracing::warn!(
                "Document matching timed out after {}ms",
                self.strategy_timeout.as_millis()
            );
            Vec::new()
        });

        tracing::info!(
            "Grounding '{}' in '{}': {} vector hits, {} document hits",
            query,
            namespace,
            vector_hits.len(),
            structured_hits.len()
        );

        let context = fuse(vector_hits, structured_hits, self.context_cap);
        let rendered = self.formatter.format(&context);

        Ok(GroundingOutcome {
            expanded_query,
            context,
            rendered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DocumentCatalog;
    use crate::embeddings::{EmbeddingConfig, Embedder};
    use crate::store::InMemoryVectorStore;
    use crate::types::DocumentRecord;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    struct SlowCatalog;

    #[async_trait]
    impl DocumentCatalog for SlowCatalog {
        async fn find_by_numbers(&self, _: &BTreeSet<String>) -> AppResult<Vec<DocumentRecord>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        async fn find_by_topics(
            &self,
            _: &BTreeSet<String>,
            _: usize,
        ) -> AppResult<Vec<DocumentRecord>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_slow_catalog_times_out_to_empty() {
        let config = GroundingConfig {
            strategy_timeout_ms: 20,
            ..Default::default()
        };
        let embedder = Embedder::from_config(&EmbeddingConfig::default(), None).unwrap();
        let retriever = VectorRetriever::new(embedder, Arc::new(InMemoryVectorStore::new()), 0.5);
        let matcher = StructuredMatcher::new(Arc::new(SlowCatalog), &config);
        let service = GroundingService::new(&config, retriever, matcher, 3);

        let ns = Namespace::new("hr_docs").unwrap();
        let outcome = service
            .ground("розкажи про greenday", "див. №12", &ns, None)
            .await
            .unwrap();

        assert!(outcome.context.is_empty());
        assert!(outcome.rendered.is_empty());
        assert!(outcome.expanded_query.contains("vodka"));
    }
}
