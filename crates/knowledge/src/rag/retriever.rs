//! Semantic retrieval over a namespaced vector store.

use crate::embeddings::Embedder;
use crate::store::{MetadataFilter, VectorStore};
use crate::types::{HitOrigin, HitPayload, Namespace, RetrievalHit};
use gradus_core::AppResult;
use std::sync::Arc;

pub struct VectorRetriever {
    embedder: Embedder,
    store: Arc<dyn VectorStore>,
    min_score: f32,
}

impl VectorRetriever {
    pub fn new(embedder: Embedder, store: Arc<dyn VectorStore>, min_score: f32) -> Self {
        Self {
            embedder,
            store,
            min_score,
        }
    }

    /// Top `top_k` chunks for `query` in `namespace`, best first.
    ///
    /// Provider and store failures are logged and yield no hits. Only
    /// configuration errors (such as a dimension mismatch) are returned.
    pub async fn retrieve(
        &self,
        query: &str,
        namespace: &Namespace,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> AppResult<Vec<RetrievalHit>> {
        if top_k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let vector = match self.embedder.embed(query).await {
            Ok(vector) => vector,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!("Query embedding failed, skipping vector retrieval: {}", e);
                return Ok(Vec::new());
            }
        };

        let matches = match self.store.query(namespace, &vector, top_k, filter).await {
            Ok(matches) => matches,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!("Vector query in '{}' failed: {}", namespace, e);
                return Ok(Vec::new());
            }
        };

        let found = matches.len();
        let hits: Vec<RetrievalHit> = matches
            .into_iter()
            .filter(|m| m.score > self.min_score)
            .map(|m| RetrievalHit {
                id: m.id,
                score: m.score,
                origin: HitOrigin::Vector,
                payload: HitPayload::Chunk {
                    metadata: m.metadata,
                },
            })
            .collect();

        tracing::debug!(
            "Vector retrieval in '{}': {} matches, {} above {:.2}",
            namespace,
            found,
            hits.len(),
            self.min_score
        );

        Ok(hits)
    }
}
