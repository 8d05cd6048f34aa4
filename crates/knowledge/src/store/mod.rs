//! Vector store seam.
//!
//! Vectors are partitioned by [`Namespace`]; no operation reads or writes
//! across namespaces. Each namespace has one fixed dimension, set by its
//! first vector.

pub mod filter;
pub mod memory;
pub mod sqlite;
pub mod unavailable;

pub use filter::{Condition, MetadataFilter};
pub use memory::InMemoryVectorStore;
pub use sqlite::SqliteVectorStore;
pub use unavailable::UnavailableStore;

use crate::types::{ChunkMetadata, Namespace};
use async_trait::async_trait;
use gradus_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A vector with its id and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A query result.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: ChunkMetadata,
}

/// Per-namespace summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceStats {
    pub vector_count: u64,
    pub dimension: usize,
}

/// Store-wide summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_vector_count: u64,
    pub namespaces: BTreeMap<String, NamespaceStats>,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite records by id.
    async fn upsert(&self, namespace: &Namespace, records: Vec<VectorRecord>) -> AppResult<()>;

    /// Nearest neighbours by cosine similarity, best first.
    async fn query(
        &self,
        namespace: &Namespace,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> AppResult<Vec<VectorMatch>>;

    /// Delete by id. Returns how many existed.
    async fn delete_ids(&self, namespace: &Namespace, ids: &[String]) -> AppResult<u64>;

    /// Delete every record matching `filter`. Returns how many were removed.
    async fn delete_by_filter(
        &self,
        namespace: &Namespace,
        filter: &MetadataFilter,
    ) -> AppResult<u64>;

    /// Ids of records matching `filter`, for batched maintenance deletes.
    async fn list_ids(
        &self,
        namespace: &Namespace,
        filter: &MetadataFilter,
    ) -> AppResult<Vec<String>>;

    async fn describe_stats(&self) -> AppResult<StoreStats>;
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// All records in a batch must share `expected` (or the batch's own first
/// dimension when the namespace is still empty).
pub(crate) fn check_dimensions(
    namespace: &Namespace,
    expected: Option<usize>,
    records: &[VectorRecord],
) -> AppResult<Option<usize>> {
    let mut dimension = expected;
    for record in records {
        if record.vector.is_empty() {
            return Err(AppError::Config(format!(
                "Empty vector for '{}' in namespace '{}'",
                record.id, namespace
            )));
        }
        match dimension {
            Some(d) if d != record.vector.len() => {
                return Err(AppError::Config(format!(
                    "Dimension mismatch in namespace '{}': record '{}' has {}, expected {}",
                    namespace,
                    record.id,
                    record.vector.len(),
                    d
                )));
            }
            Some(_) => {}
            None => dimension = Some(record.vector.len()),
        }
    }
    Ok(dimension)
}

/// Sort best first with a stable id tie-break, then cut to `top_k`.
pub(crate) fn rank(mut matches: Vec<VectorMatch>, top_k: usize) -> Vec<VectorMatch> {
    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    matches.truncate(top_k);
    matches
}
