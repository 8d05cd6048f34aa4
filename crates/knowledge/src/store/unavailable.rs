//! Stand-in for a vector store that could not be opened.

use super::{MetadataFilter, StoreStats, VectorMatch, VectorRecord, VectorStore};
use crate::types::Namespace;
use async_trait::async_trait;
use gradus_core::{AppError, AppResult};

/// Fails every operation with the reason the real store was unavailable.
#[derive(Debug, Clone)]
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> AppError {
        AppError::VectorStore(format!("Store unavailable: {}", self.reason))
    }
}

#[async_trait]
impl VectorStore for UnavailableStore {
    async fn upsert(&self, _namespace: &Namespace, _records: Vec<VectorRecord>) -> AppResult<()> {
        Err(self.error())
    }

    async fn query(
        &self,
        _namespace: &Namespace,
        _vector: &[f32],
        _top_k: usize,
        _filter: Option<&MetadataFilter>,
    ) -> AppResult<Vec<VectorMatch>> {
        Err(self.error())
    }

    async fn delete_ids(&self, _namespace: &Namespace, _ids: &[String]) -> AppResult<u64> {
        Err(self.error())
    }

    async fn delete_by_filter(
        &self,
        _namespace: &Namespace,
        _filter: &MetadataFilter,
    ) -> AppResult<u64> {
        Err(self.error())
    }

    async fn list_ids(
        &self,
        _namespace: &Namespace,
        _filter: &MetadataFilter,
    ) -> AppResult<Vec<String>> {
        Err(self.error())
    }

    async fn describe_stats(&self) -> AppResult<StoreStats> {
        Err(self.error())
    }
}
