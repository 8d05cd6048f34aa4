//! Process-local vector store.

use super::{
    check_dimensions, cosine_similarity, rank, MetadataFilter, NamespaceStats, StoreStats,
    VectorMatch, VectorRecord, VectorStore,
};
use crate::types::{ChunkMetadata, Namespace};
use async_trait::async_trait;
use gradus_core::{AppError, AppResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Partition {
    dimension: Option<usize>,
    records: BTreeMap<String, (Vec<f32>, ChunkMetadata)>,
}

type Partitions = HashMap<Namespace, Partition>;

/// Vector store held in memory. Used by tests and `store.backend: memory`.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    partitions: RwLock<Partitions>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, Partitions>> {
        self.partitions
            .read()
            .map_err(|_| AppError::VectorStore("In-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, Partitions>> {
        self.partitions
            .write()
            .map_err(|_| AppError::VectorStore("In-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, namespace: &Namespace, records: Vec<VectorRecord>) -> AppResult<()> {
        let mut partitions = self.write()?;
        let partition = partitions.entry(namespace.clone()).or_default();

        partition.dimension = check_dimensions(namespace, partition.dimension, &records)?;
        for record in records {
            partition
                .records
                .insert(record.id, (record.vector, record.metadata));
        }
        Ok(())
    }

    async fn query(
        &self,
        namespace: &Namespace,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> AppResult<Vec<VectorMatch>> {
        let partitions = self.read()?;
        let Some(partition) = partitions.get(namespace) else {
            return Ok(Vec::new());
        };

        if let Some(dimension) = partition.dimension {
            if dimension != vector.len() {
                return Err(AppError::Config(format!(
                    "Query vector has {} dimensions, namespace '{}' stores {}",
                    vector.len(),
                    namespace,
                    dimension
                )));
            }
        }

        let matches = partition
            .records
            .iter()
            .filter(|(_, (_, metadata))| filter.map_or(true, |f| f.matches(metadata)))
            .map(|(id, (stored, metadata))| VectorMatch {
                id: id.clone(),
                score: cosine_similarity(vector, stored),
                metadata: metadata.clone(),
            })
            .collect();

        Ok(rank(matches, top_k))
    }

    async fn delete_ids(&self, namespace: &Namespace, ids: &[String]) -> AppResult<u64> {
        let mut partitions = self.write()?;
        let Some(partition) = partitions.get_mut(namespace) else {
            return Ok(0);
        };

        Ok(ids
            .iter()
            .filter(|id| partition.records.remove(*id).is_some())
            .count() as u64)
    }

    async fn delete_by_filter(
        &self,
        namespace: &Namespace,
        filter: &MetadataFilter,
    ) -> AppResult<u64> {
        let mut partitions = self.write()?;
        let Some(partition) = partitions.get_mut(namespace) else {
            return Ok(0);
        };

        let before = partition.records.len();
        partition
            .records
            .retain(|_, (_, metadata)| !filter.matches(metadata));
        Ok((before - partition.records.len()) as u64)
    }

    async fn list_ids(
        &self,
        namespace: &Namespace,
        filter: &MetadataFilter,
    ) -> AppResult<Vec<String>> {
        let partitions = self.read()?;
        Ok(partitions
            .get(namespace)
            .map(|p| {
                p.records
                    .iter()
                    .filter(|(_, (_, metadata))| filter.matches(metadata))
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn describe_stats(&self) -> AppResult<StoreStats> {
        let partitions = self.read()?;
        let mut stats = StoreStats::default();

        for (namespace, partition) in partitions.iter() {
            let count = partition.records.len() as u64;
            stats.total_vector_count += count;
            stats.namespaces.insert(
                namespace.to_string(),
                NamespaceStats {
                    vector_count: count,
                    dimension: partition.dimension.unwrap_or(0),
                },
            );
        }

        Ok(stats)
    }
}
