//! SQLite-backed vector store.
//!
//! Vectors are stored as little-endian f32 blobs keyed by `(namespace, id)`.
//! Similarity is computed in process over the namespace's rows.

use super::{
    check_dimensions, cosine_similarity, rank, MetadataFilter, NamespaceStats, StoreStats,
    VectorMatch, VectorRecord, VectorStore,
};
use crate::types::{ChunkMetadata, Namespace};
use async_trait::async_trait;
use chrono::Utc;
use gradus_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS namespaces (
        name TEXT PRIMARY KEY,
        dimension INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS vectors (
        namespace TEXT NOT NULL,
        id TEXT NOT NULL,
        embedding BLOB NOT NULL,
        metadata TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (namespace, id)
    );
"#;

/// Persistent vector store in a single SQLite file.
#[derive(Clone)]
pub struct SqliteVectorStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteVectorStore {
    /// Open (and create if needed) the store at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::VectorStore(format!("Failed to create store directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::VectorStore(format!("Failed to open SQLite store: {}", e)))?;

        tracing::debug!("Opened SQLite vector store at {:?}", db_path);
        Self::init(conn)
    }

    /// Store that lives only as long as this value.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::VectorStore(format!("Failed to open SQLite store: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::VectorStore(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> AppResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| AppError::VectorStore("SQLite connection lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| AppError::VectorStore(format!("SQLite task failed: {}", e)))?
    }
}

fn sql_err(context: &str) -> impl Fn(rusqlite::Error) -> AppError + '_ {
    move |e| AppError::VectorStore(format!("{}: {}", context, e))
}

fn namespace_dimension(conn: &Connection, namespace: &Namespace) -> AppResult<Option<usize>> {
    conn.query_row(
        "SELECT dimension FROM namespaces WHERE name = ?1",
        params![namespace.as_str()],
        |row| row.get::<_, i64>(0),
    )
    .optional()
    .map(|d| d.map(|d| d as usize))
    .map_err(sql_err("Failed to read namespace dimension"))
}

/// Load `(id, metadata)` pairs, plus the vector when `with_vectors` is set.
fn load_rows(
    conn: &Connection,
    namespace: &Namespace,
    with_vectors: bool,
) -> AppResult<Vec<(String, Option<Vec<f32>>, ChunkMetadata)>> {
    let sql = if with_vectors {
        "SELECT id, metadata, embedding FROM vectors WHERE namespace = ?1"
    } else {
        "SELECT id, metadata FROM vectors WHERE namespace = ?1"
    };

    let mut stmt = conn
        .prepare(sql)
        .map_err(sql_err("Failed to prepare query"))?;

    let rows = stmt
        .query_map(params![namespace.as_str()], |row| {
            let id: String = row.get(0)?;
            let metadata_json: String = row.get(1)?;
            let embedding = if with_vectors {
                Some(row.get::<_, Vec<u8>>(2)?)
            } else {
                None
            };
            Ok((id, metadata_json, embedding))
        })
        .map_err(sql_err("Failed to query vectors"))?;

    let mut result = Vec::new();
    for row in rows {
        let (id, metadata_json, embedding) = row.map_err(sql_err("Failed to read row"))?;
        let metadata: ChunkMetadata = serde_json::from_str(&metadata_json).map_err(|e| {
            AppError::VectorStore(format!("Corrupt metadata for '{}': {}", id, e))
        })?;
        let vector = embedding.as_deref().map(bytes_to_embedding).transpose()?;
        result.push((id, vector, metadata));
    }

    Ok(result)
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(&self, namespace: &Namespace, records: Vec<VectorRecord>) -> AppResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let namespace = namespace.clone();
        self.with_conn(move |conn| {
            let expected = namespace_dimension(conn, &namespace)?;
            let dimension = check_dimensions(&namespace, expected, &records)?;

            let tx = conn
                .transaction()
                .map_err(sql_err("Failed to begin transaction"))?;

            if expected.is_none() {
                if let Some(d) = dimension {
                    tx.execute(
                        "INSERT INTO namespaces (name, dimension) VALUES (?1, ?2)",
                        params![namespace.as_str(), d as i64],
                    )
                    .map_err(sql_err("Failed to register namespace"))?;
                }
            }

            let now = Utc::now().to_rfc3339();
            for record in &records {
                let metadata_json = serde_json::to_string(&record.metadata)?;
                tx.execute(
                    "INSERT OR REPLACE INTO vectors (namespace, id, embedding, metadata, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        namespace.as_str(),
                        record.id,
                        embedding_to_bytes(&record.vector),
                        metadata_json,
                        now,
                    ],
                )
                .map_err(sql_err("Failed to upsert vector"))?;
            }

            tx.commit().map_err(sql_err("Failed to commit upsert"))?;
            Ok(())
        })
        .await
    }

    async fn query(
        &self,
        namespace: &Namespace,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> AppResult<Vec<VectorMatch>> {
        let namespace = namespace.clone();
        let vector = vector.to_vec();
        let filter = filter.cloned();

        self.with_conn(move |conn| {
            if let Some(dimension) = namespace_dimension(conn, &namespace)? {
                if dimension != vector.len() {
                    return Err(AppError::Config(format!(
                        "Query vector has {} dimensions, namespace '{}' stores {}",
                        vector.len(),
                        namespace,
                        dimension
                    )));
                }
            }

            let matches = load_rows(conn, &namespace, true)?
                .into_iter()
                .filter(|(_, _, metadata)| filter.as_ref().map_or(true, |f| f.matches(metadata)))
                .map(|(id, stored, metadata)| VectorMatch {
                    score: stored.map_or(0.0, |s| cosine_similarity(&vector, &s)),
                    id,
                    metadata,
                })
                .collect();

            let ranked = rank(matches, top_k);
            tracing::debug!(
                "Retrieved {} vectors from '{}' (requested top-{})",
                ranked.len(),
                namespace,
                top_k
            );
            Ok(ranked)
        })
        .await
    }

    async fn delete_ids(&self, namespace: &Namespace, ids: &[String]) -> AppResult<u64> {
        let namespace = namespace.clone();
        let ids = ids.to_vec();

        self.with_conn(move |conn| {
            let tx = conn
                .transaction()
                .map_err(sql_err("Failed to begin transaction"))?;
            let mut deleted = 0u64;
            for id in &ids {
                deleted += tx
                    .execute(
                        "DELETE FROM vectors WHERE namespace = ?1 AND id = ?2",
                        params![namespace.as_str(), id],
                    )
                    .map_err(sql_err("Failed to delete vector"))? as u64;
            }
            tx.commit().map_err(sql_err("Failed to commit delete"))?;
            Ok(deleted)
        })
        .await
    }

    async fn delete_by_filter(
        &self,
        namespace: &Namespace,
        filter: &MetadataFilter,
    ) -> AppResult<u64> {
        let ids = self.list_ids(namespace, filter).await?;
        self.delete_ids(namespace, &ids).await
    }

    async fn list_ids(
        &self,
        namespace: &Namespace,
        filter: &MetadataFilter,
    ) -> AppResult<Vec<String>> {
        let namespace = namespace.clone();
        let filter = filter.clone();

        self.with_conn(move |conn| {
            let mut ids: Vec<String> = load_rows(conn, &namespace, false)?
                .into_iter()
                .filter(|(_, _, metadata)| filter.matches(metadata))
                .map(|(id, _, _)| id)
                .collect();
            ids.sort();
            Ok(ids)
        })
        .await
    }

    async fn describe_stats(&self) -> AppResult<StoreStats> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT n.name, n.dimension, COUNT(v.id)
                     FROM namespaces n LEFT JOIN vectors v ON v.namespace = n.name
                     GROUP BY n.name, n.dimension
                     ORDER BY n.name",
                )
                .map_err(sql_err("Failed to prepare stats query"))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })
                .map_err(sql_err("Failed to query stats"))?;

            let mut stats = StoreStats::default();
            for row in rows {
                let (name, dimension, count) = row.map_err(sql_err("Failed to read stats"))?;
                stats.total_vector_count += count as u64;
                stats.namespaces.insert(
                    name,
                    NamespaceStats {
                        vector_count: count as u64,
                        dimension: dimension as usize,
                    },
                );
            }
            Ok(stats)
        })
        .await
    }
}

/// Convert an embedding to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert stored bytes back to an embedding.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::VectorStore(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
