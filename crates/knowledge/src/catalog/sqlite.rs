//! SQLite document catalog.

use super::DocumentCatalog;
use crate::types::DocumentRecord;
use async_trait::async_trait;
use gradus_core::{AppError, AppResult};
use rusqlite::{params, params_from_iter, Connection};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        document_type TEXT NOT NULL DEFAULT '',
        document_number TEXT NOT NULL,
        url TEXT NOT NULL,
        category TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT '',
        is_active INTEGER NOT NULL DEFAULT 1
    );

    CREATE TABLE IF NOT EXISTS document_topics (
        document_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
        topic TEXT NOT NULL,
        PRIMARY KEY (document_id, topic)
    );

    CREATE INDEX IF NOT EXISTS idx_documents_number ON documents(document_number);
    CREATE INDEX IF NOT EXISTS idx_document_topics_topic ON document_topics(topic);
"#;

const COLUMNS: &str =
    "d.id, d.title, d.document_type, d.document_number, d.url, d.category, d.description, d.is_active";

/// Catalog of HR-style documents in SQLite.
#[derive(Clone)]
pub struct SqliteCatalog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalog {
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::CatalogLookup(format!("Failed to create catalog directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::CatalogLookup(format!("Failed to open catalog: {}", e)))?;
        tracing::debug!("Opened document catalog at {:?}", db_path);
        Self::init(conn)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::CatalogLookup(format!("Failed to open catalog: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .and_then(|_| conn.execute_batch(SCHEMA))
            .map_err(|e| AppError::CatalogLookup(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert or replace records with their topics. Seeding helper; the
    /// grounding path never writes.
    pub async fn import_records(&self, records: Vec<DocumentRecord>) -> AppResult<usize> {
        self.with_conn(move |conn| {
            let tx = conn
                .transaction()
                .map_err(|e| AppError::CatalogLookup(format!("Failed to begin import: {}", e)))?;

            for record in &records {
                tx.execute(
                    "INSERT OR REPLACE INTO documents
                     (id, title, document_type, document_number, url, category, description, is_active)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        record.id,
                        record.title,
                        record.document_type,
                        record.document_number,
                        record.url,
                        record.category,
                        record.description,
                        record.is_active,
                    ],
                )
                .map_err(|e| {
                    AppError::CatalogLookup(format!("Failed to import document {}: {}", record.id, e))
                })?;

                tx.execute(
                    "DELETE FROM document_topics WHERE document_id = ?1",
                    params![record.id],
                )
                .map_err(|e| AppError::CatalogLookup(format!("Failed to reset topics: {}", e)))?;

                for topic in &record.topics {
                    tx.execute(
                        "INSERT OR IGNORE INTO document_topics (document_id, topic) VALUES (?1, ?2)",
                        params![record.id, topic.to_lowercase()],
                    )
                    .map_err(|e| {
                        AppError::CatalogLookup(format!("Failed to import topic: {}", e))
                    })?;
                }
            }

            tx.commit()
                .map_err(|e| AppError::CatalogLookup(format!("Failed to commit import: {}", e)))?;

            tracing::info!("Imported {} catalog records", records.len());
            Ok(records.len())
        })
        .await
    }

    async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> AppResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| AppError::CatalogLookup("Catalog lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| AppError::CatalogLookup(format!("Catalog task failed: {}", e)))?
    }
}

/// Run a document query and attach topics to each row, keeping row order.
fn query_documents(
    conn: &Connection,
    sql: &str,
    values: Vec<rusqlite::types::Value>,
) -> AppResult<Vec<DocumentRecord>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| AppError::CatalogLookup(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map(params_from_iter(values), |row| {
            Ok(DocumentRecord {
                id: row.get(0)?,
                title: row.get(1)?,
                document_type: row.get(2)?,
                document_number: row.get(3)?,
                url: row.get(4)?,
                category: row.get(5)?,
                description: row.get(6)?,
                topics: Vec::new(),
                is_active: row.get(7)?,
            })
        })
        .map_err(|e| AppError::CatalogLookup(format!("Catalog query failed: {}", e)))?;

    let mut records = Vec::new();
    for row in rows {
        records.push(
            row.map_err(|e| AppError::CatalogLookup(format!("Failed to read document: {}", e)))?,
        );
    }

    let mut topics = load_topics(conn, records.iter().map(|r| r.id))?;
    for record in &mut records {
        record.topics = topics.remove(&record.id).unwrap_or_default();
    }

    Ok(records)
}

fn load_topics(
    conn: &Connection,
    ids: impl Iterator<Item = i64>,
) -> AppResult<BTreeMap<i64, Vec<String>>> {
    let ids: Vec<i64> = ids.collect();
    let mut topics: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    if ids.is_empty() {
        return Ok(topics);
    }

    let sql = format!(
        "SELECT document_id, topic FROM document_topics WHERE document_id IN ({}) ORDER BY topic",
        placeholders(ids.len())
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| AppError::CatalogLookup(format!("Failed to prepare topic query: {}", e)))?;
    let rows = stmt
        .query_map(params_from_iter(ids), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| AppError::CatalogLookup(format!("Topic query failed: {}", e)))?;

    for row in rows {
        let (id, topic) =
            row.map_err(|e| AppError::CatalogLookup(format!("Failed to read topic: {}", e)))?;
        topics.entry(id).or_default().push(topic);
    }
    Ok(topics)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn text_values<'a>(items: impl Iterator<Item = &'a String>) -> Vec<rusqlite::types::Value> {
    items
        .map(|s| rusqlite::types::Value::Text(s.clone()))
        .collect()
}

#[async_trait]
impl DocumentCatalog for SqliteCatalog {
    async fn find_by_numbers(&self, numbers: &BTreeSet<String>) -> AppResult<Vec<DocumentRecord>> {
        if numbers.is_empty() {
            return Ok(Vec::new());
        }

        let values = text_values(numbers.iter());
        let sql = format!(
            "SELECT {} FROM documents d
             WHERE d.document_number IN ({}) AND d.is_active = 1
             ORDER BY d.document_type, d.document_number",
            COLUMNS,
            placeholders(values.len())
        );

        self.with_conn(move |conn| query_documents(conn, &sql, values))
            .await
    }

    async fn find_by_topics(
        &self,
        keywords: &BTreeSet<String>,
        limit: usize,
    ) -> AppResult<Vec<DocumentRecord>> {
        if keywords.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut values = text_values(keywords.iter());
        let sql = format!(
            "SELECT {} FROM documents d
             WHERE d.is_active = 1 AND EXISTS (
                 SELECT 1 FROM document_topics t
                 WHERE t.document_id = d.id AND t.topic IN ({})
             )
             ORDER BY d.document_number, d.id
             LIMIT ?",
            COLUMNS,
            placeholders(values.len())
        );
        values.push(rusqlite::types::Value::Integer(limit as i64));

        self.with_conn(move |conn| query_documents(conn, &sql, values))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: i64, doc_type: &str, number: &str, topics: &[&str], active: bool) -> DocumentRecord {
        DocumentRecord {
            id,
            title: format!("Документ {}", number),
            document_type: doc_type.to_string(),
            document_number: number.to_string(),
            url: format!("https://hr.example/docs/{}", id),
            category: "hr".to_string(),
            description: String::new(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            is_active: active,
        }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    async fn seeded() -> SqliteCatalog {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        catalog
            .import_records(vec![
                doc(1, "template", "№5", &["відпустка"], true),
                doc(2, "policy", "№12", &["відрядження", "відпустка"], true),
                doc(3, "policy", "№7", &["відпустка"], false),
                doc(4, "appendix", "№3", &["лікарняний"], true),
            ])
            .await
            .unwrap();
        catalog
    }

    #[tokio::test]
    async fn test_find_by_numbers_orders_and_skips_inactive() {
        let catalog = seeded().await;
        let found = catalog
            .find_by_numbers(&set(&["№5", "№12", "№7", "№99"]))
            .await
            .unwrap();

        let ids: Vec<i64> = found.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(found[0].topics, vec!["відпустка", "відрядження"]);
    }

    #[tokio::test]
    async fn test_find_by_topics_limit_and_order() {
        let catalog = seeded().await;
        let found = catalog
            .find_by_topics(&set(&["відпустка", "лікарняний"]), 2)
            .await
            .unwrap();

        let numbers: Vec<&str> = found.iter().map(|d| d.document_number.as_str()).collect();
        assert_eq!(numbers, vec!["№12", "№3"]);
    }

    #[tokio::test]
    async fn test_empty_inputs() {
        let catalog = seeded().await;
        assert!(catalog.find_by_numbers(&BTreeSet::new()).await.unwrap().is_empty());
        assert!(catalog.find_by_topics(&set(&["x"]), 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reimport_replaces_topics() {
        let catalog = seeded().await;
        catalog
            .import_records(vec![doc(1, "template", "№5", &["премія"], true)])
            .await
            .unwrap();

        let found = catalog.find_by_topics(&set(&["відпустка"]), 5).await.unwrap();
        assert!(found.iter().all(|d| d.id != 1));
        let found = catalog.find_by_topics(&set(&["премія"]), 5).await.unwrap();
        assert_eq!(found[0].id, 1);
    }
}
