//! Relational document catalog seam.
//!
//! The grounding path only reads from the catalog.

pub mod sqlite;
pub mod unavailable;

pub use sqlite::SqliteCatalog;
pub use unavailable::UnavailableCatalog;

use crate::types::DocumentRecord;
use async_trait::async_trait;
use gradus_core::AppResult;
use std::collections::BTreeSet;

#[async_trait]
pub trait DocumentCatalog: Send + Sync {
    /// Active records whose number is in `numbers`, ordered by
    /// `(document_type, document_number)`.
    async fn find_by_numbers(&self, numbers: &BTreeSet<String>) -> AppResult<Vec<DocumentRecord>>;

    /// Active records sharing at least one topic with `keywords`, ordered by
    /// `document_number`, at most `limit`.
    async fn find_by_topics(
        &self,
        keywords: &BTreeSet<String>,
        limit: usize,
    ) -> AppResult<Vec<DocumentRecord>>;
}
