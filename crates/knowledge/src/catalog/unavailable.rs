//! Stand-in for a catalog that could not be opened.

use super::DocumentCatalog;
use crate::types::DocumentRecord;
use async_trait::async_trait;
use gradus_core::{AppError, AppResult};
use std::collections::BTreeSet;

/// Fails every lookup with the reason the real catalog was unavailable.
#[derive(Debug, Clone)]
pub struct UnavailableCatalog {
    reason: String,
}

impl UnavailableCatalog {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> AppError {
        AppError::CatalogLookup(format!("Catalog unavailable: {}", self.reason))
    }
}

#[async_trait]
impl DocumentCatalog for UnavailableCatalog {
    async fn find_by_numbers(
        &self,
        _numbers: &BTreeSet<String>,
    ) -> AppResult<Vec<DocumentRecord>> {
        Err(self.error())
    }

    async fn find_by_topics(
        &self,
        _keywords: &BTreeSet<String>,
        _limit: usize,
    ) -> AppResult<Vec<DocumentRecord>> {
        Err(self.error())
    }
}
