//! Structured document matching against the relational catalog.
//!
//! Two lookups run side by side: explicit document numbers cited in the
//! candidate answer, and topic keywords taken from the user query. Number
//! matches come first; topic matches are appended only while there are fewer
//! number matches than the configured threshold.

use super::config::GroundingConfig;
use crate::catalog::DocumentCatalog;
use crate::types::{HitOrigin, RetrievalHit};
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, LazyLock};

/// Numeric sign, template and appendix references.
static NUMBER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)№\s*(\d+(?:\.\d+)?)",
        r"(?i)шаблон\s+(\d+)",
        r"(?i)додаток\s+(\d+(?:\.\d+)?)",
    ]
    .iter()
    .filter_map(|p| compile(p))
    .collect()
});

static WORD: LazyLock<Option<Regex>> = LazyLock::new(|| compile(r"\b\w{3,}\b"));

fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .map_err(|e| tracing::error!("Invalid matcher pattern {:?}: {}", pattern, e))
        .ok()
}

/// Document numbers referenced in `text`, in canonical `№<n>` form.
pub fn extract_document_numbers(text: &str) -> BTreeSet<String> {
    NUMBER_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.captures_iter(text))
        .filter_map(|caps| caps.get(1))
        .map(|m| format!("№{}", m.as_str()))
        .collect()
}

/// Lower-cased words of three or more characters, minus stop words.
pub fn topic_keywords(query: &str, stop_words: &HashSet<String>) -> BTreeSet<String> {
    let lower = query.to_lowercase();
    let Some(word) = WORD.as_ref() else {
        return BTreeSet::new();
    };

    word.find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| !stop_words.contains(*w))
        .map(str::to_string)
        .collect()
}

pub struct StructuredMatcher {
    catalog: Arc<dyn DocumentCatalog>,
    stop_words: HashSet<String>,
    topic_limit: usize,
    number_match_threshold: usize,
}

impl StructuredMatcher {
    pub fn new(catalog: Arc<dyn DocumentCatalog>, config: &GroundingConfig) -> Self {
        Self {
            catalog,
            stop_words: config.stop_words.iter().map(|w| w.to_lowercase()).collect(),
            topic_limit: config.topic_limit,
            number_match_threshold: config.number_match_threshold,
        }
    }

    /// Match catalog documents for a query and its candidate answer.
    ///
    /// Catalog failures are logged and yield no hits for that lookup.
    pub async fn match_documents(&self, query: &str, candidate_answer: &str) -> Vec<RetrievalHit> {
        let numbers = extract_document_numbers(candidate_answer);
        let keywords = topic_keywords(query, &self.stop_words);

        if !numbers.is_empty() {
            tracing::info!("Found document numbers in answer: {:?}", numbers);
        }

        let (by_number, by_topic) = tokio::join!(
            self.catalog.find_by_numbers(&numbers),
            self.catalog.find_by_topics(&keywords, self.topic_limit)
        );

        let mut hits: Vec<RetrievalHit> = match by_number {
            Ok(records) => records
                .into_iter()
                .map(|r| RetrievalHit::from_document(r, HitOrigin::NumberMatch))
                .collect(),
            Err(e) => {
                tracing::warn!("Document number lookup failed, continuing without it: {}", e);
                Vec::new()
            }
        };

        if hits.len() < self.number_match_threshold {
            match by_topic {
                Ok(records) => hits.extend(
                    records
                        .into_iter()
                        .map(|r| RetrievalHit::from_document(r, HitOrigin::TopicMatch)),
                ),
                Err(e) => {
                    tracing::warn!("Topic lookup failed, continuing without it: {}", e);
                }
            }
        }

        tracing::debug!(
            "Structured matcher produced {} hits ({} numbers, {} keywords)",
            hits.len(),
            numbers.len(),
            keywords.len()
        );

        hits
    }
}
