//! Brand-aware query expansion.

use super::config::{ExpansionRule, GroundingConfig};

/// Appends a disambiguating phrase to queries that name a known brand.
#[derive(Debug, Clone)]
pub struct QueryExpander {
    rules: Vec<ExpansionRule>,
    category_keywords: Vec<String>,
}

impl QueryExpander {
    pub fn new(config: &GroundingConfig) -> Self {
        Self {
            rules: config
                .expansion_rules
                .iter()
                .map(|r| ExpansionRule {
                    triggers: r.triggers.iter().map(|t| t.to_lowercase()).collect(),
                    phrase: r.phrase.clone(),
                })
                .collect(),
            category_keywords: config
                .category_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
        }
    }

    /// Expand `query`.
    ///
    /// The first rule with a trigger contained in the normalized query wins.
    /// If the query already names a category, it is returned unchanged.
    pub fn expand(&self, query: &str) -> String {
        let normalized = query.trim().to_lowercase();

        let Some(rule) = self
            .rules
            .iter()
            .find(|r| r.triggers.iter().any(|t| normalized.contains(t.as_str())))
        else {
            return query.to_string();
        };

        if self
            .category_keywords
            .iter()
            .any(|k| normalized.contains(k.as_str()))
        {
            tracing::debug!("Query already names a category, skipping expansion");
            return query.to_string();
        }

        let expanded = format!("{} ({})", query, rule.phrase);
        tracing::debug!("Expanded query: '{}' -> '{}'", query, expanded);
        expanded
    }
}
