//! Metadata predicates for filtered queries and deletes.

use crate::types::ChunkMetadata;
use serde::{Deserialize, Serialize};

/// One condition on a metadata field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Field equals the value
    Eq(String),
    /// Field equals any of the values
    In(Vec<String>),
}

impl Condition {
    fn matches(&self, value: &str) -> bool {
        match self {
            Condition::Eq(expected) => expected == value,
            Condition::In(options) => options.iter().any(|o| o == value),
        }
    }
}

/// Conjunction of field conditions. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub conditions: Vec<(String, Condition)>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions
            .push((field.into(), Condition::Eq(value.into())));
        self
    }

    /// Require `field` to be one of `values`.
    pub fn any_of<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditions.push((
            field.into(),
            Condition::In(values.into_iter().map(Into::into).collect()),
        ));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Unknown fields never match.
    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        self.conditions.iter().all(|(field, condition)| {
            metadata
                .field(field)
                .is_some_and(|value| condition.matches(&value))
        })
    }
}
