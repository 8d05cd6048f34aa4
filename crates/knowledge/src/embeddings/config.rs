//! Embedding configuration types.

use gradus_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Embedding configuration for a namespace.
///
/// `dimensions` is fixed for the lifetime of a namespace: every vector stored
/// under it must have exactly this length.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "mock", "ollama", "openai"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Provider-specific settings, e.g. `{"base_url": "..."}`
    #[serde(default = "empty_object")]
    pub provider_config: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::json!({})
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            provider_config: empty_object(),
        }
    }
}

impl EmbeddingConfig {
    /// OpenAI `text-embedding-3-small` (1536 dimensions).
    pub fn openai_small() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            provider_config: empty_object(),
        }
    }

    /// String setting from `provider_config`.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.provider_config.get(key).and_then(|v| v.as_str())
    }

    /// Validate that another config is consistent with this one.
    ///
    /// Switching model or dimension under an existing namespace would mix
    /// incompatible vectors, so any difference is a configuration error.
    pub fn validate_consistency(&self, other: &Self) -> AppResult<()> {
        if self.provider != other.provider {
            return Err(AppError::Config(format!(
                "Provider mismatch: expected '{}', got '{}'",
                self.provider, other.provider
            )));
        }

        if self.model != other.model {
            return Err(AppError::Config(format!(
                "Model mismatch: expected '{}', got '{}'",
                self.model, other.model
            )));
        }

        if self.dimensions != other.dimensions {
            return Err(AppError::Config(format!(
                "Dimension mismatch: expected {}, got {}",
                self.dimensions, other.dimensions
            )));
        }

        Ok(())
    }
}
