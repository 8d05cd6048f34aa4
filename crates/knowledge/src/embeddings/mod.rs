//! Embedding layer.
//!
//! [`Embedder`] wraps a provider and enforces the namespace dimension: a
//! vector of any other length is a configuration error, never stored.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use gradus_core::{AppError, AppResult};
use std::sync::Arc;

/// Text to fixed-dimension vector, bound to one namespace's dimension.
#[derive(Debug, Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    dimensions: usize,
}

impl Embedder {
    /// Bind a provider to the expected dimension `D`.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, dimensions: usize) -> AppResult<Self> {
        if dimensions == 0 {
            return Err(AppError::Config("Embedding dimension must be positive".to_string()));
        }

        if provider.dimensions() != dimensions {
            return Err(AppError::Config(format!(
                "Embedding provider '{}' ({}) produces {} dimensions, namespace expects {}",
                provider.provider_name(),
                provider.model_name(),
                provider.dimensions(),
                dimensions
            )));
        }

        Ok(Self {
            provider,
            dimensions,
        })
    }

    /// Build the provider described by `config` and bind it.
    pub fn from_config(config: &EmbeddingConfig, api_key: Option<&str>) -> AppResult<Self> {
        let provider = create_provider(config, api_key)?;
        Self::new(provider, config.dimensions)
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    /// Embed a single text.
    pub async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let vector = self.provider.embed(text).await?;
        self.check(&vector)?;
        Ok(vector)
    }

    fn check(&self, vector: &[f32]) -> AppResult<()> {
        if vector.len() != self.dimensions {
            return Err(AppError::Config(format!(
                "Embedding dimension mismatch: got {}, namespace expects {}",
                vector.len(),
                self.dimensions
            )));
        }
        Ok(())
    }
}
