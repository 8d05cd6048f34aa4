//! OpenAI embeddings API provider.

use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use gradus_core::{AppError, AppResult};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Inputs longer than this are cut before sending.
pub const MAX_INPUT_CHARS: usize = 8000;

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Provider for `/v1/embeddings` compatible endpoints.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiProvider {
    pub fn new(config: &EmbeddingConfig, api_key: &str) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client for OpenAI: {}", e)))?;

        let base_url = config
            .setting("base_url")
            .unwrap_or(DEFAULT_OPENAI_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Arc::new(client),
            base_url,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

/// Cut text to at most `MAX_INPUT_CHARS` characters.
pub fn truncate_input(text: &str) -> String {
    text.chars().take(MAX_INPUT_CHARS).collect()
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "openai", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbedRequest {
            model: &self.model,
            input: texts.iter().map(|t| truncate_input(t)).collect(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::EmbeddingProvider(format!("OpenAI request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Config(
                "OpenAI rejected the API key (401 Unauthorized)".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EmbeddingProvider(format!(
                "OpenAI API error ({}): {}",
                status, body
            )));
        }

        let mut body: EmbedResponse = response.json().await.map_err(|e| {
            AppError::EmbeddingProvider(format!("Failed to parse OpenAI response: {}", e))
        })?;

        if body.data.len() != texts.len() {
            return Err(AppError::EmbeddingProvider(format!(
                "OpenAI returned {} embeddings for {} inputs",
                body.data.len(),
                texts.len()
            )));
        }

        body.data.sort_by_key(|d| d.index);
        debug!("Received {} embeddings", body.data.len());

        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_input_counts_chars() {
        let long = "ї".repeat(MAX_INPUT_CHARS + 10);
        assert_eq!(truncate_input(&long).chars().count(), MAX_INPUT_CHARS);
        assert_eq!(truncate_input("short"), "short");
    }

    #[test]
    fn test_debug_hides_api_key() {
        let provider = OpenAiProvider::new(&EmbeddingConfig::openai_small(), "sk-secret").unwrap();
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("text-embedding-3-small"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_provider_error() {
        let config = EmbeddingConfig {
            provider_config: serde_json::json!({"base_url": "http://127.0.0.1:9/v1"}),
            ..EmbeddingConfig::openai_small()
        };
        let provider = OpenAiProvider::new(&config, "sk-test").unwrap();

        let result = provider.embed("Торговий Дім АВ").await;
        assert!(matches!(result, Err(AppError::EmbeddingProvider(_))));
    }
}
