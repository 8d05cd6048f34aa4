//! Ingest command handler.

use clap::Args;
use gradus_core::{config::AppConfig, AppError, AppResult};
use gradus_knowledge::{
    EmbeddingConfig, IngestOptions, MetadataTemplate, Namespace, ProgressEvent, ProgressReporter,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Chunk, embed and store source files in a namespace
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Target namespace
    pub namespace: String,

    /// Files or directories to ingest
    #[arg(long, required = true)]
    pub path: Vec<PathBuf>,

    /// Canonical URL of the source (single file only)
    #[arg(long)]
    pub url: Option<String>,

    /// Brand or tag stored with every chunk
    #[arg(long, default_value = "")]
    pub brand: String,

    /// Content type stored with every chunk
    #[arg(long, default_value = "general")]
    pub content_type: String,

    /// Source type stored with every chunk
    #[arg(long, default_value = "manual")]
    pub source_type: String,

    /// Embedding provider for a new namespace (mock, ollama, openai)
    #[arg(long)]
    pub provider: Option<String>,

    /// Embedding model for a new namespace
    #[arg(long)]
    pub model: Option<String>,

    /// Embedding dimensions for a new namespace
    #[arg(long)]
    pub dimensions: Option<usize>,

    /// Print progress events to stderr
    #[arg(long)]
    pub progress: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    fn embedding(&self) -> AppResult<Option<EmbeddingConfig>> {
        let Some(provider) = self.provider.as_deref() else {
            if self.model.is_some() || self.dimensions.is_some() {
                return Err(AppError::Config(
                    "--model and --dimensions require --provider".to_string(),
                ));
            }
            return Ok(None);
        };

        let mut embedding = match provider {
            "openai" => EmbeddingConfig::openai_small(),
            "ollama" => EmbeddingConfig {
                provider: "ollama".to_string(),
                model: "nomic-embed-text".to_string(),
                dimensions: 768,
                ..EmbeddingConfig::default()
            },
            "mock" => EmbeddingConfig::default(),
            other => {
                return Err(AppError::Config(format!(
                    "Unknown embedding provider: '{}'. Supported providers: mock, ollama, openai",
                    other
                )))
            }
        };

        if let Some(model) = &self.model {
            embedding.model = model.clone();
        }
        if let Some(dimensions) = self.dimensions {
            embedding.dimensions = dimensions;
        }
        Ok(Some(embedding))
    }

    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for namespace '{}'", self.namespace);

        let options = IngestOptions {
            namespace: Namespace::new(self.namespace.clone())?,
            paths: self.path.clone(),
            url: self.url.clone(),
            template: MetadataTemplate::new(
                self.brand.clone(),
                self.content_type.clone(),
                self.source_type.clone(),
            ),
            embedding: self.embedding()?,
        };

        let progress = if self.progress {
            ProgressReporter::new(Arc::new(|event: ProgressEvent| {
                eprintln!("{}", event.format_simple());
            }))
        } else {
            ProgressReporter::noop()
        };

        let store = gradus_knowledge::open_store(config)?;
        let stats = gradus_knowledge::ingest(
            &config.workspace,
            store,
            options,
            config.api_key.as_deref(),
            progress,
        )
        .await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!(
                "Ingested {} of {} segments into '{}' in {:.2}s",
                stats.succeeded, stats.total, self.namespace, stats.duration_secs
            );
            if stats.failed > 0 {
                println!("  Failed: {}", stats.failed);
                for failure in &stats.failures {
                    println!("  - {}: {}", failure.chunk_id, failure.reason);
                }
            }
        }

        Ok(())
    }
}
