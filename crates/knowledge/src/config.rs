//! Namespace configuration management.
//!
//! Each namespace keeps its settings in
//! `.gradus/knowledge/<namespace>/config.yaml`. The embedding dimension is
//! written there on first ingestion and checked on every later open.

use crate::embeddings::EmbeddingConfig;
use crate::types::Namespace;
use gradus_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-namespace settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    pub name: String,

    pub embedding: EmbeddingConfig,

    /// Maximum segment length in characters
    pub chunk_size: usize,

    /// Characters shared between neighbouring segments
    pub chunk_overlap: usize,

    /// Nearest neighbours requested per query
    pub top_k: usize,

    /// Vector hits scoring at or below this are discarded
    pub min_score: f32,

    pub ingest: IngestSettings,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            embedding: EmbeddingConfig::default(),
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 3,
            min_score: 0.5,
            ingest: IngestSettings::default(),
        }
    }
}

/// Throughput and retry limits for ingestion and maintenance deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Segments embedded in parallel
    pub concurrency: usize,

    /// Records per upsert call
    pub upsert_batch_size: usize,

    /// Ids per delete call
    pub delete_batch_size: usize,

    /// Pause between consecutive upsert/delete batches
    pub pacing_ms: u64,

    pub retry: RetrySettings,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            upsert_batch_size: 100,
            delete_batch_size: 100,
            pacing_ms: 500,
            retry: RetrySettings::default(),
        }
    }
}

impl IngestSettings {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

/// Bounded retry with doubling backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts including the first
    pub max_attempts: u32,

    pub initial_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
        }
    }
}

impl NamespaceConfig {
    /// Defaults for a fresh namespace.
    pub fn for_namespace(namespace: &Namespace) -> Self {
        Self {
            name: namespace.to_string(),
            ..Default::default()
        }
    }

    /// Reject settings that cannot work.
    pub fn validate(&self) -> AppResult<()> {
        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(format!(
                "Namespace '{}': embedding dimensions must be positive",
                self.name
            )));
        }
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "Namespace '{}': chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.name, self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(AppError::Config(format!(
                "Namespace '{}': top_k must be positive",
                self.name
            )));
        }
        if self.ingest.concurrency == 0
            || self.ingest.upsert_batch_size == 0
            || self.ingest.delete_batch_size == 0
            || self.ingest.retry.max_attempts == 0
        {
            return Err(AppError::Config(format!(
                "Namespace '{}': ingest concurrency, batch sizes and retry attempts must be positive",
                self.name
            )));
        }
        Ok(())
    }
}

/// Load namespace configuration, or defaults when none is saved yet.
pub fn load_config(workspace: &Path, namespace: &Namespace) -> AppResult<NamespaceConfig> {
    let config_path = get_config_path(workspace, namespace);

    let config = if config_path.exists() {
        let content = fs::read_to_string(&config_path).map_err(|e| {
            AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
        })?;

        let mut config: NamespaceConfig = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
        })?;
        config.name = namespace.to_string();

        tracing::debug!("Loaded namespace config for '{}'", namespace);
        config
    } else {
        tracing::debug!(
            "Using default config for namespace '{}' (no config file found)",
            namespace
        );
        NamespaceConfig::for_namespace(namespace)
    };

    config.validate()?;
    Ok(config)
}

/// Save namespace configuration.
pub fn save_config(workspace: &Path, config: &NamespaceConfig) -> AppResult<()> {
    let namespace = Namespace::new(config.name.clone())?;
    let config_path = get_config_path(workspace, &namespace);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }

    let yaml = serde_yaml::to_string(config)?;
    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Config(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved namespace config for '{}'", config.name);
    Ok(())
}

/// Pin the embedding settings of a namespace.
///
/// The first call persists `requested`; later calls fail if it differs from
/// what was persisted.
pub fn pin_embedding(
    workspace: &Path,
    namespace: &Namespace,
    requested: &EmbeddingConfig,
) -> AppResult<NamespaceConfig> {
    let config_path = get_config_path(workspace, namespace);
    let mut config = load_config(workspace, namespace)?;

    if config_path.exists() {
        config.embedding.validate_consistency(requested).map_err(|e| {
            AppError::Config(format!(
                "Namespace '{}' is pinned to {} ({} dimensions): {}",
                namespace, config.embedding.model, config.embedding.dimensions, e
            ))
        })?;
    } else {
        config.embedding = requested.clone();
        save_config(workspace, &config)?;
    }

    Ok(config)
}

/// Directory holding a namespace's files.
pub fn get_namespace_dir(workspace: &Path, namespace: &Namespace) -> PathBuf {
    workspace
        .join(".gradus")
        .join("knowledge")
        .join(namespace.as_str())
}

/// Path to a namespace's config file.
pub fn get_config_path(workspace: &Path, namespace: &Namespace) -> PathBuf {
    get_namespace_dir(workspace, namespace).join("config.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ns(name: &str) -> Namespace {
        Namespace::new(name).unwrap()
    }

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path(), &ns("company_knowledge")).unwrap();

        assert_eq!(config.name, "company_knowledge");
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.ingest.delete_batch_size, 100);
        assert_eq!(config.ingest.retry.max_attempts, 3);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let mut config = NamespaceConfig::for_namespace(&ns("hr_docs"));
        config.chunk_size = 800;
        config.ingest.pacing_ms = 0;

        save_config(temp.path(), &config).unwrap();

        let loaded = load_config(temp.path(), &ns("hr_docs")).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = get_config_path(temp.path(), &ns("brands"));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "top_k: 5\ningest:\n  pacing_ms: 0\n").unwrap();

        let loaded = load_config(temp.path(), &ns("brands")).unwrap();
        assert_eq!(loaded.top_k, 5);
        assert_eq!(loaded.ingest.pacing_ms, 0);
        assert_eq!(loaded.ingest.upsert_batch_size, 100);
        assert_eq!(loaded.chunk_size, 500);
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        let config = NamespaceConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_pin_embedding_rejects_dimension_change() {
        let temp = TempDir::new().unwrap();
        let namespace = ns("company_knowledge");

        pin_embedding(temp.path(), &namespace, &EmbeddingConfig::default()).unwrap();
        pin_embedding(temp.path(), &namespace, &EmbeddingConfig::default()).unwrap();

        let other = EmbeddingConfig {
            dimensions: 1536,
            ..EmbeddingConfig::default()
        };
        let err = pin_embedding(temp.path(), &namespace, &other).unwrap_err();
        assert!(err.is_fatal());
    }
}
