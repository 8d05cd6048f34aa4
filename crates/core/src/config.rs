//! Application configuration.
//!
//! Configuration is merged from several sources, lowest precedence first:
//! - Built-in defaults
//! - Config file (`.gradus/config.yaml` in the workspace)
//! - Environment variables
//! - Command-line flags
//!
//! Per-namespace knowledge settings live next to each namespace under
//! `.gradus/knowledge/<namespace>/` and are owned by the knowledge crate.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Which vector store implementation backs the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Persistent SQLite file in the workspace
    Sqlite,
    /// Process-local store, lost on exit
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> AppResult<Self> {
        match value.to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(AppError::Config(format!(
                "Unknown vector store backend: {}. Supported: sqlite, memory",
                other
            ))),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .gradus/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// API key for the embedding provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Vector store backend
    pub store_backend: StoreBackend,

    /// Vector store file (sqlite backend); defaults to `.gradus/vectors.sqlite`
    pub store_path: Option<PathBuf>,

    /// Document catalog file; defaults to `.gradus/catalog.sqlite`
    pub catalog_path: Option<PathBuf>,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceSection>,
    logging: Option<LoggingSection>,
    store: Option<StoreSection>,
    catalog: Option<CatalogSection>,
    #[serde(rename = "apiKeyEnv")]
    api_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreSection {
    backend: Option<String>,
    path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogSection {
    path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            store_backend: StoreBackend::Sqlite,
            store_path: None,
            catalog_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and environment variables.
    ///
    /// Environment variables:
    /// - `GRADUS_WORKSPACE`: Override workspace path
    /// - `GRADUS_CONFIG`: Path to config file
    /// - `GRADUS_API_KEY`: Embedding provider API key
    /// - `GRADUS_STORE`: Vector store backend (`sqlite` or `memory`)
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("GRADUS_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("GRADUS_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.gradus_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(key) = std::env::var("GRADUS_API_KEY") {
            config.api_key = Some(key);
        }

        if let Ok(backend) = std::env::var("GRADUS_STORE") {
            config.store_backend = StoreBackend::parse(&backend)?;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(store) = config_file.store {
            if let Some(backend) = store.backend {
                result.store_backend = StoreBackend::parse(&backend)?;
            }
            if let Some(path) = store.path {
                result.store_path = Some(PathBuf::from(path));
            }
        }

        if let Some(path) = config_file.catalog.and_then(|c| c.path) {
            result.catalog_path = Some(PathBuf::from(path));
        }

        if let Some(env_var) = config_file.api_key_env {
            if let Ok(key) = std::env::var(&env_var) {
                result.api_key = Some(key);
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and files.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .gradus directory.
    pub fn gradus_dir(&self) -> PathBuf {
        self.workspace.join(".gradus")
    }

    /// Ensure the .gradus directory exists.
    pub fn ensure_gradus_dir(&self) -> AppResult<()> {
        let gradus_dir = self.gradus_dir();
        if !gradus_dir.exists() {
            std::fs::create_dir_all(&gradus_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .gradus directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolved vector store file path.
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| self.gradus_dir().join("vectors.sqlite"))
    }

    /// Resolved document catalog file path.
    pub fn resolved_catalog_path(&self) -> PathBuf {
        self.catalog_path
            .clone()
            .unwrap_or_else(|| self.gradus_dir().join("catalog.sqlite"))
    }
}
