//! Catalog command handler.
//!
//! Seeds the document catalog consulted by grounding.

use clap::{Args, Subcommand};
use gradus_core::{config::AppConfig, AppError, AppResult};
use gradus_knowledge::DocumentRecord;
use std::path::PathBuf;

/// Document catalog management
#[derive(Args, Debug)]
pub struct CatalogCommand {
    #[command(subcommand)]
    pub action: CatalogAction,
}

#[derive(Subcommand, Debug)]
pub enum CatalogAction {
    /// Import document records from a YAML file
    Import(CatalogImportCommand),
}

/// Import document records
#[derive(Args, Debug)]
pub struct CatalogImportCommand {
    /// YAML file with a list of document records
    pub file: PathBuf,
}

impl CatalogImportCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing catalog import from {:?}", self.file);

        let content = std::fs::read_to_string(&self.file).map_err(|e| {
            AppError::Config(format!("Failed to read {:?}: {}", self.file, e))
        })?;
        let records: Vec<DocumentRecord> = serde_yaml::from_str(&content)?;

        let catalog = gradus_knowledge::open_catalog(config)?;
        let imported = catalog.import_records(records).await?;

        println!(
            "Imported {} documents into {:?}",
            imported,
            config.resolved_catalog_path()
        );
        Ok(())
    }
}

impl CatalogCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            CatalogAction::Import(cmd) => cmd.execute(config).await,
        }
    }
}
