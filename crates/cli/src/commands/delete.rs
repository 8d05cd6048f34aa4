//! Delete command handler.

use clap::Args;
use gradus_core::{config::AppConfig, AppError, AppResult};
use gradus_knowledge::{DeleteTarget, MetadataFilter, Namespace, ProgressReporter};

/// Remove records from a namespace by id or metadata
#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Namespace to delete from
    pub namespace: String,

    /// Chunk ids to delete
    #[arg(long, conflicts_with_all = ["source_type", "brand"])]
    pub id: Vec<String>,

    /// Delete chunks with any of these source types
    #[arg(long)]
    pub source_type: Vec<String>,

    /// Delete chunks with any of these brands
    #[arg(long)]
    pub brand: Vec<String>,
}

impl DeleteCommand {
    fn target(&self) -> AppResult<DeleteTarget> {
        if !self.id.is_empty() {
            return Ok(DeleteTarget::Ids(self.id.clone()));
        }

        let mut filter = MetadataFilter::new();
        if !self.source_type.is_empty() {
            filter = filter.any_of("source_type", self.source_type.clone());
        }
        if !self.brand.is_empty() {
            filter = filter.any_of("brand", self.brand.clone());
        }

        if filter.is_empty() {
            return Err(AppError::Config(
                "Specify --id, --source-type or --brand".to_string(),
            ));
        }
        Ok(DeleteTarget::Filter(filter))
    }

    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing delete command for namespace '{}'", self.namespace);

        let namespace = Namespace::new(self.namespace.clone())?;
        let target = self.target()?;

        let store = gradus_knowledge::open_store(config)?;
        let deleted = gradus_knowledge::delete(
            &config.workspace,
            store,
            &namespace,
            target,
            config.api_key.as_deref(),
            ProgressReporter::noop(),
        )
        .await?;

        println!("Deleted {} records from '{}'", deleted, self.namespace);
        Ok(())
    }
}
