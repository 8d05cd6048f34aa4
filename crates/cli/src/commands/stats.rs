//! Stats command handler.

use clap::Args;
use gradus_core::{config::AppConfig, AppResult};

/// Show vector store statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let store = gradus_knowledge::open_store(config)?;
        let stats = store.describe_stats().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Vectors: {}", stats.total_vector_count);
            for (name, namespace) in &stats.namespaces {
                println!(
                    "  {}: {} vectors ({} dimensions)",
                    name, namespace.vector_count, namespace.dimension
                );
            }
        }

        Ok(())
    }
}
