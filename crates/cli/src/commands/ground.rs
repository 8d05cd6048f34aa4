//! Ground command handler.

use clap::Args;
use gradus_core::{config::AppConfig, AppResult};
use gradus_knowledge::{GroundRequest, MetadataFilter, Namespace};

/// Build grounding context for a query
#[derive(Args, Debug)]
pub struct GroundCommand {
    /// Namespace to retrieve from
    pub namespace: String,

    /// User query
    pub query: String,

    /// Candidate answer scanned for document references
    #[arg(long, default_value = "")]
    pub answer: String,

    /// Only retrieve chunks with this content type
    #[arg(long)]
    pub content_type: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl GroundCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ground command for namespace '{}'", self.namespace);

        let request = GroundRequest {
            namespace: Namespace::new(self.namespace.clone())?,
            query: self.query.clone(),
            candidate_answer: self.answer.clone(),
            filter: self
                .content_type
                .as_ref()
                .map(|kind| MetadataFilter::new().eq("content_type", kind.clone())),
        };

        let store = gradus_knowledge::open_store_for_grounding(config)?;
        let catalog = gradus_knowledge::open_catalog_for_grounding(config)?;
        let outcome = gradus_knowledge::ground(
            &config.workspace,
            store,
            catalog,
            request,
            config.api_key.as_deref(),
        )
        .await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            println!("Query: {}", outcome.expanded_query);
            if outcome.context.is_empty() {
                println!("No grounding found");
            } else {
                println!();
                println!("{}", outcome.rendered);
            }
        }

        Ok(())
    }
}
