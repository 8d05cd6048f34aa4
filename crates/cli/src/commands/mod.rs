//! Command handlers for the gradus CLI.

pub mod catalog;
pub mod delete;
pub mod ground;
pub mod ingest;
pub mod stats;

pub use catalog::CatalogCommand;
pub use delete::DeleteCommand;
pub use ground::GroundCommand;
pub use ingest::IngestCommand;
pub use stats::StatsCommand;
