//! Query-time grounding.
//!
//! A user query is expanded with brand context, then semantic retrieval and
//! structured catalog matching run side by side. Their hits are fused into a
//! bounded [`GroundedContext`](crate::types::GroundedContext) and rendered as
//! citations for the generation step.

pub mod citation;
pub mod config;
pub mod expansion;
pub mod fusion;
pub mod grounding;
pub mod matcher;
pub mod retriever;

pub use citation::CitationFormatter;
pub use config::{ExpansionRule, GroundingConfig};
pub use expansion::QueryExpander;
pub use fusion::fuse;
pub use grounding::{GroundingOutcome, GroundingService};
pub use matcher::{extract_document_numbers, topic_keywords, StructuredMatcher};
pub use retriever::VectorRetriever;
