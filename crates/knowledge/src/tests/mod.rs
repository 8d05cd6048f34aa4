//! Cross-module flow tests.

mod grounding_flow;
mod ingestion;
