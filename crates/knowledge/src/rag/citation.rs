//! Citation rendering for a grounded context.

use crate::types::GroundedContext;

pub const DEFAULT_HEADER: &str = "📚 Документи:";

/// Renders a context as a header line and one bullet per hit.
#[derive(Debug, Clone)]
pub struct CitationFormatter {
    header: String,
}

impl Default for CitationFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER)
    }
}

impl CitationFormatter {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }

    /// Empty context renders as an empty string.
    pub fn format(&self, context: &GroundedContext) -> String {
        if context.is_empty() {
            return String::new();
        }

        let mut lines = Vec::with_capacity(context.len() + 1);
        lines.push(self.header.clone());
        for hit in &context.hits {
            let url = hit.reference_url();
            if url.is_empty() {
                lines.push(format!("• {}", hit.display_title()));
            } else {
                lines.push(format!("• {}\n  {}", hit.display_title(), url));
            }
        }
        lines.join("\n")
    }
}
