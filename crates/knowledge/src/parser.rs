//! Source file parsing and text extraction.

use crate::types::SourceDocument;
use gradus_core::{AppError, AppResult};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Page elements that never carry article content.
static BOILERPLATE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["script", "style", "nav", "footer", "header"]
        .iter()
        .filter_map(|tag| compile(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")))
        .collect()
});

static TAG: LazyLock<Option<Regex>> = LazyLock::new(|| compile(r"(?s)<[^>]*>"));

fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .map_err(|e| tracing::error!("Invalid HTML pattern {:?}: {}", pattern, e))
        .ok()
}

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    Html,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            Some("txt") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::PlainText => "text",
            Self::Unknown => "unknown",
        }
    }
}

/// Parse a source file and extract clean text.
pub fn parse_file(path: &Path) -> AppResult<String> {
    let raw = fs::read(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    if raw.contains(&0) {
        tracing::warn!("Skipping likely binary file: {:?}", path);
        return Err(AppError::Knowledge(format!(
            "Binary file not supported: {:?}",
            path
        )));
    }

    let raw = String::from_utf8(raw)
        .map_err(|e| AppError::Knowledge(format!("File {:?} is not UTF-8: {}", path, e)))?;

    let cleaned = match ContentType::from_path(path) {
        ContentType::Markdown => clean_markdown(&raw),
        ContentType::Html => clean_html(&raw),
        ContentType::PlainText | ContentType::Unknown => raw.trim().to_string(),
    };

    Ok(cleaned)
}

/// Read a file into a source document.
///
/// The id is derived from `url` when given, otherwise from the file path, so
/// re-ingesting the same file overwrites its chunks.
pub fn load_source(path: &Path, url: Option<&str>) -> AppResult<SourceDocument> {
    let text = parse_file(path)?;
    let source_url = url
        .map(str::to_string)
        .unwrap_or_else(|| path.to_string_lossy().to_string());
    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(SourceDocument::from_url(source_url, title, text))
}

/// Strip markdown headings, rules and code fences.
pub fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim_start_matches('#').trim();

        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(trimmed);
            result.push('\n');
        }
    }

    result.trim().to_string()
}

/// Strip boilerplate elements and tags from HTML, then collapse whitespace.
pub fn clean_html(html: &str) -> String {
    let mut text = html.to_string();
    for pattern in BOILERPLATE.iter() {
        text = pattern.replace_all(&text, " ").into_owned();
    }

    if let Some(tag) = TAG.as_ref() {
        text = tag.replace_all(&text, " ").into_owned();
    }

    let text = text
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
