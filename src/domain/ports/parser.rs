//! Byte-to-text document extraction.

use crate::domain::error::Result;
use async_trait::async_trait;

/// One logical page/section of a parsed document. Plain-text and Markdown files always produce
/// exactly one page; PDFs produce one page per physical page; DOCX/XLSX produce one virtual page
/// per heading-1 section / worksheet respectively.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// Zero-based page index.
    pub index: u32,
    /// Extracted plain text for this page.
    pub text: String,
}

/// The result of parsing one document's raw bytes.
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    /// All pages in order. Concatenating `text` fields with `"\n\n"` yields the document's full
    /// extracted text for chunking.
    pub pages: Vec<ParsedPage>,
    /// Extractor-reported metadata (e.g. PDF creation date, DOCX author), opportunistic only.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ParsedDocument {
    /// The full extracted text, pages joined by a blank line.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// True if every page is empty or whitespace-only.
    pub fn is_empty_extraction(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }
}

/// Extracts plain text from one file format.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    /// Parse raw bytes into text pages. Implementations must not perform I/O beyond decoding
    /// the given buffer (the blob is already resident in memory by the time parsing starts).
    async fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument>;

    /// Lower-cased file extensions this parser claims, without the leading dot (e.g. `"pdf"`).
    fn extensions(&self) -> &[&'static str];

    /// Stable identifier, e.g. `"text"`, `"pdf"`, `"docx"`.
    fn parser_name(&self) -> &'static str;
}

/// Looks up a [`DocumentParser`] by file extension.
pub trait ParserRegistry: Send + Sync {
    /// Resolve the parser registered for a lower-cased extension, if any.
    fn resolve(&self, extension: &str) -> Option<std::sync::Arc<dyn DocumentParser>>;
}
