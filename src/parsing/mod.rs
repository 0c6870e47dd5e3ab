//! Byte-to-text extraction for every file type the platform accepts.

mod docx;
mod html;
mod pdf;
mod text;
mod xlsx;

pub use docx::DocxParser;
pub use html::HtmlParser;
pub use pdf::PdfParser;
pub use text::TextParser;
pub use xlsx::XlsxParser;

use crate::domain::ports::parser::{DocumentParser, ParserRegistry as ParserRegistryPort};
use std::collections::HashMap;
use std::sync::Arc;

/// Extension-keyed lookup table of [`DocumentParser`]s, built once at startup from the parsers
/// each knowledge base is allowed to use.
pub struct DefaultParserRegistry {
    by_extension: HashMap<&'static str, Arc<dyn DocumentParser>>,
}

impl DefaultParserRegistry {
    /// An empty registry with nothing registered.
    pub fn new() -> Self {
        Self {
            by_extension: HashMap::new(),
        }
    }

    /// Register a parser under every extension it claims, last registration for a given
    /// extension wins.
    pub fn register(&mut self, parser: Arc<dyn DocumentParser>) {
        for ext in parser.extensions() {
            self.by_extension.insert(ext, parser.clone());
        }
    }

    /// A registry with the built-in text/HTML/PDF/DOCX/XLSX parsers registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TextParser));
        registry.register(Arc::new(HtmlParser));
        registry.register(Arc::new(PdfParser));
        registry.register(Arc::new(DocxParser));
        registry.register(Arc::new(XlsxParser));
        registry
    }
}

impl Default for DefaultParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ParserRegistryPort for DefaultParserRegistry {
    fn resolve(&self, extension: &str) -> Option<Arc<dyn DocumentParser>> {
        self.by_extension.get(extension.to_lowercase().as_str()).cloned()
    }
}
