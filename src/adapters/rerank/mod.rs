//! [`crate::domain::ports::rerank::RerankProvider`] implementations.

mod external;
mod lexical;
mod llm;

pub use external::{ExternalRerankConfig, ExternalRerankProvider};
pub use lexical::LexicalCrossEncoderProvider;
pub use llm::{LlmRerankConfig, LlmRerankProvider};

/// Truncates `text` to at most `max_chars` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
