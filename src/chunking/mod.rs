//! Text splitting strategies implementing [`crate::domain::ports::chunker::Chunker`].
//!
//! Three strategies are available, selected per knowledge base via [`ChunkerConfig::strategy`]:
//! fixed-size sliding window, recursive separator splitting (the default), and paragraph/sentence
//! aware semantic splitting. All three operate on `char` offsets, not bytes, so `start_char`/
//! `end_char` stay correct for multi-byte text.

mod fixed;
mod recursive;
mod semantic;

pub use fixed::FixedSizeChunker;
pub use recursive::RecursiveChunker;
pub use semantic::SemanticChunker;

use crate::domain::ports::chunker::Chunker;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which [`Chunker`] implementation a knowledge base uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    /// Sliding window of `chunk_size` characters with `chunk_overlap` characters repeated
    /// between consecutive chunks.
    FixedSize,
    /// Recursively split on a separator list, then greedily merge adjacent pieces up to
    /// `chunk_size`. The default: respects natural text boundaries while still hitting a
    /// target size.
    Recursive,
    /// Split on paragraph boundaries first, falling back to sentence boundaries for any
    /// paragraph longer than `chunk_size`.
    Semantic,
}

impl Default for ChunkStrategy {
    fn default() -> Self {
        Self::Recursive
    }
}

/// Tunables shared by all three strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Which strategy to build.
    pub strategy: ChunkStrategy,
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks, in characters. Ignored by [`SemanticChunker`].
    pub chunk_overlap: usize,
    /// Separator list for [`RecursiveChunker`], tried in order, most coarse first. An empty
    /// string as the last entry means "split by character" as a last resort.
    pub separators: Vec<String>,
    /// Chunks at or below this many characters, after trimming, are dropped rather than
    /// returned (they carry too little signal to embed usefully).
    pub min_chunk_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::default(),
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: default_separators(),
            min_chunk_size: 1,
        }
    }
}

/// The separator ladder used by [`RecursiveChunker`]: paragraph breaks first, then line breaks,
/// then CJK and Latin sentence punctuation, then whitespace, then individual characters.
pub fn default_separators() -> Vec<String> {
    [
        "\n\n", "\n", "。", ".", "！", "!", "？", "?", "；", ";", " ", "",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Builds the [`Chunker`] selected by a [`ChunkerConfig`].
pub fn build_chunker(config: ChunkerConfig) -> Arc<dyn Chunker> {
    match config.strategy {
        ChunkStrategy::FixedSize => Arc::new(FixedSizeChunker::new(config)),
        ChunkStrategy::Recursive => Arc::new(RecursiveChunker::new(config)),
        ChunkStrategy::Semantic => Arc::new(SemanticChunker::new(config)),
    }
}

/// Splits `text` into a `Vec<char>` once so strategies can slice by character index cheaply.
pub(crate) fn chars(text: &str) -> Vec<char> {
    text.chars().collect()
}

pub(crate) fn to_string(chars: &[char]) -> String {
    chars.iter().collect()
}
