use super::{chars, to_string, ChunkerConfig};
use crate::domain::error::Result;
use crate::domain::ports::chunker::{Chunker, TextChunk};

/// Sliding window over `chunk_size` characters, stepping back by `chunk_overlap` characters
/// between windows.
pub struct FixedSizeChunker {
    config: ChunkerConfig,
}

impl FixedSizeChunker {
    /// Build a chunker from its configuration.
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, text: &str) -> Result<Vec<TextChunk>> {
        let chars = chars(text);
        if chars.is_empty() {
            return Ok(Vec::new());
        }

        let size = self.config.chunk_size.max(1);
        let overlap = self.config.chunk_overlap.min(size.saturating_sub(1));

        let mut out = Vec::new();
        let mut start = 0usize;

        while start < chars.len() {
            let end = (start + size).min(chars.len());
            let content = to_string(&chars[start..end]);

            if content.trim().chars().count() > self.config.min_chunk_size {
                out.push(TextChunk {
                    content,
                    start_char: start,
                    end_char: end,
                });
            }

            if end == chars.len() {
                break;
            }
            start = end - overlap;
        }

        Ok(out)
    }

    fn strategy_name(&self) -> &'static str {
        "fixed_size"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(size: usize, overlap: usize) -> ChunkerConfig {
        ChunkerConfig {
            chunk_size: size,
            chunk_overlap: overlap,
            min_chunk_size: 0,
            ..ChunkerConfig::default()
        }
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = FixedSizeChunker::new(cfg(10, 2));
        assert!(chunker.chunk("").unwrap().is_empty());
    }

    #[test]
    fn windows_cover_the_whole_input_with_overlap() {
        let text = "abcdefghij";
        let chunker = FixedSizeChunker::new(cfg(4, 1));
        let chunks = chunker.chunk(text).unwrap();
        assert_eq!(chunks[0].content, "abcd");
        assert_eq!(chunks[1].start_char, 3);
        assert_eq!(chunks.last().unwrap().end_char, text.chars().count());
    }

    #[test]
    fn final_short_window_is_still_returned() {
        let text = "abcdefg";
        let chunker = FixedSizeChunker::new(cfg(4, 0));
        let chunks = chunker.chunk(text).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].content, "efg");
    }
}
