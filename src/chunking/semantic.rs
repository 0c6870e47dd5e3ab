use super::ChunkerConfig;
use crate::domain::error::Result;
use crate::domain::ports::chunker::{Chunker, TextChunk};
use regex::Regex;
use std::sync::OnceLock;

/// Splits on paragraph boundaries (blank lines); any paragraph still over `chunk_size` is
/// further split into sentences and those sentences greedily merged back up to `chunk_size`.
/// Ignores `chunk_overlap` — semantic boundaries are considered a strong enough cue that
/// repeating text across chunks isn't needed.
pub struct SemanticChunker {
    config: ChunkerConfig,
}

impl SemanticChunker {
    /// Build a chunker from its configuration.
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    fn paragraphs(text: &str) -> Vec<&str> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"\n\s*\n").unwrap());
        re.split(text).map(str::trim).filter(|p| !p.is_empty()).collect()
    }

    fn sentences(text: &str) -> Vec<String> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"([。！？.!?]+)").unwrap());

        let mut sentences = Vec::new();
        let mut last_end = 0;
        let mut pending = String::new();

        for m in re.find_iter(text) {
            pending.push_str(&text[last_end..m.end()]);
            let trimmed = pending.trim().to_string();
            if !trimmed.is_empty() {
                sentences.push(trimmed);
            }
            pending.clear();
            last_end = m.end();
        }
        let tail = text[last_end..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }
        sentences
    }

    fn merge_sentences(&self, sentences: Vec<String>) -> Vec<String> {
        let mut merged = Vec::new();
        let mut current = String::new();

        for sentence in sentences {
            if current.is_empty() {
                current = sentence;
                continue;
            }
            let combined_len = current.chars().count() + sentence.chars().count() + 1;
            if combined_len <= self.config.chunk_size {
                current.push(' ');
                current.push_str(&sentence);
            } else {
                if !current.trim().is_empty() {
                    merged.push(current.trim().to_string());
                }
                current = sentence;
            }
        }
        if !current.trim().is_empty() {
            merged.push(current.trim().to_string());
        }
        merged
    }
}

impl Chunker for SemanticChunker {
    fn chunk(&self, text: &str) -> Result<Vec<TextChunk>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let mut pieces = Vec::new();
        for para in Self::paragraphs(text) {
            if para.chars().count() <= self.config.chunk_size {
                pieces.push(para.to_string());
            } else {
                let sentences = Self::sentences(para);
                pieces.extend(self.merge_sentences(sentences));
            }
        }

        let mut out = Vec::new();
        let mut byte_cursor = 0usize;

        for content in pieces {
            if content.chars().count() <= self.config.min_chunk_size {
                continue;
            }
            let byte_start = text[byte_cursor..]
                .find(content.as_str())
                .map(|rel| byte_cursor + rel)
                .unwrap_or(byte_cursor);
            let byte_end = byte_start + content.len();
            let start_char = text[..byte_start].chars().count();
            let end_char = start_char + content.chars().count();

            out.push(TextChunk {
                content,
                start_char,
                end_char,
            });
            byte_cursor = byte_end;
        }

        Ok(out)
    }

    fn strategy_name(&self) -> &'static str {
        "semantic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(size: usize) -> ChunkerConfig {
        ChunkerConfig {
            chunk_size: size,
            min_chunk_size: 0,
            ..ChunkerConfig::default()
        }
    }

    #[test]
    fn short_paragraphs_become_single_chunks() {
        let text = "one.\n\ntwo.\n\nthree.";
        let chunker = SemanticChunker::new(cfg(1000));
        let chunks = chunker.chunk(text).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "one.");
    }

    #[test]
    fn long_paragraph_falls_back_to_sentence_merging() {
        let sentence = "the quick brown fox jumps over the lazy dog. ".repeat(20);
        let chunker = SemanticChunker::new(cfg(100));
        let chunks = chunker.chunk(&sentence).unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.content.chars().count() <= 150));
    }
}
