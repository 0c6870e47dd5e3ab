use super::ChunkerConfig;
use crate::domain::error::Result;
use crate::domain::ports::chunker::{Chunker, TextChunk};

/// Recursively splits on a separator ladder (paragraph, line, sentence, word, character),
/// subdividing any piece still larger than `chunk_size`, then greedily merges adjacent pieces
/// back up to `chunk_size` with `chunk_overlap` characters carried into the next merged chunk.
///
/// This is the default strategy: it respects natural text boundaries far more often than
/// [`super::FixedSizeChunker`] while still producing chunks close to the target size.
pub struct RecursiveChunker {
    config: ChunkerConfig,
}

impl RecursiveChunker {
    /// Build a chunker from its configuration.
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    fn split_recursive<'a>(&self, text: &'a str, separators: &[String]) -> Vec<String> {
        let Some((separator, rest)) = separators.split_first() else {
            return vec![text.to_string()];
        };

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            let parts: Vec<&str> = text.split(separator.as_str()).collect();
            let last = parts.len() - 1;
            parts
                .into_iter()
                .enumerate()
                .filter_map(|(i, part)| {
                    if i < last {
                        Some(format!("{part}{separator}"))
                    } else if !part.is_empty() {
                        Some(part.to_string())
                    } else {
                        None
                    }
                })
                .collect()
        };

        let mut out = Vec::new();
        for piece in pieces {
            if piece.chars().count() > self.config.chunk_size && !rest.is_empty() {
                out.extend(self.split_recursive(&piece, rest));
            } else {
                out.push(piece);
            }
        }
        out
    }

    fn merge_splits(&self, splits: Vec<String>) -> Vec<String> {
        let mut merged = Vec::new();
        let mut current = String::new();

        for split in splits {
            if current.is_empty() {
                current = split;
                continue;
            }

            let combined_len = current.chars().count() + split.chars().count();
            if combined_len <= self.config.chunk_size {
                current.push_str(&split);
            } else {
                if !current.trim().is_empty() {
                    merged.push(current.trim().to_string());
                }
                current = if self.config.chunk_overlap > 0 {
                    let overlap: String = tail_chars(&current, self.config.chunk_overlap);
                    overlap + &split
                } else {
                    split
                };
            }
        }

        if !current.trim().is_empty() {
            merged.push(current.trim().to_string());
        }
        merged
    }
}

/// The last `n` characters of `s`, empty if `s` has fewer than `n`.
fn tail_chars(s: &str, n: usize) -> String {
    let total = s.chars().count();
    let skip = total.saturating_sub(n);
    s.chars().skip(skip).collect()
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str) -> Result<Vec<TextChunk>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let splits = self.split_recursive(text, &self.config.separators);
        let merged = self.merge_splits(splits);

        let mut out = Vec::new();
        let mut byte_cursor = 0usize;

        for content in merged {
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
        "recursive"
    }
}
