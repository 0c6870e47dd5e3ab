use crate::domain::error::Result;
use crate::domain::ports::keyword_index::{KeywordIndexProvider, KeywordSearchHit};
use crate::domain::types::SearchFilters;
use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

#[derive(Clone)]
struct IndexedChunk {
    document_id: Uuid,
    content: String,
    content_lower: String,
}

/// Naive substring/term-frequency full-text search: no external dependency, used when no
/// dedicated search engine is configured. Scores candidates by counting case-insensitive query
/// term occurrences, which is weak relative to BM25 but has no infrastructure to stand up.
#[derive(Default)]
pub struct SubstringKeywordIndexProvider {
    by_kb: DashMap<Uuid, DashMap<Uuid, IndexedChunk>>,
}

impl SubstringKeywordIndexProvider {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }
}

fn tokenize(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn highlight(content: &str, term: &str, window: usize) -> Option<String> {
    let lower = content.to_lowercase();
    let pos = lower.find(term)?;
    let start = content[..pos].char_indices().rev().take(window).last().map(|(i, _)| i).unwrap_or(0);
    let end = (pos + term.len() + window).min(content.len());
    Some(format!("...{}...", content[start..end].trim()))
}

#[async_trait]
impl KeywordIndexProvider for SubstringKeywordIndexProvider {
    async fn index_chunk(
        &self,
        kb_id: Uuid,
        chunk_id: Uuid,
        document_id: Uuid,
        content: &str,
    ) -> Result<()> {
        let kb_index = self.by_kb.entry(kb_id).or_default();
        kb_index.insert(
            chunk_id,
            IndexedChunk {
                document_id,
                content: content.to_string(),
                content_lower: content.to_lowercase(),
            },
        );
        Ok(())
    }

    async fn remove_chunk(&self, kb_id: Uuid, chunk_id: Uuid) -> Result<()> {
        if let Some(kb_index) = self.by_kb.get(&kb_id) {
            kb_index.remove(&chunk_id);
        }
        Ok(())
    }

    async fn drop_kb(&self, kb_id: Uuid) -> Result<()> {
        self.by_kb.remove(&kb_id);
        Ok(())
    }

    async fn search(
        &self,
        kb_id: Uuid,
        query: &str,
        top_k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<KeywordSearchHit>> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let Some(kb_index) = self.by_kb.get(&kb_id) else {
            return Ok(Vec::new());
        };

        let mut hits = Vec::new();
        for entry in kb_index.iter() {
            if let Some(doc_ids) = &filters.document_ids {
                if !doc_ids.contains(&entry.document_id) {
                    continue;
                }
            }

            let mut score = 0.0f32;
            let mut highlights = Vec::new();
            for term in &terms {
                let count = entry.content_lower.matches(term.as_str()).count();
                if count > 0 {
                    score += count as f32;
                    if let Some(h) = highlight(&entry.content, term, 20) {
                        highlights.push(h);
                    }
                }
            }
            if score > 0.0 {
                hits.push(KeywordSearchHit {
                    chunk_id: *entry.key(),
                    document_id: entry.document_id,
                    score,
                    content: entry.content.clone(),
                    highlights: if highlights.is_empty() { None } else { Some(highlights) },
                });
            }
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }

    fn provider_name(&self) -> &str {
        "catalog_fts"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finds_indexed_term() {
        let index = SubstringKeywordIndexProvider::new();
        let kb = Uuid::new_v4();
        let chunk = Uuid::new_v4();
        let doc = Uuid::new_v4();
        index.index_chunk(kb, chunk, doc, "the quick brown fox").await.unwrap();

        let hits = index.search(kb, "quick fox", 10, &SearchFilters::default()).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, chunk);
    }

    #[tokio::test]
    async fn removed_chunk_is_not_found() {
        let index = SubstringKeywordIndexProvider::new();
        let kb = Uuid::new_v4();
        let chunk = Uuid::new_v4();
        index.index_chunk(kb, chunk, Uuid::new_v4(), "hello").await.unwrap();
        index.remove_chunk(kb, chunk).await.unwrap();

        let hits = index.search(kb, "hello", 10, &SearchFilters::default()).await.unwrap();
        assert!(hits.is_empty());
    }
}
