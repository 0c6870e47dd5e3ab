use crate::domain::error::Result;
use crate::domain::ports::rerank::RerankProvider;
use crate::domain::types::SearchResult;
use async_trait::async_trait;
use std::collections::HashSet;

/// Local "cross-encoder": no model weights, just a query/document lexical-overlap score,
/// playing the same role in tests and offline deployments that a real cross-encoder would —
/// one function scoring `(query, document)` pairs together rather than independently, as real
/// bi-encoder embeddings do.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalCrossEncoderProvider {
    max_candidates: usize,
}

impl LexicalCrossEncoderProvider {
    /// Build a provider accepting up to `max_candidates` results per call.
    pub fn new(max_candidates: usize) -> Self {
        Self { max_candidates }
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.split_whitespace().map(|w| w.to_lowercase()).collect()
}

fn overlap_score(query_tokens: &HashSet<String>, content: &str) -> f32 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let content_tokens = tokens(content);
    let overlap = query_tokens.intersection(&content_tokens).count();
    overlap as f32 / query_tokens.len() as f32
}

#[async_trait]
impl RerankProvider for LexicalCrossEncoderProvider {
    async fn rerank(&self, query: &str, mut results: Vec<SearchResult>) -> Result<Vec<SearchResult>> {
        let query_tokens = tokens(query);
        for result in &mut results {
            result.score = overlap_score(&query_tokens, &result.content);
        }
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(results)
    }

    fn max_candidates(&self) -> usize {
        if self.max_candidates == 0 {
            256
        } else {
            self.max_candidates
        }
    }

    fn provider_name(&self) -> &str {
        "local_cross_encoder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn result(content: &str) -> SearchResult {
        SearchResult {
            chunk_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            score: 0.0,
            content: content.to_string(),
            metadata: serde_json::json!({}),
            highlights: None,
        }
    }

    #[tokio::test]
    async fn favors_higher_lexical_overlap() {
        let provider = LexicalCrossEncoderProvider::new(10);
        let out = provider
            .rerank(
                "rust async runtime",
                vec![result("a cooking recipe"), result("the rust async runtime scheduler")],
            )
            .await
            .unwrap();
        assert_eq!(out[0].content, "the rust async runtime scheduler");
        assert!(out[0].score > out[1].score);
    }
}
