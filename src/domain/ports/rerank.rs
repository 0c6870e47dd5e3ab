//! Cross-encoder style result reranking.

use crate::domain::error::Result;
use crate::domain::types::SearchResult;
use async_trait::async_trait;

/// Re-scores a fused result set against the original query using a model that can look at the
/// query and a candidate together (unlike the bi-encoder embeddings used for initial retrieval).
///
/// Implementations receive already-fused results and return them in a new order; they must not
/// drop or add entries, only reorder and rewrite `score`.
#[async_trait]
pub trait RerankProvider: Send + Sync {
    /// Rerank `results` against `query`. Empty input returns empty output.
    async fn rerank(&self, query: &str, results: Vec<SearchResult>) -> Result<Vec<SearchResult>>;

    /// Maximum number of candidates this provider accepts in one call; callers truncate before
    /// calling, keeping the overflow in their original fused order appended after the reranked
    /// prefix.
    fn max_candidates(&self) -> usize;

    /// Stable identifier, e.g. `"cohere"`, `"jina"`, `"local_cross_encoder"`, `"llm"`.
    fn provider_name(&self) -> &str;
}
