//! Text-to-vector embedding providers.

use crate::domain::error::Result;
use crate::domain::types::{EmbeddingBatchResult, EmbeddingUsage};
use async_trait::async_trait;

/// Transforms text into dense vectors for semantic search.
///
/// Implementations batch internally: callers should prefer [`embed_batch`](Self::embed_batch)
/// over repeated [`embed`](Self::embed) calls, since most providers charge per-request overhead
/// independent of batch size.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let result = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        result
            .vectors
            .into_iter()
            .next()
            .ok_or_else(|| crate::domain::error::Error::internal("provider returned no vectors"))
    }

    /// Embed a batch of texts in request order. Implementations are responsible for
    /// sub-batching to the provider's own limit and for retrying transient failures.
    async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddingBatchResult>;

    /// The dimension of vectors this provider produces.
    fn dimensions(&self) -> usize;

    /// Stable identifier, e.g. `"openai"`, `"azure"`, `"mock"`.
    fn provider_name(&self) -> &str;

    /// The model this provider currently targets.
    fn model_name(&self) -> &str;

    /// Cheap liveness probe. The default embeds a one-word probe text.
    async fn health_check(&self) -> Result<()> {
        self.embed("health check").await?;
        Ok(())
    }

    /// Recent call log, most recent first, bounded to
    /// [`crate::domain::types::EMBEDDING_LOG_CAPACITY`] entries.
    fn recent_calls(&self) -> Vec<crate::domain::types::EmbeddingLogEntry> {
        Vec::new()
    }
}

/// Helper for computing a rough cost estimate; adapters with known per-token pricing override
/// this rather than hand-rolling the arithmetic inline.
pub fn estimate_cost_usd(usage: &EmbeddingUsage, usd_per_million_tokens: f64) -> f64 {
    usage.total_tokens as f64 * usd_per_million_tokens / 1_000_000.0
}
