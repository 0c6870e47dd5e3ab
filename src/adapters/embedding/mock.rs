use crate::domain::error::Result;
use crate::domain::ports::embedding::EmbeddingProvider;
use crate::domain::types::{EmbeddingBatchResult, EmbeddingUsage};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Deterministic embedding provider for tests: hashes each input text into a fixed-dimension
/// unit vector, so the same text always embeds to the same vector and distinct texts embed to
/// (almost certainly) distinct vectors, without any network dependency.
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    /// Build a mock provider producing vectors of the given dimension.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new(8)
    }
}

fn hash_embed(text: &str, dimensions: usize) -> Vec<f32> {
    let mut vector = Vec::with_capacity(dimensions);
    let mut seed = 0u64;
    let mut counter = 0u32;
    while vector.len() < dimensions {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(counter.to_le_bytes());
        hasher.update(seed.to_le_bytes());
        let digest = hasher.finalize();
        for chunk in digest.chunks_exact(4) {
            if vector.len() == dimensions {
                break;
            }
            let bits = u32::from_le_bytes(chunk.try_into().unwrap());
            vector.push((bits as f32 / u32::MAX as f32) * 2.0 - 1.0);
        }
        counter = counter.wrapping_add(1);
        seed = seed.wrapping_add(1);
    }

    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddingBatchResult> {
        let vectors = texts.iter().map(|t| hash_embed(t, self.dimensions)).collect();
        Ok(EmbeddingBatchResult {
            vectors,
            model: "mock".to_string(),
            usage: EmbeddingUsage {
                prompt_tokens: texts.iter().map(|t| t.len() as u64).sum(),
                total_tokens: texts.iter().map(|t| t.len() as u64).sum(),
            },
            latency_ms: 0,
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_embeds_deterministically() {
        let provider = MockEmbeddingProvider::new(16);
        let a = provider.embed("hello").await.unwrap();
        let b = provider.embed("hello").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[tokio::test]
    async fn different_text_embeds_differently() {
        let provider = MockEmbeddingProvider::new(16);
        let a = provider.embed("hello").await.unwrap();
        let b = provider.embed("goodbye").await.unwrap();
        assert_ne!(a, b);
    }
}
