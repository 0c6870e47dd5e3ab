use crate::domain::error::{Error, Result};
use crate::domain::ports::cache::{CacheStats, SearchCacheProvider};
use crate::domain::types::SearchResult;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// A cached answer is never more than this many rows, no matter how many the caller asked to
/// store.
pub const MAX_STORED_RESULTS: usize = 100;

/// Local in-memory cache backed by `moka`, the default backend. Keys are
/// `(kb_id, fingerprint)` pairs so that KB-scoped invalidation can use `moka`'s lazy
/// predicate-based invalidation instead of a prefix scan over a flat keyspace.
pub struct MokaSearchCacheProvider {
    cache: Cache<(Uuid, String), Vec<SearchResult>>,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl MokaSearchCacheProvider {
    /// Build a cache with the given max entry count and time-to-live (spec default: 1 hour).
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .support_invalidation_closures()
            .build();
        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }
}

impl Default for MokaSearchCacheProvider {
    fn default() -> Self {
        Self::new(10_000, Duration::from_secs(3600))
    }
}

#[async_trait]
impl SearchCacheProvider for MokaSearchCacheProvider {
    async fn get(&self, kb_id: Uuid, fingerprint: &str) -> Result<Option<Vec<SearchResult>>> {
        let key = (kb_id, fingerprint.to_string());
        match self.cache.get(&key).await {
            Some(results) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(results))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, kb_id: Uuid, fingerprint: &str, results: &[SearchResult]) -> Result<()> {
        let mut bounded = results.to_vec();
        bounded.truncate(MAX_STORED_RESULTS);
        self.cache.insert((kb_id, fingerprint.to_string()), bounded).await;
        Ok(())
    }

    async fn invalidate_kb(&self, kb_id: Uuid) -> Result<()> {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        self.cache
            .invalidate_entries_if(move |key: &(Uuid, String), _value| key.0 == kb_id)
            .map_err(|e| Error::transient("cache", e.to_string()))
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    fn backend_name(&self) -> &str {
        "moka"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::SearchResult;

    fn result(chunk_id: Uuid) -> SearchResult {
        SearchResult {
            chunk_id,
            document_id: Uuid::new_v4(),
            score: 1.0,
            content: "hi".to_string(),
            metadata: serde_json::json!({}),
            highlights: None,
        }
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let cache = MokaSearchCacheProvider::new(100, Duration::from_secs(60));
        let kb = Uuid::new_v4();
        assert!(cache.get(kb, "fp").await.unwrap().is_none());

        cache.set(kb, "fp", &[result(Uuid::new_v4())]).await.unwrap();
        let hit = cache.get(kb, "fp").await.unwrap();
        assert_eq!(hit.unwrap().len(), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn invalidate_kb_clears_only_that_kb() {
        let cache = MokaSearchCacheProvider::new(100, Duration::from_secs(60));
        let kb_a = Uuid::new_v4();
        let kb_b = Uuid::new_v4();
        cache.set(kb_a, "fp", &[result(Uuid::new_v4())]).await.unwrap();
        cache.set(kb_b, "fp", &[result(Uuid::new_v4())]).await.unwrap();

        cache.invalidate_kb(kb_a).await.unwrap();
        cache.cache.run_pending_tasks().await;

        assert!(cache.get(kb_a, "fp").await.unwrap().is_none());
        assert!(cache.get(kb_b, "fp").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn set_truncates_to_max_stored_results() {
        let cache = MokaSearchCacheProvider::new(100, Duration::from_secs(60));
        let kb = Uuid::new_v4();
        let many: Vec<SearchResult> = (0..200).map(|_| result(Uuid::new_v4())).collect();
        cache.set(kb, "fp", &many).await.unwrap();
        let stored = cache.get(kb, "fp").await.unwrap().unwrap();
        assert_eq!(stored.len(), MAX_STORED_RESULTS);
    }
}
