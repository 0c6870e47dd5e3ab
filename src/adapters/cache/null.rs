use crate::domain::error::Result;
use crate::domain::ports::cache::{CacheStats, SearchCacheProvider};
use crate::domain::types::SearchResult;
use async_trait::async_trait;
use uuid::Uuid;

/// A cache that caches nothing: every `get` misses, `set`/`invalidate_kb` are no-ops. Used in
/// tests and in deployments that would rather hit the backends fresh every time than stand up a
/// cache backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSearchCacheProvider;

#[async_trait]
impl SearchCacheProvider for NullSearchCacheProvider {
    async fn get(&self, _kb_id: Uuid, _fingerprint: &str) -> Result<Option<Vec<SearchResult>>> {
        Ok(None)
    }

    async fn set(&self, _kb_id: Uuid, _fingerprint: &str, _results: &[SearchResult]) -> Result<()> {
        Ok(())
    }

    async fn invalidate_kb(&self, _kb_id: Uuid) -> Result<()> {
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }

    fn backend_name(&self) -> &str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_misses() {
        let cache = NullSearchCacheProvider;
        cache.set(Uuid::new_v4(), "fp", &[]).await.unwrap();
        assert!(cache.get(Uuid::new_v4(), "fp").await.unwrap().is_none());
    }
}
