//! Search-result cache fingerprinting and the cache-failure-isolation wrapper around
//! [`SearchCacheProvider`]. Keys look like `search:{kb}:{md5}`; callers never see a cache
//! backend error, only a miss.

use crate::domain::ports::cache::SearchCacheProvider;
use crate::domain::types::{SearchFilters, SearchMode, SearchResult};
use std::sync::Arc;
use uuid::Uuid;

use super::fusion::FusionMethod;

/// Wraps a [`SearchCacheProvider`] with fingerprint computation and failure isolation: a cache
/// backend error is logged and treated as a miss/no-op rather than propagated to the caller.
pub struct SearchCache {
    provider: Arc<dyn SearchCacheProvider>,
    key_prefix: String,
    cache_empty: bool,
}

impl SearchCache {
    /// Build a wrapper around `provider`, prefixing every key with `key_prefix` and storing
    /// empty result sets only if `cache_empty` is set.
    pub fn new(provider: Arc<dyn SearchCacheProvider>, key_prefix: impl Into<String>, cache_empty: bool) -> Self {
        Self {
            provider,
            key_prefix: key_prefix.into(),
            cache_empty,
        }
    }

    /// Computes a stable fingerprint over every input that affects the result set: the
    /// normalized query, search mode, `top_k`, filters, and fusion method. Two calls with
    /// identical inputs always produce the same fingerprint; anything that changes the answer
    /// must be folded in here.
    pub fn fingerprint(
        &self,
        query: &str,
        mode: SearchMode,
        top_k: usize,
        score_threshold: f32,
        filters: &SearchFilters,
        fusion_method: FusionMethod,
    ) -> String {
        let normalized_query = query.trim().to_lowercase();
        // `serde_json::Map` is a `BTreeMap` by default (no `preserve_order` feature), so object
        // keys serialize in sorted order and this string is canonical regardless of field
        // declaration order above.
        let canonical = serde_json::json!({
            "query": normalized_query,
            "mode": mode,
            "top_k": top_k,
            "score_threshold": score_threshold,
            "filters": filters,
            "fusion_method": fusion_method,
        });
        let serialized = serde_json::to_string(&canonical).unwrap_or_default();
        let digest = md5::compute(serialized.as_bytes());
        format!("{}:{}", self.key_prefix, hex::encode(digest.0))
    }

    /// Looks up a cached result set. Backend failures are logged and treated as a miss.
    pub async fn get(&self, kb_id: Uuid, fingerprint: &str) -> Option<Vec<SearchResult>> {
        match self.provider.get(kb_id, fingerprint).await {
            Ok(hit) => hit,
            Err(err) => {
                tracing::warn!(error = %err, backend = self.provider.backend_name(), "search cache read failed, treating as miss");
                None
            }
        }
    }

    /// Stores a result set, unless it's empty and `cache_empty` is false. Backend failures are
    /// logged and swallowed.
    pub async fn set(&self, kb_id: Uuid, fingerprint: &str, results: &[SearchResult]) {
        if results.is_empty() && !self.cache_empty {
            return;
        }
        if let Err(err) = self.provider.set(kb_id, fingerprint, results).await {
            tracing::warn!(error = %err, backend = self.provider.backend_name(), "search cache write failed");
        }
    }

    /// Invalidates every cached entry for one KB. Backend failures are logged and swallowed —
    /// a stale cache entry served once more is preferable to failing the write path that
    /// triggered invalidation.
    pub async fn invalidate_kb(&self, kb_id: Uuid) {
        if let Err(err) = self.provider.invalidate_kb(kb_id).await {
            tracing::warn!(error = %err, backend = self.provider.backend_name(), %kb_id, "search cache invalidation failed");
        }
    }

    /// Current hit/miss/invalidation counters.
    pub fn stats(&self) -> crate::domain::ports::cache::CacheStats {
        self.provider.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cache::MokaSearchCacheProvider;

    #[test]
    fn fingerprint_is_stable_and_query_insensitive_to_case_and_whitespace() {
        let cache = SearchCache::new(Arc::new(MokaSearchCacheProvider::default()), "search", false);
        let filters = SearchFilters::default();
        let a = cache.fingerprint("  Rust Async  ", SearchMode::Hybrid, 10, 0.0, &filters, FusionMethod::Rrf);
        let b = cache.fingerprint("rust async", SearchMode::Hybrid, 10, 0.0, &filters, FusionMethod::Rrf);
        assert_eq!(a, b);
        assert!(a.starts_with("search:"));
    }

    #[test]
    fn fingerprint_changes_with_top_k() {
        let cache = SearchCache::new(Arc::new(MokaSearchCacheProvider::default()), "search", false);
        let filters = SearchFilters::default();
        let a = cache.fingerprint("q", SearchMode::Hybrid, 10, 0.0, &filters, FusionMethod::Rrf);
        let b = cache.fingerprint("q", SearchMode::Hybrid, 20, 0.0, &filters, FusionMethod::Rrf);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn empty_results_are_not_stored_unless_configured() {
        let cache = SearchCache::new(Arc::new(MokaSearchCacheProvider::default()), "search", false);
        let kb = Uuid::new_v4();
        cache.set(kb, "fp", &[]).await;
        assert!(cache.get(kb, "fp").await.is_none());
    }
}
