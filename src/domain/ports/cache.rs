//! Search result caching.

use crate::domain::error::Result;
use crate::domain::types::SearchResult;
use async_trait::async_trait;
use uuid::Uuid;

/// Caches ranked [`SearchResult`] lists keyed by a fingerprint of the query, KB, and search
/// configuration.
///
/// Implementations must treat cache misses and cache backend failures identically: a failure to
/// read or write the cache must never fail the surrounding search. Errors from this port are
/// always [`crate::domain::error::Error::Transient`] and are swallowed by the caller, not
/// propagated.
#[async_trait]
pub trait SearchCacheProvider: Send + Sync {
    /// Look up a cached result set by its fingerprint.
    async fn get(&self, kb_id: Uuid, fingerprint: &str) -> Result<Option<Vec<SearchResult>>>;

    /// Store a result set under its fingerprint with the namespace's configured TTL.
    async fn set(&self, kb_id: Uuid, fingerprint: &str, results: &[SearchResult]) -> Result<()>;

    /// Invalidate every cached entry for one KB. Called whenever a document in that KB finishes
    /// processing, so cache entries never outlive the content they describe by more than one
    /// write.
    async fn invalidate_kb(&self, kb_id: Uuid) -> Result<()>;

    /// Current hit/miss counters, reset on process restart.
    fn stats(&self) -> CacheStats;

    /// Stable identifier, e.g. `"moka"`, `"redis"`, `"null"`.
    fn backend_name(&self) -> &str;
}

/// Hit/miss counters exposed for the metrics surface and `/admin/cache/stats`.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct CacheStats {
    /// Number of [`SearchCacheProvider::get`] calls that found an entry.
    pub hits: u64,
    /// Number of [`SearchCacheProvider::get`] calls that found nothing.
    pub misses: u64,
    /// Number of [`SearchCacheProvider::invalidate_kb`] calls made.
    pub invalidations: u64,
}

impl CacheStats {
    /// Hit ratio in `[0.0, 1.0]`; `0.0` when no lookups have happened yet.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
