//! Redis-backed [`SearchCacheProvider`].
//!
//! Keys are namespaced by `(kb_id, fingerprint)`, same as the in-process cache. Redis has no
//! predicate-based invalidation, so KB-scoped invalidation here keeps a side-set of fingerprints
//! per KB (`kbcore:kbset:{kb_id}`) and deletes its members plus the set itself.

use crate::domain::error::{Error, Result};
use crate::domain::ports::cache::{CacheStats, SearchCacheProvider};
use crate::domain::types::SearchResult;
use async_trait::async_trait;
use redis::AsyncCommands;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Connection settings for the Redis cache backend.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RedisCacheConfig {
    /// A `redis://` connection URL.
    pub url: String,
    /// Time-to-live applied to every stored entry.
    pub ttl: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self { url: "redis://127.0.0.1".to_string(), ttl: Duration::from_secs(3600) }
    }
}

/// A [`SearchCacheProvider`] backed by a Redis-compatible server. The connection manager is
/// created lazily on first use rather than at construction time, so building a provider (and
/// thus [`crate::application::context::AppContext::build`]) never needs an async runtime or a
/// live server just to start.
pub struct RedisSearchCacheProvider {
    client: redis::Client,
    conn: OnceCell<redis::aio::ConnectionManager>,
    ttl_secs: u64,
    key_prefix: String,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl RedisSearchCacheProvider {
    /// Parses the connection URL but does not connect yet; the first cache operation performs
    /// (and thereafter reuses) the actual connection.
    pub fn new(config: &RedisCacheConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.clone()).map_err(|e| Error::config(format!("invalid redis url: {e}")))?;
        Ok(Self {
            client,
            conn: OnceCell::new(),
            ttl_secs: config.ttl.as_secs().max(1),
            key_prefix: "kbcore:cache".to_string(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        })
    }

    async fn conn(&self) -> Result<redis::aio::ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| async { self.client.get_connection_manager().await })
            .await
            .map_err(|e| Error::transient("cache", e.to_string()))?;
        Ok(conn.clone())
    }

    fn entry_key(&self, kb_id: Uuid, fingerprint: &str) -> String {
        format!("{}:{kb_id}:{fingerprint}", self.key_prefix)
    }

    fn kb_set_key(&self, kb_id: Uuid) -> String {
        format!("{}:kbset:{kb_id}", self.key_prefix)
    }
}

#[async_trait]
impl SearchCacheProvider for RedisSearchCacheProvider {
    async fn get(&self, kb_id: Uuid, fingerprint: &str) -> Result<Option<Vec<SearchResult>>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn
            .get(self.entry_key(kb_id, fingerprint))
            .await
            .map_err(|e| Error::transient("cache", e.to_string()))?;

        match raw {
            Some(json) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                let results = serde_json::from_str(&json).map_err(|e| Error::transient("cache", e.to_string()))?;
                Ok(Some(results))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, kb_id: Uuid, fingerprint: &str, results: &[SearchResult]) -> Result<()> {
        let entry_key = self.entry_key(kb_id, fingerprint);
        let kb_set_key = self.kb_set_key(kb_id);
        let payload = serde_json::to_string(results).map_err(|e| Error::transient("cache", e.to_string()))?;

        let mut conn = self.conn().await?;
        redis::pipe()
            .atomic()
            .set_ex(&entry_key, payload, self.ttl_secs)
            .sadd(&kb_set_key, fingerprint)
            .expire(&kb_set_key, self.ttl_secs as i64)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| Error::transient("cache", e.to_string()))?;
        Ok(())
    }

    async fn invalidate_kb(&self, kb_id: Uuid) -> Result<()> {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        let kb_set_key = self.kb_set_key(kb_id);
        let mut conn = self.conn().await?;
        let fingerprints: Vec<String> = conn.smembers(&kb_set_key).await.map_err(|e| Error::transient("cache", e.to_string()))?;
        if fingerprints.is_empty() {
            return Ok(());
        }
        let entry_keys: Vec<String> = fingerprints.iter().map(|fp| self.entry_key(kb_id, fp)).collect();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for key in &entry_keys {
            pipe.del(key);
        }
        pipe.del(&kb_set_key);
        pipe.query_async::<()>(&mut conn).await.map_err(|e| Error::transient("cache", e.to_string()))?;
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    fn backend_name(&self) -> &str {
        "redis"
    }
}
