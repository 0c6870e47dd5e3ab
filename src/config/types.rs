//! Configuration schema.
//!
//! One `Config` struct aggregating nested, independently validated sub-configs, deserialized
//! from the embedded `config/default.toml` and overridden by environment variables (see
//! [`super::loader`]).

use crate::chunking::ChunkerConfig;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Top-level configuration for the `kbcore-server` binary and for any embedder of this crate.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Config {
    /// HTTP server bind configuration.
    #[validate(nested)]
    pub server: ServerConfig,
    /// Provider selection and credentials for each external-collaborator port.
    #[validate(nested)]
    pub providers: ProvidersConfig,
    /// Default chunking configuration applied to knowledge bases that don't override it.
    pub chunking: ChunkerConfig,
    /// Task queue tunables.
    #[validate(nested)]
    pub queue: QueueConfig,
    /// Processing pipeline tunables.
    #[validate(nested)]
    pub pipeline: PipelineConfig,
    /// Fusion and rerank tunables.
    pub retrieval: RetrievalConfig,
    /// Search cache tunables.
    #[validate(nested)]
    pub cache: CacheConfig,
    /// Metrics exporter configuration.
    #[validate(nested)]
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            providers: ProvidersConfig::default(),
            chunking: ChunkerConfig::default(),
            queue: QueueConfig::default(),
            pipeline: PipelineConfig::default(),
            retrieval: RetrievalConfig::default(),
            cache: CacheConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// HTTP bind address for the thin ops/admin surface.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Bind host.
    #[validate(length(min = 1))]
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Which backend implements each provider port, keyed by string (a provider-registry pattern:
/// add a new `kind` value and its matching adapter without touching callers).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProvidersConfig {
    /// Embedding provider: `"mock"` or `"openai"` (also covers Azure/self-hosted OpenAI-compatible).
    #[validate(nested)]
    pub embedding: EmbeddingProviderConfig,
    /// Vector store provider: `"memory"` or `"qdrant"`.
    pub vector_store: VectorStoreProviderConfig,
    /// Catalog provider: `"memory"` or `"postgres"`.
    pub catalog: CatalogProviderConfig,
    /// Object store provider: `"filesystem"` or `"s3"`.
    pub object_store: ObjectStoreProviderConfig,
    /// Keyword index provider: `"substring"` (fallback) or `"postgres"` (full-text with ranking).
    pub keyword_index: KeywordIndexProviderConfig,
    /// Optional reranker; `None` disables reranking by default.
    pub rerank: Option<RerankProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingProviderConfig::default(),
            vector_store: VectorStoreProviderConfig::default(),
            catalog: CatalogProviderConfig::default(),
            object_store: ObjectStoreProviderConfig::default(),
            keyword_index: KeywordIndexProviderConfig::default(),
            rerank: None,
        }
    }
}

/// Embedding provider selection.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EmbeddingProviderConfig {
    /// `"mock"` or `"openai"`.
    #[validate(length(min = 1))]
    pub kind: String,
    /// Dimension produced, used by the `"mock"` provider and as a sanity check for `"openai"`.
    pub dimensions: usize,
    /// Populated when `kind == "openai"`.
    pub openai: Option<crate::adapters::embedding::OpenAiCompatibleConfig>,
}

impl Default for EmbeddingProviderConfig {
    fn default() -> Self {
        Self {
            kind: "mock".to_string(),
            dimensions: 8,
            openai: None,
        }
    }
}

/// Vector store provider selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreProviderConfig {
    /// `"memory"` or `"qdrant"` (a Qdrant-compatible HTTP backend).
    pub kind: String,
    /// Populated when `kind == "qdrant"`.
    #[cfg(feature = "vectorstore-http")]
    pub qdrant: Option<crate::adapters::vector_store::HttpVectorStoreConfig>,
}

impl Default for VectorStoreProviderConfig {
    fn default() -> Self {
        Self {
            kind: "memory".to_string(),
            #[cfg(feature = "vectorstore-http")]
            qdrant: None,
        }
    }
}

/// Catalog provider selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogProviderConfig {
    /// `"memory"` or `"postgres"`.
    pub kind: String,
    /// Populated when `kind == "postgres"`.
    #[cfg(feature = "catalog-postgres")]
    pub postgres: Option<crate::adapters::catalog::PostgresCatalogConfig>,
}

impl Default for CatalogProviderConfig {
    fn default() -> Self {
        Self {
            kind: "memory".to_string(),
            #[cfg(feature = "catalog-postgres")]
            postgres: None,
        }
    }
}

/// Object store provider selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreProviderConfig {
    /// `"filesystem"` or `"s3"`.
    pub kind: String,
    /// Root directory for the filesystem backend.
    pub root: String,
    /// Populated when `kind == "s3"`.
    #[cfg(feature = "objectstore-s3")]
    pub s3: Option<crate::adapters::object_store::S3ObjectStoreConfig>,
}

impl Default for ObjectStoreProviderConfig {
    fn default() -> Self {
        Self {
            kind: "filesystem".to_string(),
            root: "./data/blobs".to_string(),
            #[cfg(feature = "objectstore-s3")]
            s3: None,
        }
    }
}

/// Keyword index provider selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordIndexProviderConfig {
    /// `"substring"` (a LIKE-style fallback, the default for the in-memory catalog) or
    /// `"postgres_fts"` (the primary, ranked full-text implementation, requires the
    /// `catalog-postgres` feature).
    pub kind: String,
    /// Required when `kind = "postgres_fts"`.
    #[cfg(feature = "catalog-postgres")]
    #[serde(default)]
    pub postgres: Option<crate::adapters::keyword_index::PostgresKeywordIndexConfig>,
}

impl Default for KeywordIndexProviderConfig {
    fn default() -> Self {
        Self {
            kind: "substring".to_string(),
            #[cfg(feature = "catalog-postgres")]
            postgres: None,
        }
    }
}

/// Reranker provider selection, active only when `ProvidersConfig::rerank` is `Some`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankProviderConfig {
    /// `"external"`, `"local_cross_encoder"`, or `"llm"`.
    pub kind: String,
    /// Populated when `kind == "external"`.
    pub external: Option<crate::adapters::rerank::ExternalRerankConfig>,
    /// Populated when `kind == "llm"`.
    pub llm: Option<crate::adapters::rerank::LlmRerankConfig>,
}

/// Task queue tunables.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QueueConfig {
    /// How long a leased task stays invisible before being considered abandoned and redelivered.
    pub visibility_timeout_secs: u64,
    /// Maximum redeliveries before a task is given up on by the worker loop (the document
    /// itself still ends up `Failed`, not silently dropped).
    #[validate(range(min = 1))]
    pub max_retries: u32,
    /// Number of concurrent worker tasks draining the queue.
    #[validate(range(min = 1))]
    pub worker_concurrency: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout_secs: 120,
            max_retries: 3,
            worker_concurrency: 4,
        }
    }
}

/// Processing pipeline tunables: cancellation and timeout knobs.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineConfig {
    /// Hard time limit for one document's processing attempt.
    pub hard_timeout_secs: u64,
    /// Soft time limit; the worker voluntarily aborts past this point rather than waiting for
    /// the hard limit.
    pub soft_timeout_secs: u64,
    /// Batch size used when calling the embedding client (default 100).
    #[validate(range(min = 1))]
    pub embedding_batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            hard_timeout_secs: 3600,
            soft_timeout_secs: 3000,
            embedding_batch_size: crate::domain::types::DEFAULT_EMBEDDING_BATCH_SIZE,
        }
    }
}

/// Fusion and rerank tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default fusion method for hybrid search.
    pub fusion_method: crate::application::fusion::FusionMethod,
    /// RRF's `k` constant.
    pub rrf_k: f32,
    /// Weighted fusion's semantic-list weight.
    pub semantic_weight: f32,
    /// Weighted fusion's keyword-list weight.
    pub keyword_weight: f32,
    /// Whether to nudge `semantic_weight`/`keyword_weight` based on query shape before fusing.
    pub adaptive_weighting: bool,
    /// Multiplier applied to `top_k` when requesting initial candidates ahead of a rerank pass.
    pub rerank_overfetch_factor: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            fusion_method: crate::application::fusion::FusionMethod::Rrf,
            rrf_k: 60.0,
            semantic_weight: 0.7,
            keyword_weight: 0.3,
            adaptive_weighting: false,
            rerank_overfetch_factor: 3,
        }
    }
}

/// Search cache tunables.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CacheConfig {
    /// `"moka"`, `"redis"`, or `"null"`.
    #[validate(length(min = 1))]
    pub kind: String,
    /// Entry time-to-live.
    pub ttl_secs: u64,
    /// Maximum number of distinct cache keys retained.
    pub max_capacity: u64,
    /// Whether a zero-result search is still worth caching.
    pub cache_empty: bool,
    /// Cache key prefix, used as `{prefix}:{kb}:{md5}`.
    pub key_prefix: String,
    /// Populated when `kind == "redis"`.
    #[cfg(feature = "cache-redis")]
    pub redis: Option<crate::adapters::cache::RedisCacheConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            kind: "moka".to_string(),
            ttl_secs: 3600,
            max_capacity: 10_000,
            cache_empty: false,
            key_prefix: "search".to_string(),
            #[cfg(feature = "cache-redis")]
            redis: None,
        }
    }
}

/// Prometheus metrics exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MetricsConfig {
    /// Whether to start the Prometheus exporter at startup.
    pub enabled: bool,
    /// Bind address for the `/metrics` exposition endpoint.
    #[validate(length(min = 1))]
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 9090,
        }
    }
}
