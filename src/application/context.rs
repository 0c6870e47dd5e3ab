//! Wires concrete adapters behind the `domain::ports` traits into one `Arc`-holding struct: an
//! explicit context object rather than a global registry/locator.

use crate::adapters::cache::{MokaSearchCacheProvider, NullSearchCacheProvider};
use crate::adapters::catalog::InMemoryCatalogStore;
use crate::adapters::embedding::{MockEmbeddingProvider, OpenAiCompatibleProvider};
use crate::adapters::keyword_index::SubstringKeywordIndexProvider;
use crate::adapters::object_store::FilesystemObjectStoreProvider;
use crate::adapters::queue::InMemoryTaskQueue;
use crate::adapters::rerank::{ExternalRerankProvider, LexicalCrossEncoderProvider, LlmRerankProvider};
use crate::adapters::vector_store::InMemoryVectorStoreProvider;
use crate::chunking::build_chunker;
use crate::config::Config;
use crate::domain::error::{Error, Result};
use crate::domain::ports::cache::SearchCacheProvider;
use crate::domain::ports::catalog::CatalogStore;
use crate::domain::ports::chunker::Chunker;
use crate::domain::ports::embedding::EmbeddingProvider;
use crate::domain::ports::keyword_index::KeywordIndexProvider;
use crate::domain::ports::object_store::ObjectStoreProvider;
use crate::domain::ports::parser::ParserRegistry;
use crate::domain::ports::queue::TaskQueue;
use crate::domain::ports::rerank::RerankProvider;
use crate::domain::ports::vector_store::VectorStoreProvider;
use crate::parsing::DefaultParserRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Every collaborator the application layer depends on, built once at startup from [`Config`]
/// and shared behind `Arc` with every request/worker task.
pub struct AppContext {
    /// The configuration this context was built from.
    pub config: Config,
    /// Relational catalog of KBs/documents/chunks.
    pub catalog: Arc<dyn CatalogStore>,
    /// At-least-once processing task queue.
    pub queue: Arc<dyn TaskQueue>,
    /// Search result cache.
    pub cache: Arc<dyn SearchCacheProvider>,
    /// Text embedding provider.
    pub embedding: Arc<dyn EmbeddingProvider>,
    /// Vector similarity store.
    pub vector_store: Arc<dyn VectorStoreProvider>,
    /// Keyword/full-text index.
    pub keyword_index: Arc<dyn KeywordIndexProvider>,
    /// Raw document bytes store.
    pub object_store: Arc<dyn ObjectStoreProvider>,
    /// Extension-keyed document parser registry.
    pub parsers: Arc<dyn ParserRegistry>,
    /// The chunker selected by `config.chunking`.
    pub chunker: Arc<dyn Chunker>,
    /// Optional reranker; `None` when hybrid search should stop at fusion.
    pub rerank: Option<Arc<dyn RerankProvider>>,
}

impl AppContext {
    /// Builds every collaborator from `config`, failing fast if a selected provider kind is
    /// unknown or missing its required sub-config — at startup, not on first request.
    pub fn build(config: Config) -> Result<Self> {
        let embedding: Arc<dyn EmbeddingProvider> = match config.providers.embedding.kind.as_str() {
            "mock" => Arc::new(MockEmbeddingProvider::new(config.providers.embedding.dimensions)),
            "openai" => {
                let openai = config.providers.embedding.openai.clone().ok_or_else(|| {
                    Error::config("providers.embedding.openai must be set when kind = \"openai\"")
                })?;
                Arc::new(OpenAiCompatibleProvider::new(openai))
            }
            other => return Err(Error::config(format!("unknown embedding provider kind: {other}"))),
        };

        let vector_store: Arc<dyn VectorStoreProvider> = match config.providers.vector_store.kind.as_str() {
            "memory" => Arc::new(InMemoryVectorStoreProvider::new()),
            #[cfg(feature = "vectorstore-http")]
            "qdrant" => {
                let qdrant = config.providers.vector_store.qdrant.clone().ok_or_else(|| {
                    Error::config("providers.vector_store.qdrant must be set when kind = \"qdrant\"")
                })?;
                Arc::new(crate::adapters::vector_store::HttpVectorStoreProvider::new(qdrant))
            }
            other => return Err(Error::config(format!("unknown vector store provider kind: {other}"))),
        };

        let object_store: Arc<dyn ObjectStoreProvider> = match config.providers.object_store.kind.as_str() {
            "filesystem" => Arc::new(FilesystemObjectStoreProvider::new(config.providers.object_store.root.clone())),
            #[cfg(feature = "objectstore-s3")]
            "s3" => {
                let s3 = config
                    .providers
                    .object_store
                    .s3
                    .clone()
                    .ok_or_else(|| Error::config("providers.object_store.s3 must be set when kind = \"s3\""))?;
                Arc::new(crate::adapters::object_store::S3ObjectStoreProvider::new(s3))
            }
            other => return Err(Error::config(format!("unknown object store provider kind: {other}"))),
        };

        let keyword_index: Arc<dyn KeywordIndexProvider> = match config.providers.keyword_index.kind.as_str() {
            "substring" => Arc::new(SubstringKeywordIndexProvider::new()),
            #[cfg(feature = "catalog-postgres")]
            "postgres_fts" => {
                let postgres = config.providers.keyword_index.postgres.clone().ok_or_else(|| {
                    Error::config("providers.keyword_index.postgres must be set when kind = \"postgres_fts\"")
                })?;
                Arc::new(crate::adapters::keyword_index::PostgresKeywordIndexProvider::connect(&postgres)?)
            }
            other => return Err(Error::config(format!("unknown keyword index provider kind: {other}"))),
        };

        let rerank: Option<Arc<dyn RerankProvider>> = match &config.providers.rerank {
            None => None,
            Some(rerank_config) => {
                let provider: Arc<dyn RerankProvider> = match rerank_config.kind.as_str() {
                    "external" => {
                        let c = rerank_config.external.clone().ok_or_else(|| {
                            Error::config("providers.rerank.external must be set when kind = \"external\"")
                        })?;
                        Arc::new(ExternalRerankProvider::new(c))
                    }
                    "local_cross_encoder" => Arc::new(LexicalCrossEncoderProvider::default()),
                    "llm" => {
                        let c = rerank_config.llm.clone().ok_or_else(|| {
                            Error::config("providers.rerank.llm must be set when kind = \"llm\"")
                        })?;
                        Arc::new(LlmRerankProvider::new(c))
                    }
                    other => return Err(Error::config(format!("unknown rerank provider kind: {other}"))),
                };
                Some(provider)
            }
        };

        let cache: Arc<dyn SearchCacheProvider> = match config.cache.kind.as_str() {
            "moka" => Arc::new(MokaSearchCacheProvider::new(
                config.cache.max_capacity,
                Duration::from_secs(config.cache.ttl_secs),
            )),
            "null" => Arc::new(NullSearchCacheProvider),
            #[cfg(feature = "cache-redis")]
            "redis" => {
                let redis_config = config
                    .cache
                    .redis
                    .clone()
                    .ok_or_else(|| Error::config("cache.redis must be set when cache.kind = \"redis\""))?;
                Arc::new(crate::adapters::cache::RedisSearchCacheProvider::new(&redis_config)?)
            }
            other => return Err(Error::config(format!("unknown cache backend kind: {other}"))),
        };

        let catalog: Arc<dyn CatalogStore> = match config.providers.catalog.kind.as_str() {
            "memory" => Arc::new(InMemoryCatalogStore::new()),
            #[cfg(feature = "catalog-postgres")]
            "postgres" => {
                let postgres_config = config
                    .providers
                    .catalog
                    .postgres
                    .clone()
                    .ok_or_else(|| Error::config("providers.catalog.postgres must be set when kind = \"postgres\""))?;
                Arc::new(crate::adapters::catalog::PostgresCatalogStore::connect(&postgres_config)?)
            }
            other => return Err(Error::config(format!("unknown catalog provider kind: {other}"))),
        };
        let queue: Arc<dyn TaskQueue> = Arc::new(InMemoryTaskQueue::new());
        let parsers: Arc<dyn ParserRegistry> = Arc::new(DefaultParserRegistry::with_defaults());
        let chunker = build_chunker(config.chunking.clone());

        Ok(Self {
            config,
            catalog,
            queue,
            cache,
            embedding,
            vector_store,
            keyword_index,
            object_store,
            parsers,
            chunker,
            rerank,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_embedded_defaults() {
        let config = crate::config::load_embedded_defaults().unwrap();
        let context = AppContext::build(config).unwrap();
        assert_eq!(context.embedding.provider_name(), "mock");
        assert_eq!(context.vector_store.provider_name(), "memory");
        assert!(context.rerank.is_none());
    }

    #[test]
    fn rejects_unknown_provider_kind() {
        let mut config = crate::config::load_embedded_defaults().unwrap();
        config.providers.vector_store.kind = "not-a-real-backend".to_string();
        assert!(AppContext::build(config).is_err());
    }
}
