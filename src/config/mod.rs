//! Configuration schema and layered loading.

mod loader;
mod types;

pub use loader::{embedded_defaults_toml, load, load_embedded_defaults};
pub use types::{
    CacheConfig, Config, EmbeddingProviderConfig, KeywordIndexProviderConfig, MetricsConfig,
    ObjectStoreProviderConfig, PipelineConfig, ProvidersConfig, QueueConfig, RerankProviderConfig,
    RetrievalConfig, ServerConfig, VectorStoreProviderConfig,
};
