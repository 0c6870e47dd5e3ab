//! Trait boundaries ("ports") between the core pipelines and the outside world.
//!
//! Every adapter in `crate::adapters` implements exactly one of these. The application layer
//! never depends on a concrete adapter, only on `Arc<dyn Trait>`.

pub mod cache;
pub mod catalog;
pub mod chunker;
pub mod embedding;
pub mod keyword_index;
pub mod object_store;
pub mod parser;
pub mod queue;
pub mod rerank;
pub mod vector_store;

pub use cache::SearchCacheProvider;
pub use catalog::CatalogStore;
pub use chunker::Chunker;
pub use embedding::EmbeddingProvider;
pub use keyword_index::KeywordIndexProvider;
pub use object_store::ObjectStoreProvider;
pub use parser::DocumentParser;
pub use queue::TaskQueue;
pub use rerank::RerankProvider;
pub use vector_store::VectorStoreProvider;
