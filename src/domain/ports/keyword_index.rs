//! Full-text / keyword search.

use crate::domain::error::Result;
use crate::domain::types::SearchFilters;
use async_trait::async_trait;
use uuid::Uuid;

/// A single hit from [`KeywordIndexProvider::search`].
#[derive(Debug, Clone)]
pub struct KeywordSearchHit {
    /// The matched chunk's id.
    pub chunk_id: Uuid,
    /// The matched chunk's owning document.
    pub document_id: Uuid,
    /// Full-text rank score. Scale is backend-specific; only relative ordering within one
    /// backend is meaningful, which is why fusion normalizes by rank, not score.
    pub score: f32,
    /// The chunk's text.
    pub content: String,
    /// Highlighted snippets, if the backend supports them.
    pub highlights: Option<Vec<String>>,
}

/// Indexes chunk text for keyword/full-text retrieval, independent of the vector store.
#[async_trait]
pub trait KeywordIndexProvider: Send + Sync {
    /// Index or reindex a chunk's text under a KB-scoped index.
    async fn index_chunk(
        &self,
        kb_id: Uuid,
        chunk_id: Uuid,
        document_id: Uuid,
        content: &str,
    ) -> Result<()>;

    /// Remove a chunk from the index.
    async fn remove_chunk(&self, kb_id: Uuid, chunk_id: Uuid) -> Result<()>;

    /// Remove every chunk belonging to a KB (cascade on KB deletion).
    async fn drop_kb(&self, kb_id: Uuid) -> Result<()>;

    /// Keyword search scoped to one KB.
    async fn search(
        &self,
        kb_id: Uuid,
        query: &str,
        top_k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<KeywordSearchHit>>;

    /// Stable identifier, e.g. `"catalog_fts"`, `"elasticsearch"`.
    fn provider_name(&self) -> &str;
}
