//! Relational catalog of KBs, documents, and chunks.

use crate::domain::error::Result;
use crate::domain::types::{Chunk, Document, DocumentStatus, KnowledgeBase};
use async_trait::async_trait;
use uuid::Uuid;

/// Narrowed update to apply to a [`Document`] row. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
    /// New status.
    pub status: Option<DocumentStatus>,
    /// New chunk count.
    pub chunk_count: Option<u32>,
    /// New retry count.
    pub retry_count: Option<u32>,
    /// New error message (pass `Some(None)` to clear it).
    pub error_message: Option<Option<String>>,
    /// New processed_at timestamp.
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// The relational system of record: knowledge bases, documents, and chunks.
///
/// Mutations that must be atomic with respect to concurrent workers (claiming a document for
/// processing, finalizing it) go through dedicated compare-and-swap style methods rather than a
/// generic `update`, so every implementation is forced to provide the same concurrency guarantee
/// so at most one worker can ever hold `Processing` for a document at a time.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert a new knowledge base.
    async fn create_kb(&self, kb: KnowledgeBase) -> Result<KnowledgeBase>;
    /// Fetch a knowledge base by id.
    async fn get_kb(&self, id: Uuid) -> Result<KnowledgeBase>;
    /// List knowledge bases owned by a user.
    async fn list_kbs(&self, owner_id: Uuid) -> Result<Vec<KnowledgeBase>>;
    /// Delete a knowledge base and cascade to its documents and chunks.
    async fn delete_kb(&self, id: Uuid) -> Result<()>;
    /// Atomically bump a KB's document/chunk counters by the given deltas.
    async fn adjust_kb_counters(&self, id: Uuid, document_delta: i64, chunk_delta: i64) -> Result<()>;

    /// Insert a new document in `Pending` status.
    async fn create_document(&self, document: Document) -> Result<Document>;
    /// Fetch a document by id.
    async fn get_document(&self, id: Uuid) -> Result<Document>;
    /// List documents in a KB.
    async fn list_documents(&self, kb_id: Uuid) -> Result<Vec<Document>>;
    /// Delete a document and cascade to its chunks.
    async fn delete_document(&self, id: Uuid) -> Result<()>;

    /// Atomically transition a document from `Pending` (or `Failed`, when `force` is set by the
    /// caller re-queuing it) to `Processing`. Returns `Ok(None)` if another worker already holds
    /// the claim — this is not an error, callers skip and move on.
    async fn claim_document(&self, id: Uuid) -> Result<Option<Document>>;

    /// Apply a patch to a document, typically to finalize a claim as `Completed` or `Failed`.
    async fn update_document(&self, id: Uuid, patch: DocumentPatch) -> Result<Document>;

    /// Replace all chunks for a document (used on (re)processing; old chunks are superseded).
    async fn replace_chunks(&self, document_id: Uuid, chunks: Vec<Chunk>) -> Result<()>;
    /// Fetch all chunks for a document, ordered by `chunk_index`.
    async fn get_chunks(&self, document_id: Uuid) -> Result<Vec<Chunk>>;
    /// Fetch chunks by id, used to hydrate search results that only carry a chunk id.
    async fn get_chunks_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Chunk>>;
    /// Record the vector store id assigned to each chunk after a successful upsert.
    async fn set_vector_ids(&self, chunk_ids: &[Uuid], vector_ids: &[Uuid]) -> Result<()>;
}
