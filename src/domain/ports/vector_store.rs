//! Vector storage and similarity search.

use crate::domain::error::Result;
use crate::domain::types::{VectorFilters, VectorRecord};
use async_trait::async_trait;
use uuid::Uuid;

/// A single hit from [`VectorStoreProvider::search`].
#[derive(Debug, Clone)]
pub struct VectorSearchHit {
    /// The matched record's id (equal to the owning chunk's id).
    pub id: Uuid,
    /// Cosine similarity in `[-1.0, 1.0]`, higher is better.
    pub score: f32,
    /// The record's stored payload.
    pub payload: crate::domain::types::VectorPayload,
}

/// Stores dense vectors in per-KB collections and serves nearest-neighbor search.
///
/// Collections are created lazily on first upsert and are keyed by
/// [`crate::domain::types::collection_name_for`]; once created, a collection's dimension is
/// immutable for its lifetime.
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Create a collection with the given dimension if it does not already exist. Idempotent.
    async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<()>;

    /// Insert or overwrite records by id. All records must share `dimension`.
    async fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> Result<()>;

    /// Nearest-neighbor search by cosine similarity, highest score first.
    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        top_k: usize,
        filters: &VectorFilters,
    ) -> Result<Vec<VectorSearchHit>>;

    /// Remove specific records by id (used when a chunk is superseded by reprocessing).
    async fn delete(&self, collection: &str, ids: &[Uuid]) -> Result<()>;

    /// Remove an entire collection (used when a KB is deleted).
    async fn drop_collection(&self, collection: &str) -> Result<()>;

    /// Stable identifier, e.g. `"memory"`, `"qdrant"`, `"milvus"`.
    fn provider_name(&self) -> &str;

    /// Cheap liveness probe. The default checks a well-known collection name exists or can be
    /// created without error.
    async fn health_check(&self) -> Result<()> {
        self.ensure_collection("__health_check__", 1).await
    }
}
