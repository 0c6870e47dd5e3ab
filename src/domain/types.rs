//! Core business entities of the knowledge base platform.
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`KnowledgeBase`] | A tenant-owned corpus with an immutable embedding dimension |
//! | [`Document`] | An uploaded file and its processing state machine |
//! | [`Chunk`] | A slice of a document's extracted text, one-to-one with a vector record |
//! | [`SearchResult`] | A ranked, ephemeral hit returned by the retrieval pipeline |
//!
//! ## Example
//!
//! ```rust
//! use kbcore::domain::types::{Chunk, DocumentStatus};
//! use uuid::Uuid;
//!
//! let chunk = Chunk {
//!     id: Uuid::new_v4(),
//!     document_id: Uuid::new_v4(),
//!     kb_id: Uuid::new_v4(),
//!     chunk_index: 0,
//!     content: "hello world".to_string(),
//!     start_char: 0,
//!     end_char: 11,
//!     token_count: 3,
//!     vector_id: None,
//!     embedding_model_version: "text-embedding-3-small".to_string(),
//!     metadata: serde_json::json!({}),
//! };
//! assert_eq!(chunk.end_char - chunk.start_char, 11);
//! assert_eq!(DocumentStatus::Pending.to_string(), "pending");
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

/// Visibility of a knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Only the owner can see it.
    #[default]
    Private,
    /// Shared within the owner's team.
    Team,
    /// Visible to anyone.
    Public,
}

/// A tenant-owned logical corpus. Carries an immutable embedding dimension once a document
/// has successfully completed processing.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct KnowledgeBase {
    /// Unique identifier.
    pub id: Uuid,
    /// Display name.
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Owning user id (opaque to this crate; the auth layer resolves identity).
    pub owner_id: Uuid,
    /// Visibility tier.
    pub visibility: Visibility,
    /// Embedding provider used for this KB (e.g. "openai", "azure", "local").
    pub embedding_provider: String,
    /// Embedding model name.
    pub embedding_model: String,
    /// Embedding vector dimension. Immutable once the first document completes.
    #[validate(range(min = 1))]
    pub embedding_dimension: usize,
    /// Free-form tags, filterable via [`SearchFilters::tags`].
    pub tags: Vec<String>,
    /// Number of documents currently cataloged.
    pub document_count: u64,
    /// Number of chunks currently cataloged.
    pub chunk_count: u64,
    /// Monotonic version, bumped on every mutation.
    pub version: u64,
    /// Creation timestamp.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Last mutation timestamp.
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl KnowledgeBase {
    /// The name of this KB's vector store collection: `kb_{uuid_with_underscores}`.
    pub fn collection_name(&self) -> String {
        collection_name_for(&self.id)
    }

    /// The blob prefix owning all of this KB's documents.
    pub fn blob_prefix(&self) -> String {
        format!("knowledge_bases/{}/documents/", self.id)
    }
}

/// Computes the vector store collection name for a KB id without requiring a [`KnowledgeBase`]
/// value (used by code paths that only hold an id, e.g. deletion cascades).
pub fn collection_name_for(kb_id: &Uuid) -> String {
    format!("kb_{}", kb_id.simple())
}

/// How a document entered the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Uploaded as raw bytes through the write API.
    Upload,
    /// Pushed as pre-extracted UTF-8 text through the API.
    Api,
    /// Mirrored from a git repository (external collaborator; out of scope here).
    Git,
    /// Mirrored from an svn repository.
    Svn,
    /// Fetched from a URL.
    Url,
}

/// The document processing state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Uploaded, blob stored, not yet claimed by a worker.
    Pending,
    /// Claimed by exactly one worker; being parsed/chunked/embedded.
    Processing,
    /// Terminal success: chunk_count chunks persisted, vectors upserted.
    Completed,
    /// Terminal failure: error_message populated, retry_count incremented.
    Failed,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// An uploaded document and its processing state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning knowledge base.
    pub kb_id: Uuid,
    /// Original file name (basename only; see object store adapter).
    pub file_name: String,
    /// File type, normally the lower-cased extension ("pdf", "docx", "txt", ...).
    pub file_type: String,
    /// Size of the original bytes.
    pub byte_size: u64,
    /// Path into the object store.
    pub blob_path: String,
    /// Hex-encoded sha-256 of the original bytes.
    pub content_hash: String,
    /// Current lifecycle state.
    pub status: DocumentStatus,
    /// How the document entered the platform.
    pub source_type: SourceType,
    /// Number of chunks persisted. Equals the live chunk count iff `status == Completed`.
    pub chunk_count: u32,
    /// Number of failed processing attempts recorded against this document.
    pub retry_count: u32,
    /// Populated when `status == Failed`.
    pub error_message: Option<String>,
    /// Monotonic version, bumped on every mutation.
    pub version: u64,
    /// Creation timestamp.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Last mutation timestamp.
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// Set when `status` transitions to `Completed` or `Failed`.
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A contiguous slice of a document's extracted text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Identifier, shared with the corresponding [`VectorRecord`] id.
    pub id: Uuid,
    /// Owning document.
    pub document_id: Uuid,
    /// Owning knowledge base (denormalized for filtering).
    pub kb_id: Uuid,
    /// Dense, zero-based index within the document.
    pub chunk_index: u32,
    /// The chunk's text.
    pub content: String,
    /// Start offset (inclusive) in the document's extracted text.
    pub start_char: usize,
    /// End offset (exclusive) in the document's extracted text.
    pub end_char: usize,
    /// Estimated token count: `CJK_chars + ceil(non_CJK_chars / 4)`.
    pub token_count: u32,
    /// Present iff a corresponding [`VectorRecord`] exists in the KB's collection.
    pub vector_id: Option<Uuid>,
    /// Embedding model version tag; uniform across all chunks of one document.
    pub embedding_model_version: String,
    /// Free-form metadata (document_id, kb_id, filename, file_type).
    pub metadata: serde_json::Value,
}

/// The vector-store-side entity. Not persisted in the relational catalog; lives entirely
/// inside the vector store adapter under the KB's collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    /// Identical to the owning [`Chunk`]'s id.
    pub id: Uuid,
    /// The embedding vector.
    pub vector: Vec<f32>,
    /// Non-vector fields used for filtering and result hydration.
    pub payload: VectorPayload,
}

/// The payload attached to a [`VectorRecord`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorPayload {
    /// Owning document.
    pub document_id: Uuid,
    /// Owning knowledge base.
    pub kb_id: Uuid,
    /// Position of the chunk within its document.
    pub chunk_index: u32,
    /// The chunk's text, used to hydrate [`SearchResult::content`] without a catalog round trip.
    pub content: String,
    /// Original file name.
    pub file_name: String,
    /// File type.
    pub file_type: String,
    /// Start offset in the source document.
    pub start_char: usize,
    /// End offset in the source document.
    pub end_char: usize,
}

/// A ranked, ephemeral hit returned by the retrieval pipeline. Never persisted except as a
/// bounded list inside the search cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The matched chunk's id.
    pub chunk_id: Uuid,
    /// The chunk's owning document.
    pub document_id: Uuid,
    /// Relevance score. Semantics depend on the mode (cosine similarity, full-text rank, or
    /// a post-fusion/post-rerank composite) — always higher-is-better.
    pub score: f32,
    /// The chunk's text.
    pub content: String,
    /// Arbitrary metadata accumulated through retrieval/fusion/rerank, e.g.
    /// `{fusion_method, rrf_k, semantic_score, keyword_score}` or
    /// `{rerank_provider, rerank_model, original_score}`.
    pub metadata: serde_json::Value,
    /// Optional highlighted snippets (keyword search only).
    pub highlights: Option<Vec<String>>,
}

/// Search mode requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Vector similarity search only.
    Semantic,
    /// Full-text/keyword search only.
    Keyword,
    /// Both, fused.
    Hybrid,
}

/// Filter schema passed through unchanged to the vector store and keyword index adapters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Restrict to these document ids.
    pub document_ids: Option<Vec<Uuid>>,
    /// Restrict to these file types.
    pub file_types: Option<Vec<String>>,
    /// Restrict to documents created on or after this time.
    pub date_from: Option<chrono::DateTime<chrono::Utc>>,
    /// Restrict to documents created on or before this time.
    pub date_to: Option<chrono::DateTime<chrono::Utc>>,
    /// Restrict to chunks tagged with any of these tags.
    pub tags: Option<Vec<String>>,
    /// Arbitrary additional metadata equality filters.
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl SearchFilters {
    /// True if no constraint is set.
    pub fn is_empty(&self) -> bool {
        self.document_ids.is_none()
            && self.file_types.is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
            && self.tags.is_none()
            && self.metadata.is_none()
    }
}

/// A single value-or-operator filter applied to a vector store field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldFilter {
    /// Exact match.
    Eq(serde_json::Value),
    /// `{"$in": [...]}`
    In {
        /// The accepted set of values.
        #[serde(rename = "$in")]
        values: Vec<serde_json::Value>,
    },
    /// `{"$gte": x}`
    Gte {
        /// The inclusive lower bound.
        #[serde(rename = "$gte")]
        value: serde_json::Value,
    },
    /// `{"$lte": x}`
    Lte {
        /// The inclusive upper bound.
        #[serde(rename = "$lte")]
        value: serde_json::Value,
    },
}

/// A flattened, ANDed set of field filters handed to [`crate::domain::ports::vector_store::VectorStoreProvider::search`].
pub type VectorFilters = HashMap<String, FieldFilter>;

/// Default embedding batch size.
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 100;
/// Default embedding retry budget.
pub const DEFAULT_EMBEDDING_MAX_RETRIES: u32 = 3;

/// Embedding usage accounting returned alongside vectors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingUsage {
    /// Tokens in the input.
    pub prompt_tokens: u64,
    /// Total tokens billed (providers may include overhead beyond the prompt).
    pub total_tokens: u64,
}

/// Result of an [`crate::domain::ports::embedding::EmbeddingProvider::embed_batch`] call.
#[derive(Debug, Clone)]
pub struct EmbeddingBatchResult {
    /// One vector per input text, in the same order as the request.
    pub vectors: Vec<Vec<f32>>,
    /// The model that produced the vectors.
    pub model: String,
    /// Usage accounting for this call.
    pub usage: EmbeddingUsage,
    /// Wall-clock latency of the call.
    pub latency_ms: u64,
}

/// One entry of the embedding client's ring-buffered call log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingLogEntry {
    /// Provider name ("openai", "azure", "mock", ...).
    pub provider: String,
    /// Model name.
    pub model: String,
    /// Number of input texts in the batch.
    pub input_len: usize,
    /// Dimension of the returned vectors.
    pub output_dimension: usize,
    /// Tokens billed.
    pub token_count: u64,
    /// Wall-clock latency of the call.
    pub latency_ms: u64,
    /// `"ok"` or a short failure description.
    pub status: String,
    /// Rough cost estimate in USD, if the provider has known per-token pricing.
    pub cost_estimate_usd: Option<f64>,
    /// When the call was recorded.
    pub at: chrono::DateTime<chrono::Utc>,
}

/// Maximum number of entries retained by the embedding client's call log.
pub const EMBEDDING_LOG_CAPACITY: usize = 1000;
