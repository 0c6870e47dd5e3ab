//! The platform's external interface: the thin HTTP/ops surface in `crate::server` calls
//! nothing but the methods on [`KbCore`].

use crate::application::context::AppContext;
use crate::application::pipeline::ProcessingPipeline;
use crate::application::queue_worker::{self, QueueWorker};
use crate::application::retrieval::RetrievalPipeline;
use crate::config::Config;
use crate::domain::error::{Error, Result};
use crate::domain::types::{Document, DocumentStatus, SearchFilters, SearchMode, SearchResult, SourceType};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// The platform facade: every external operation is a method here. Holds the shared
/// [`AppContext`] plus the two pipelines built over it.
pub struct KbCore {
    /// Shared collaborators; exposed so callers (tests, the thin HTTP surface) can reach the
    /// catalog directly for KB lifecycle operations, which are out of scope for this crate's
    /// own API (user/permission CRUD).
    pub context: Arc<AppContext>,
    pipeline: Arc<ProcessingPipeline>,
    retrieval: RetrievalPipeline,
}

impl KbCore {
    /// Builds every collaborator from `config` and the two pipelines over them.
    pub fn new(config: Config) -> Result<Self> {
        let context = Arc::new(AppContext::build(config)?);
        Self::from_context(context)
    }

    /// Builds on top of an already-constructed [`AppContext`] (used by tests that need to seed
    /// data before wiring the pipelines).
    pub fn from_context(context: Arc<AppContext>) -> Result<Self> {
        let pipeline = Arc::new(ProcessingPipeline::new(context.clone()));
        let retrieval = RetrievalPipeline::new(context.clone());
        Ok(Self { context, pipeline, retrieval })
    }

    /// Spawns the background worker pool that drains the task queue continuously. Returns a
    /// handle whose `run` future never resolves in normal operation.
    pub fn spawn_workers(&self) -> Arc<QueueWorker> {
        let queue_config = &self.context.config.queue;
        Arc::new(QueueWorker::new(
            self.context.queue.clone(),
            self.pipeline.clone(),
            Duration::from_secs(queue_config.visibility_timeout_secs),
            queue_config.worker_concurrency,
        ))
    }

    /// Uploads raw document bytes, stores them, and enqueues processing. The caller is
    /// responsible for authorization before calling this; auth is external to this crate.
    pub async fn upload_document(&self, kb_id: Uuid, file_name: String, bytes: Vec<u8>) -> Result<Document> {
        self.ingest(kb_id, file_name, bytes, SourceType::Upload).await
    }

    /// Pushes pre-extracted UTF-8 text as a document, bypassing the parser stage's file-type
    /// detection concerns (the pipeline still runs the text parser over it, so extraction and
    /// chunking stay uniform).
    pub async fn push_document(&self, kb_id: Uuid, file_name: String, text: String) -> Result<Document> {
        self.ingest(kb_id, file_name, text.into_bytes(), SourceType::Api).await
    }

    async fn ingest(&self, kb_id: Uuid, file_name: String, bytes: Vec<u8>, source_type: SourceType) -> Result<Document> {
        let kb = self.context.catalog.get_kb(kb_id).await?;
        let file_type = extension_of(&file_name)?;
        if self.context.parsers.resolve(&file_type).is_none() {
            return Err(Error::UnsupportedFileType { extension: file_type });
        }

        let content_hash = hex::encode(Sha256::digest(&bytes));
        let id = Uuid::new_v4();
        let blob_path = format!("{}{}/{}", kb.blob_prefix(), id, file_name);
        self.context.object_store.put(&blob_path, bytes.clone()).await?;

        let now = chrono::Utc::now();
        let document = Document {
            id,
            kb_id,
            file_name,
            file_type,
            byte_size: bytes.len() as u64,
            blob_path,
            content_hash,
            status: DocumentStatus::Pending,
            source_type,
            chunk_count: 0,
            retry_count: 0,
            error_message: None,
            version: 0,
            created_at: now,
            updated_at: now,
            processed_at: None,
        };
        let document = self.context.catalog.create_document(document).await?;
        self.context.catalog.adjust_kb_counters(kb_id, 1, 0).await?;
        self.context.queue.enqueue(document.id, kb_id, false).await?;
        Ok(document)
    }

    /// Re-enqueues documents for processing from scratch, bypassing the `Completed`/`Failed`
    /// skip check.
    pub async fn reprocess_documents(&self, document_ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let mut task_ids = Vec::with_capacity(document_ids.len());
        for &document_id in document_ids {
            let document = self.context.catalog.get_document(document_id).await?;
            task_ids.push(self.context.queue.enqueue(document_id, document.kb_id, true).await?);
        }
        Ok(task_ids)
    }

    /// Re-enqueues every document in a KB for processing, returning the number of documents
    /// re-enqueued.
    pub async fn rebuild_kb(&self, kb_id: Uuid) -> Result<usize> {
        let documents = self.context.catalog.list_documents(kb_id).await?;
        let count = documents.len();
        for document in documents {
            self.context.queue.enqueue(document.id, kb_id, true).await?;
        }
        Ok(count)
    }

    /// Deletes a document and cascades to its chunks, vectors, keyword index entries, and blob,
    /// then invalidates the KB's search cache.
    pub async fn delete_document(&self, document_id: Uuid) -> Result<()> {
        let document = self.context.catalog.get_document(document_id).await?;
        let kb = self.context.catalog.get_kb(document.kb_id).await?;
        let chunks = self.context.catalog.get_chunks(document_id).await?;

        let chunk_ids: Vec<Uuid> = chunks.iter().map(|c| c.id).collect();
        if !chunk_ids.is_empty() {
            self.context.vector_store.delete(&kb.collection_name(), &chunk_ids).await?;
        }
        for chunk in &chunks {
            self.context.keyword_index.remove_chunk(document.kb_id, chunk.id).await?;
        }
        self.context.object_store.delete(&document.blob_path).await?;

        self.context.catalog.delete_document(document_id).await?;
        self.context
            .catalog
            .adjust_kb_counters(document.kb_id, -1, -(chunks.len() as i64))
            .await?;
        self.context.cache.invalidate_kb(document.kb_id).await?;
        tracing::info!(%document_id, kb_id = %document.kb_id, "document deleted");
        Ok(())
    }

    /// Runs a search.
    pub async fn search(
        &self,
        kb_id: Uuid,
        query: &str,
        mode: SearchMode,
        top_k: usize,
        score_threshold: f32,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(Error::validation("search query must not be empty"));
        }
        self.retrieval.search(kb_id, query, mode, top_k, score_threshold, filters).await
    }

    /// Clears every cached search result for a KB.
    pub async fn clear_kb_cache(&self, kb_id: Uuid) -> Result<()> {
        self.context.cache.invalidate_kb(kb_id).await
    }

    /// Synchronously drains every currently-queued processing task, returning the number
    /// processed. Used by deployments without a standing worker pool.
    pub async fn process_pending(&self) -> Result<usize> {
        let visibility_timeout = Duration::from_secs(self.context.config.queue.visibility_timeout_secs);
        queue_worker::drain_once(self.context.queue.as_ref(), &self.pipeline, visibility_timeout).await
    }
}

/// Extracts a lower-cased file extension from a file name, rejecting names with none.
fn extension_of(file_name: &str) -> Result<String> {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .ok_or_else(|| Error::validation(format!("file name '{file_name}' has no extension")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{KnowledgeBase, Visibility};

    fn test_kb() -> KnowledgeBase {
        let now = chrono::Utc::now();
        KnowledgeBase {
            id: Uuid::new_v4(),
            name: "kb".to_string(),
            description: String::new(),
            owner_id: Uuid::new_v4(),
            visibility: Visibility::Private,
            embedding_provider: "mock".to_string(),
            embedding_model: "mock".to_string(),
            embedding_dimension: 8,
            tags: vec![],
            document_count: 0,
            chunk_count: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    async fn build_core() -> (KbCore, KnowledgeBase) {
        let config = crate::config::load_embedded_defaults().unwrap();
        let context = Arc::new(AppContext::build(config).unwrap());
        let kb = context.catalog.create_kb(test_kb()).await.unwrap();
        (KbCore::from_context(context).unwrap(), kb)
    }

    #[tokio::test]
    async fn upload_then_process_then_search_round_trip() {
        let (core, kb) = build_core().await;
        let document = core
            .upload_document(kb.id, "notes.txt".to_string(), b"rust ownership and borrowing rules".to_vec())
            .await
            .unwrap();

        let processed = core.process_pending().await.unwrap();
        assert_eq!(processed, 1);

        let reloaded = core.context.catalog.get_document(document.id).await.unwrap();
        assert_eq!(reloaded.status, DocumentStatus::Completed);

        let results = core
            .search(kb.id, "ownership", SearchMode::Hybrid, 5, 0.0, &SearchFilters::default())
            .await
            .unwrap();
        assert!(!results.is_empty());
    }

    #[tokio::test]
    async fn upload_rejects_unknown_extension() {
        let (core, kb) = build_core().await;
        let err = core.upload_document(kb.id, "file.exe".to_string(), b"x".to_vec()).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType { .. }));
    }

    #[tokio::test]
    async fn delete_document_cascades_and_invalidates_cache() {
        let (core, kb) = build_core().await;
        let document = core
            .push_document(kb.id, "a.txt".to_string(), "some pushed text content to chunk".to_string())
            .await
            .unwrap();
        core.process_pending().await.unwrap();

        core.delete_document(document.id).await.unwrap();
        assert!(core.context.catalog.get_document(document.id).await.is_err());
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let (core, kb) = build_core().await;
        let err = core.search(kb.id, "   ", SearchMode::Hybrid, 5, 0.0, &SearchFilters::default()).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }
}
