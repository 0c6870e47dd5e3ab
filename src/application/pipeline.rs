//! Document processing pipeline: claim -> download -> parse -> chunk -> embed -> store -> index.

use crate::application::context::AppContext;
use crate::domain::error::{Error, Result};
use crate::domain::ports::catalog::DocumentPatch;
use crate::domain::types::{Chunk, DocumentStatus, VectorRecord};
use uuid::Uuid;

/// Runs the document processing pipeline against the collaborators in an [`AppContext`].
pub struct ProcessingPipeline {
    context: std::sync::Arc<AppContext>,
}

impl ProcessingPipeline {
    /// Build a pipeline over a shared [`AppContext`].
    pub fn new(context: std::sync::Arc<AppContext>) -> Self {
        Self { context }
    }

    /// Processes one document end to end through every pipeline stage.
    pub async fn process_document(&self, document_id: Uuid, force: bool) -> Result<()> {
        let catalog = &self.context.catalog;
        let started = std::time::Instant::now();

        // Step 1: an already-completed document is a no-op unless the caller asked to force a
        // reprocess (the task queue may redeliver at least once, and `rebuild_kb`/idle requeues
        // should not burn an embedding call on documents that never changed).
        let existing = catalog.get_document(document_id).await?;
        if existing.status == DocumentStatus::Completed && !force {
            tracing::debug!(%document_id, chunk_count = existing.chunk_count, "document already completed, skipping");
            return Ok(());
        }

        // Step 2: claim_document's CAS only refuses a document already `Processing`; a prior
        // `Completed`/`Failed`/`Pending` row is always claimable, which is exactly what a forced
        // reprocess needs.
        let Some(document) = catalog.claim_document(document_id).await? else {
            tracing::debug!(%document_id, "document already claimed by another worker, skipping");
            return Ok(());
        };

        match self.run(&document.kb_id, &document.id, &document).await {
            Ok(chunk_count) => {
                catalog
                    .update_document(
                        document_id,
                        DocumentPatch {
                            status: Some(DocumentStatus::Completed),
                            chunk_count: Some(chunk_count as u32),
                            error_message: Some(None),
                            processed_at: Some(chrono::Utc::now()),
                            ..Default::default()
                        },
                    )
                    .await?;
                self.context.cache.invalidate_kb(document.kb_id).await?;
                metrics::counter!("kbcore_documents_processed_total").increment(1);
                metrics::histogram!("kbcore_processing_duration_seconds").record(started.elapsed().as_secs_f64());
                tracing::info!(%document_id, kb_id = %document.kb_id, chunk_count, "document_completed");
                Ok(())
            }
            Err(err) => {
                catalog
                    .update_document(
                        document_id,
                        DocumentPatch {
                            status: Some(DocumentStatus::Failed),
                            retry_count: Some(document.retry_count + 1),
                            error_message: Some(Some(err.to_string())),
                            processed_at: Some(chrono::Utc::now()),
                            ..Default::default()
                        },
                    )
                    .await?;
                metrics::counter!("kbcore_documents_failed_total").increment(1);
                tracing::warn!(%document_id, kb_id = %document.kb_id, error = %err, "document_failed");
                Err(err)
            }
        }
    }

    async fn run(&self, kb_id: &Uuid, document_id: &Uuid, document: &crate::domain::types::Document) -> Result<usize> {
        let catalog = &self.context.catalog;
        let kb = catalog.get_kb(*kb_id).await?;
        let old_chunks = catalog.get_chunks(*document_id).await?;

        let bytes = self.context.object_store.get(&document.blob_path).await?;

        let parser = self
            .context
            .parsers
            .resolve(&document.file_type)
            .ok_or_else(|| Error::UnsupportedFileType { extension: document.file_type.clone() })?;
        let parsed = parser.parse(&bytes).await?;
        if parsed.is_empty_extraction() {
            return Err(Error::EmptyExtraction { document_id: *document_id });
        }

        let text_chunks = self.context.chunker.chunk(&parsed.full_text())?;
        if text_chunks.is_empty() {
            return Err(Error::EmptyExtraction { document_id: *document_id });
        }

        let model_version = self.context.embedding.model_name().to_string();
        let metadata = serde_json::json!({
            "document_id": document_id,
            "kb_id": kb_id,
            "file_name": document.file_name,
            "file_type": document.file_type,
        });

        let chunks: Vec<Chunk> = text_chunks
            .into_iter()
            .enumerate()
            .map(|(index, tc)| {
                let token_count = crate::domain::ports::chunker::estimate_token_count(&tc.content);
                Chunk {
                    id: Uuid::new_v4(),
                    document_id: *document_id,
                    kb_id: *kb_id,
                    chunk_index: index as u32,
                    content: tc.content,
                    start_char: tc.start_char,
                    end_char: tc.end_char,
                    token_count,
                    vector_id: None,
                    embedding_model_version: model_version.clone(),
                    metadata: metadata.clone(),
                }
            })
            .collect();

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let batch_size = self.context.config.pipeline.embedding_batch_size.max(1);
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size) {
            let result = self.context.embedding.embed_batch(batch).await?;
            vectors.extend(result.vectors);
        }
        if vectors.len() != chunks.len() {
            return Err(Error::data_integrity("embedding provider returned a different number of vectors than chunks"));
        }
        for vector in &vectors {
            if vector.len() != kb.embedding_dimension {
                return Err(Error::EmbeddingDimensionMismatch {
                    expected: kb.embedding_dimension,
                    actual: vector.len(),
                });
            }
        }

        let collection = kb.collection_name();

        if !old_chunks.is_empty() {
            let old_ids: Vec<Uuid> = old_chunks.iter().map(|c| c.id).collect();
            self.context.vector_store.delete(&collection, &old_ids).await?;
            for old_chunk in &old_chunks {
                self.context.keyword_index.remove_chunk(*kb_id, old_chunk.id).await?;
            }
        }

        self.context.vector_store.ensure_collection(&collection, kb.embedding_dimension).await?;

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(vectors.into_iter())
            .map(|(chunk, vector)| VectorRecord {
                id: chunk.id,
                vector,
                payload: crate::domain::types::VectorPayload {
                    document_id: *document_id,
                    kb_id: *kb_id,
                    chunk_index: chunk.chunk_index,
                    content: chunk.content.clone(),
                    file_name: document.file_name.clone(),
                    file_type: document.file_type.clone(),
                    start_char: chunk.start_char,
                    end_char: chunk.end_char,
                },
            })
            .collect();
        self.context.vector_store.upsert(&collection, records).await?;

        for chunk in &chunks {
            self.context
                .keyword_index
                .index_chunk(*kb_id, chunk.id, *document_id, &chunk.content)
                .await?;
        }

        catalog.replace_chunks(*document_id, chunks.clone()).await?;
        let chunk_ids: Vec<Uuid> = chunks.iter().map(|c| c.id).collect();
        catalog.set_vector_ids(&chunk_ids, &chunk_ids).await?;

        let chunk_delta = chunks.len() as i64 - old_chunks.len() as i64;
        catalog.adjust_kb_counters(*kb_id, 0, chunk_delta).await?;

        Ok(chunks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::context::AppContext;
    use crate::domain::types::{Document, KnowledgeBase, SourceType, Visibility};
    use std::sync::Arc;

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

    async fn build_context() -> Arc<AppContext> {
        let config = crate::config::load_embedded_defaults().unwrap();
        Arc::new(AppContext::build(config).unwrap())
    }

    #[tokio::test]
    async fn processes_a_small_text_document_end_to_end() {
        let context = build_context().await;
        let kb = context.catalog.create_kb(test_kb()).await.unwrap();

        let blob_path = format!("{}doc.txt", kb.blob_prefix());
        context.object_store.put(&blob_path, b"hello there. this is a small document.".to_vec()).await.unwrap();

        let now = chrono::Utc::now();
        let document = context
            .catalog
            .create_document(Document {
                id: Uuid::new_v4(),
                kb_id: kb.id,
                file_name: "doc.txt".to_string(),
                file_type: "txt".to_string(),
                byte_size: 39,
                blob_path,
                content_hash: "hash".to_string(),
                status: DocumentStatus::Pending,
                source_type: SourceType::Upload,
                chunk_count: 0,
                retry_count: 0,
                error_message: None,
                version: 0,
                created_at: now,
                updated_at: now,
                processed_at: None,
            })
            .await
            .unwrap();

        let pipeline = ProcessingPipeline::new(context.clone());
        pipeline.process_document(document.id, false).await.unwrap();

        let reloaded = context.catalog.get_document(document.id).await.unwrap();
        assert_eq!(reloaded.status, DocumentStatus::Completed);
        assert!(reloaded.chunk_count > 0);

        let chunks = context.catalog.get_chunks(document.id).await.unwrap();
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.vector_id.is_some()));
    }

    #[tokio::test]
    async fn missing_blob_fails_the_document() {
        let context = build_context().await;
        let kb = context.catalog.create_kb(test_kb()).await.unwrap();

        let now = chrono::Utc::now();
        let document = context
            .catalog
            .create_document(Document {
                id: Uuid::new_v4(),
                kb_id: kb.id,
                file_name: "missing.txt".to_string(),
                file_type: "txt".to_string(),
                byte_size: 0,
                blob_path: format!("{}missing.txt", kb.blob_prefix()),
                content_hash: "hash".to_string(),
                status: DocumentStatus::Pending,
                source_type: SourceType::Upload,
                chunk_count: 0,
                retry_count: 0,
                error_message: None,
                version: 0,
                created_at: now,
                updated_at: now,
                processed_at: None,
            })
            .await
            .unwrap();

        let pipeline = ProcessingPipeline::new(context.clone());
        assert!(pipeline.process_document(document.id, false).await.is_err());

        let reloaded = context.catalog.get_document(document.id).await.unwrap();
        assert_eq!(reloaded.status, DocumentStatus::Failed);
        assert_eq!(reloaded.retry_count, 1);
        assert!(reloaded.error_message.is_some());
    }

    #[tokio::test]
    async fn a_claimed_document_is_skipped_by_a_second_call() {
        let context = build_context().await;
        let kb = context.catalog.create_kb(test_kb()).await.unwrap();
        let blob_path = format!("{}doc.txt", kb.blob_prefix());
        context.object_store.put(&blob_path, b"some content here".to_vec()).await.unwrap();

        let now = chrono::Utc::now();
        let document = context
            .catalog
            .create_document(Document {
                id: Uuid::new_v4(),
                kb_id: kb.id,
                file_name: "doc.txt".to_string(),
                file_type: "txt".to_string(),
                byte_size: 17,
                blob_path,
                content_hash: "hash".to_string(),
                status: DocumentStatus::Pending,
                source_type: SourceType::Upload,
                chunk_count: 0,
                retry_count: 0,
                error_message: None,
                version: 0,
                created_at: now,
                updated_at: now,
                processed_at: None,
            })
            .await
            .unwrap();

        context.catalog.claim_document(document.id).await.unwrap();

        let pipeline = ProcessingPipeline::new(context.clone());
        pipeline.process_document(document.id, false).await.unwrap();

        let reloaded = context.catalog.get_document(document.id).await.unwrap();
        assert_eq!(reloaded.status, DocumentStatus::Processing);
    }

    #[tokio::test]
    async fn a_completed_document_is_a_no_op_unless_forced() {
        let context = build_context().await;
        let kb = context.catalog.create_kb(test_kb()).await.unwrap();
        let blob_path = format!("{}doc.txt", kb.blob_prefix());
        context.object_store.put(&blob_path, b"first version of the document content".to_vec()).await.unwrap();

        let now = chrono::Utc::now();
        let document = context
            .catalog
            .create_document(Document {
                id: Uuid::new_v4(),
                kb_id: kb.id,
                file_name: "doc.txt".to_string(),
                file_type: "txt".to_string(),
                byte_size: 38,
                blob_path: blob_path.clone(),
                content_hash: "hash".to_string(),
                status: DocumentStatus::Pending,
                source_type: SourceType::Upload,
                chunk_count: 0,
                retry_count: 0,
                error_message: None,
                version: 0,
                created_at: now,
                updated_at: now,
                processed_at: None,
            })
            .await
            .unwrap();

        let pipeline = ProcessingPipeline::new(context.clone());
        pipeline.process_document(document.id, false).await.unwrap();
        let completed = context.catalog.get_document(document.id).await.unwrap();
        assert_eq!(completed.status, DocumentStatus::Completed);
        let completed_version = completed.version;

        // Redelivery without force must not reprocess: no version bump, no reclaim.
        pipeline.process_document(document.id, false).await.unwrap();
        let unchanged = context.catalog.get_document(document.id).await.unwrap();
        assert_eq!(unchanged.version, completed_version);

        // Force reprocess claims and runs again even though the document is already completed.
        context.object_store.put(&blob_path, b"second, force-reprocessed version".to_vec()).await.unwrap();
        pipeline.process_document(document.id, true).await.unwrap();
        let reprocessed = context.catalog.get_document(document.id).await.unwrap();
        assert_eq!(reprocessed.status, DocumentStatus::Completed);
        assert!(reprocessed.version > completed_version);
    }
}
