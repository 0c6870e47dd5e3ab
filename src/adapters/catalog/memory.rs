use crate::domain::error::{Error, Result};
use crate::domain::ports::catalog::{CatalogStore, DocumentPatch};
use crate::domain::types::{Chunk, Document, DocumentStatus, KnowledgeBase};
use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

/// In-memory [`CatalogStore`]: the default backend, and the one integration tests and the
/// pipeline's own unit tests run against. A `DashMap` entry lock stands in for a row lock,
/// which is enough to give [`claim_document`](Self::claim_document) the same CAS guarantee a
/// real `UPDATE ... WHERE status = 'pending'` would provide.
#[derive(Default)]
pub struct InMemoryCatalogStore {
    kbs: DashMap<Uuid, KnowledgeBase>,
    documents: DashMap<Uuid, Document>,
    chunks: DashMap<Uuid, Vec<Chunk>>,
}

impl InMemoryCatalogStore {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn create_kb(&self, kb: KnowledgeBase) -> Result<KnowledgeBase> {
        self.kbs.insert(kb.id, kb.clone());
        Ok(kb)
    }

    async fn get_kb(&self, id: Uuid) -> Result<KnowledgeBase> {
        self.kbs
            .get(&id)
            .map(|r| r.clone())
            .ok_or_else(|| Error::not_found(format!("knowledge base {id}")))
    }

    async fn list_kbs(&self, owner_id: Uuid) -> Result<Vec<KnowledgeBase>> {
        Ok(self
            .kbs
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .map(|r| r.clone())
            .collect())
    }

    async fn delete_kb(&self, id: Uuid) -> Result<()> {
        self.kbs.remove(&id);
        let doc_ids: Vec<Uuid> = self
            .documents
            .iter()
            .filter(|r| r.kb_id == id)
            .map(|r| *r.key())
            .collect();
        for doc_id in doc_ids {
            self.documents.remove(&doc_id);
            self.chunks.remove(&doc_id);
        }
        Ok(())
    }

    async fn adjust_kb_counters(&self, id: Uuid, document_delta: i64, chunk_delta: i64) -> Result<()> {
        let mut kb = self
            .kbs
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("knowledge base {id}")))?;
        kb.document_count = (kb.document_count as i64 + document_delta).max(0) as u64;
        kb.chunk_count = (kb.chunk_count as i64 + chunk_delta).max(0) as u64;
        kb.version += 1;
        kb.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn create_document(&self, document: Document) -> Result<Document> {
        self.documents.insert(document.id, document.clone());
        Ok(document)
    }

    async fn get_document(&self, id: Uuid) -> Result<Document> {
        self.documents
            .get(&id)
            .map(|r| r.clone())
            .ok_or_else(|| Error::not_found(format!("document {id}")))
    }

    async fn list_documents(&self, kb_id: Uuid) -> Result<Vec<Document>> {
        Ok(self
            .documents
            .iter()
            .filter(|r| r.kb_id == kb_id)
            .map(|r| r.clone())
            .collect())
    }

    async fn delete_document(&self, id: Uuid) -> Result<()> {
        self.documents.remove(&id);
        self.chunks.remove(&id);
        Ok(())
    }

    async fn claim_document(&self, id: Uuid) -> Result<Option<Document>> {
        let mut entry = self
            .documents
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("document {id}")))?;

        if entry.status == DocumentStatus::Processing {
            return Ok(None);
        }

        entry.status = DocumentStatus::Processing;
        entry.version += 1;
        entry.updated_at = chrono::Utc::now();
        Ok(Some(entry.clone()))
    }

    async fn update_document(&self, id: Uuid, patch: DocumentPatch) -> Result<Document> {
        let mut entry = self
            .documents
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("document {id}")))?;

        if let Some(status) = patch.status {
            entry.status = status;
        }
        if let Some(chunk_count) = patch.chunk_count {
            entry.chunk_count = chunk_count;
        }
        if let Some(retry_count) = patch.retry_count {
            entry.retry_count = retry_count;
        }
        if let Some(error_message) = patch.error_message {
            entry.error_message = error_message;
        }
        if let Some(processed_at) = patch.processed_at {
            entry.processed_at = Some(processed_at);
        }
        entry.version += 1;
        entry.updated_at = chrono::Utc::now();
        Ok(entry.clone())
    }

    async fn replace_chunks(&self, document_id: Uuid, chunks: Vec<Chunk>) -> Result<()> {
        self.chunks.insert(document_id, chunks);
        Ok(())
    }

    async fn get_chunks(&self, document_id: Uuid) -> Result<Vec<Chunk>> {
        let mut chunks = self.chunks.get(&document_id).map(|r| r.clone()).unwrap_or_default();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn get_chunks_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Chunk>> {
        let wanted: std::collections::HashSet<Uuid> = ids.iter().copied().collect();
        Ok(self
            .chunks
            .iter()
            .flat_map(|r| r.value().clone())
            .filter(|c| wanted.contains(&c.id))
            .collect())
    }

    async fn set_vector_ids(&self, chunk_ids: &[Uuid], vector_ids: &[Uuid]) -> Result<()> {
        if chunk_ids.len() != vector_ids.len() {
            return Err(Error::internal("chunk_ids and vector_ids length mismatch"));
        }
        let assignment: std::collections::HashMap<Uuid, Uuid> =
            chunk_ids.iter().copied().zip(vector_ids.iter().copied()).collect();
        for mut entry in self.chunks.iter_mut() {
            for chunk in entry.value_mut().iter_mut() {
                if let Some(vector_id) = assignment.get(&chunk.id) {
                    chunk.vector_id = Some(*vector_id);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{SourceType, Visibility};

    fn kb() -> KnowledgeBase {
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

    fn document(kb_id: Uuid) -> Document {
        let now = chrono::Utc::now();
        Document {
            id: Uuid::new_v4(),
            kb_id,
            file_name: "a.txt".to_string(),
            file_type: "txt".to_string(),
            byte_size: 3,
            blob_path: "p".to_string(),
            content_hash: "h".to_string(),
            status: DocumentStatus::Pending,
            source_type: SourceType::Upload,
            chunk_count: 0,
            retry_count: 0,
            error_message: None,
            version: 0,
            created_at: now,
            updated_at: now,
            processed_at: None,
        }
    }

    #[tokio::test]
    async fn claim_is_exclusive() {
        let store = InMemoryCatalogStore::new();
        let kb = store.create_kb(kb()).await.unwrap();
        let doc = store.create_document(document(kb.id)).await.unwrap();

        let first = store.claim_document(doc.id).await.unwrap();
        assert!(first.is_some());
        let second = store.claim_document(doc.id).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn finalize_updates_chunk_count_and_status() {
        let store = InMemoryCatalogStore::new();
        let kb = store.create_kb(kb()).await.unwrap();
        let doc = store.create_document(document(kb.id)).await.unwrap();
        store.claim_document(doc.id).await.unwrap();

        store
            .update_document(
                doc.id,
                DocumentPatch {
                    status: Some(DocumentStatus::Completed),
                    chunk_count: Some(2),
                    processed_at: Some(chrono::Utc::now()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let reloaded = store.get_document(doc.id).await.unwrap();
        assert_eq!(reloaded.status, DocumentStatus::Completed);
        assert_eq!(reloaded.chunk_count, 2);
    }

    #[tokio::test]
    async fn delete_kb_cascades_to_documents() {
        let store = InMemoryCatalogStore::new();
        let kb = store.create_kb(kb()).await.unwrap();
        let doc = store.create_document(document(kb.id)).await.unwrap();
        store.delete_kb(kb.id).await.unwrap();
        assert!(store.get_document(doc.id).await.is_err());
    }
}
