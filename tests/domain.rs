//! Integration tests for chunking strategy selection and core domain types, exercised through
//! the public `kbcore` API end to end rather than through a single module's unit tests.

use kbcore::application::context::AppContext;
use kbcore::application::api::KbCore;
use kbcore::chunking::{ChunkStrategy, ChunkerConfig};
use kbcore::domain::ports::catalog::CatalogStore;
use kbcore::domain::types::{DocumentStatus, KnowledgeBase, SourceType, Visibility};
use std::sync::Arc;
use uuid::Uuid;

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

/// S1: a short document made of three clearly separated paragraphs, chunked with the semantic
/// strategy, ends up as exactly three chunks, one per paragraph.
#[tokio::test]
async fn small_document_with_semantic_chunking_yields_one_chunk_per_paragraph() {
    let mut config = kbcore::config::load_embedded_defaults().unwrap();
    config.chunking = ChunkerConfig {
        strategy: ChunkStrategy::Semantic,
        ..ChunkerConfig::default()
    };
    let context = Arc::new(AppContext::build(config).unwrap());
    let kb = context.catalog.create_kb(test_kb()).await.unwrap();
    let core = KbCore::from_context(context.clone()).unwrap();

    let text = "Rust's ownership model tracks exactly one owner per value.\n\n\
                Borrowing lets callers read or mutate a value without taking ownership of it.\n\n\
                Lifetimes let the compiler check that borrows never outlive their owner.";
    let document = core.push_document(kb.id, "ownership.txt".to_string(), text.to_string()).await.unwrap();

    let processed = core.process_pending().await.unwrap();
    assert_eq!(processed, 1);

    let reloaded = context.catalog.get_document(document.id).await.unwrap();
    assert_eq!(reloaded.status, DocumentStatus::Completed);
    assert_eq!(reloaded.chunk_count, 3);

    let chunks = context.catalog.get_chunks(document.id).await.unwrap();
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.vector_id.is_some()));
}

/// A document pushed as pre-extracted text is recorded with `SourceType::Api`, matching spec
/// §3's source-type taxonomy, while an uploaded one is `SourceType::Upload`.
#[tokio::test]
async fn push_and_upload_record_distinct_source_types() {
    let config = kbcore::config::load_embedded_defaults().unwrap();
    let context = Arc::new(AppContext::build(config).unwrap());
    let kb = context.catalog.create_kb(test_kb()).await.unwrap();
    let core = KbCore::from_context(context.clone()).unwrap();

    let pushed = core.push_document(kb.id, "notes.txt".to_string(), "pushed text content".to_string()).await.unwrap();
    assert_eq!(pushed.source_type, SourceType::Api);

    let uploaded = core.upload_document(kb.id, "upload.txt".to_string(), b"uploaded text content".to_vec()).await.unwrap();
    assert_eq!(uploaded.source_type, SourceType::Upload);
}

/// `KnowledgeBase::collection_name` and the free-standing `collection_name_for` must agree, since
/// deletion cascades look a KB's vector-store collection up by id alone, without a `KnowledgeBase`
/// value in hand.
#[tokio::test]
async fn collection_name_is_namespaced_per_kb_and_agrees_with_the_free_function() {
    let config = kbcore::config::load_embedded_defaults().unwrap();
    let context = Arc::new(AppContext::build(config).unwrap());
    let kb_a = context.catalog.create_kb(test_kb()).await.unwrap();
    let kb_b = context.catalog.create_kb(test_kb()).await.unwrap();

    assert_eq!(kb_a.collection_name(), kbcore::domain::types::collection_name_for(&kb_a.id));
    assert_ne!(kb_a.collection_name(), kb_b.collection_name());
}
