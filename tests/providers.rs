//! Integration tests for provider-facing scenarios: embedding transient-failure recovery, forced
//! reprocessing, and cache invalidation on delete, exercised through `KbCore`'s public API.

use kbcore::adapters::embedding::OpenAiCompatibleConfig;
use kbcore::application::api::KbCore;
use kbcore::application::context::AppContext;
use kbcore::domain::ports::cache::SearchCacheProvider;
use kbcore::domain::ports::catalog::CatalogStore;
use kbcore::domain::ports::object_store::ObjectStoreProvider;
use kbcore::domain::types::{DocumentStatus, KnowledgeBase, SearchFilters, SearchMode, Visibility};
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
        embedding_provider: "openai".to_string(),
        embedding_model: "text-embedding-3-small".to_string(),
        embedding_dimension: 8,
        tags: vec![],
        document_count: 0,
        chunk_count: 0,
        version: 0,
        created_at: now,
        updated_at: now,
    }
}

/// S5: the embedding backend answers 429 twice before succeeding. Processing must still complete:
/// the provider's own retry loop absorbs the transient failures, so the document goes straight to
/// `Completed` and its `retry_count` (a document-level, not an HTTP-level, counter) stays at 0.
#[tokio::test]
async fn embedding_backend_recovers_after_two_429_responses() {
    let mut server = mockito::Server::new_async().await;

    let success_body = serde_json::json!({
        "data": [{"embedding": [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8], "index": 0}],
        "usage": {"prompt_tokens": 6, "total_tokens": 6},
    });

    // mockito matches the most recently created mock first, falling through to older ones once
    // a mock's `.expect()` count is exhausted — so the always-available 200 response is
    // registered first, and the 429 (limited to 2 matches) is registered after it.
    let ok_mock = server
        .mock("POST", "/embeddings")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(success_body.to_string())
        .create_async()
        .await;
    let failing_mock = server
        .mock("POST", "/embeddings")
        .with_status(429)
        .expect(2)
        .create_async()
        .await;

    let mut config = kbcore::config::load_embedded_defaults().unwrap();
    config.providers.embedding.kind = "openai".to_string();
    config.providers.embedding.openai = Some(OpenAiCompatibleConfig {
        provider_name: "openai".to_string(),
        base_url: server.url(),
        api_key: "test-key".to_string(),
        api_key_header: "Authorization".to_string(),
        model: "text-embedding-3-small".to_string(),
        dimensions: 8,
        batch_size: 100,
        max_retries: 3,
        usd_per_million_tokens: None,
    });

    let context = Arc::new(AppContext::build(config).unwrap());
    let kb = context.catalog.create_kb(test_kb()).await.unwrap();
    let core = KbCore::from_context(context.clone()).unwrap();

    let document = core.push_document(kb.id, "short.txt".to_string(), "a short document".to_string()).await.unwrap();
    let processed = core.process_pending().await.unwrap();
    assert_eq!(processed, 1);

    let reloaded = context.catalog.get_document(document.id).await.unwrap();
    assert_eq!(reloaded.status, DocumentStatus::Completed);
    assert_eq!(reloaded.retry_count, 0);

    failing_mock.assert_async().await;
    ok_mock.assert_async().await;
}

/// S4: forcing a reprocess after the underlying content shrinks must leave the catalog with the
/// new, smaller chunk set rather than a union of old and new chunks.
#[tokio::test]
async fn forced_reprocess_with_shrunk_content_replaces_the_chunk_set() {
    let mut config = kbcore::config::load_embedded_defaults().unwrap();
    config.chunking.chunk_size = 20;
    config.chunking.chunk_overlap = 0;
    config.chunking.min_chunk_size = 1;

    let context = Arc::new(AppContext::build(config).unwrap());
    let mut kb_seed = test_kb();
    kb_seed.embedding_provider = "mock".to_string();
    let kb = context.catalog.create_kb(kb_seed).await.unwrap();
    let core = KbCore::from_context(context.clone()).unwrap();

    let long_text = "Rust ownership and borrowing rules govern every reference in the language, \
                      and the compiler enforces them at compile time without a garbage collector.";
    let document = core.push_document(kb.id, "doc.txt".to_string(), long_text.to_string()).await.unwrap();
    core.process_pending().await.unwrap();

    let first_pass = context.catalog.get_document(document.id).await.unwrap();
    assert_eq!(first_pass.status, DocumentStatus::Completed);
    let first_chunk_count = first_pass.chunk_count;
    assert!(first_chunk_count > 1);

    context.object_store.put(&document.blob_path, b"short.".to_vec()).await.unwrap();
    core.reprocess_documents(&[document.id]).await.unwrap();
    core.process_pending().await.unwrap();

    let second_pass = context.catalog.get_document(document.id).await.unwrap();
    assert_eq!(second_pass.status, DocumentStatus::Completed);
    assert!(second_pass.chunk_count < first_chunk_count);

    let chunks = context.catalog.get_chunks(document.id).await.unwrap();
    assert_eq!(chunks.len() as u32, second_pass.chunk_count);
}

/// S6: deleting a document invalidates its KB's search cache, so a repeated identical query
/// after the delete is a genuine cache miss rather than a stale hit on now-invalid results.
#[tokio::test]
async fn deleting_a_document_invalidates_the_kb_search_cache() {
    let config = kbcore::config::load_embedded_defaults().unwrap();
    let context = Arc::new(AppContext::build(config).unwrap());
    let mut kb_seed = test_kb();
    kb_seed.embedding_provider = "mock".to_string();
    let kb = context.catalog.create_kb(kb_seed).await.unwrap();
    let core = KbCore::from_context(context.clone()).unwrap();

    let document = core
        .push_document(kb.id, "doc.txt".to_string(), "the quick brown fox jumps over the lazy dog".to_string())
        .await
        .unwrap();
    core.process_pending().await.unwrap();

    let filters = SearchFilters::default();
    let first = core.search(kb.id, "quick fox", SearchMode::Hybrid, 5, 0.0, &filters).await.unwrap();
    assert!(!first.is_empty());
    let stats_after_miss = context.cache.stats();

    let second = core.search(kb.id, "quick fox", SearchMode::Hybrid, 5, 0.0, &filters).await.unwrap();
    assert_eq!(second.len(), first.len());
    let stats_after_hit = context.cache.stats();
    assert!(stats_after_hit.hits > stats_after_miss.hits);

    core.delete_document(document.id).await.unwrap();

    let third = core.search(kb.id, "quick fox", SearchMode::Hybrid, 5, 0.0, &filters).await.unwrap();
    assert!(third.is_empty());
    let stats_after_delete_search = context.cache.stats();
    assert!(stats_after_delete_search.misses > stats_after_hit.misses);
}
