//! Hybrid retrieval: concurrent semantic + keyword search, fusion, optional rerank, caching.

use crate::application::cache::SearchCache;
use crate::application::context::AppContext;
use crate::application::fusion::{self, FusionParams};
use crate::domain::error::Result;
use crate::domain::types::{FieldFilter, SearchFilters, SearchMode, SearchResult, VectorFilters};
use std::sync::Arc;
use uuid::Uuid;

/// Runs semantic/keyword/hybrid search against the collaborators in an [`AppContext`], applying
/// fusion, reranking, and result caching.
pub struct RetrievalPipeline {
    context: Arc<AppContext>,
    cache: SearchCache,
}

impl RetrievalPipeline {
    /// Build a retrieval pipeline over a shared [`AppContext`].
    pub fn new(context: Arc<AppContext>) -> Self {
        let cache = SearchCache::new(
            context.cache.clone(),
            context.config.cache.key_prefix.clone(),
            context.config.cache.cache_empty,
        );
        Self { context, cache }
    }

    /// Runs a search and returns results ranked best-first, truncated to `top_k`.
    pub async fn search(
        &self,
        kb_id: Uuid,
        query: &str,
        mode: SearchMode,
        top_k: usize,
        score_threshold: f32,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>> {
        let started = std::time::Instant::now();
        let retrieval_config = &self.context.config.retrieval;
        let fingerprint = self.cache.fingerprint(query, mode, top_k, score_threshold, filters, retrieval_config.fusion_method);

        if let Some(cached) = self.cache.get(kb_id, &fingerprint).await {
            metrics::counter!("kbcore_search_cache_hits_total").increment(1);
            return Ok(cached);
        }
        metrics::counter!("kbcore_search_cache_misses_total").increment(1);

        let kb = self.context.catalog.get_kb(kb_id).await?;
        let overfetch = if self.context.rerank.is_some() {
            top_k.saturating_mul(retrieval_config.rerank_overfetch_factor).max(top_k)
        } else {
            top_k
        };

        let mut fused = match mode {
            SearchMode::Semantic => self.semantic_search(&kb, query, overfetch, filters).await?,
            SearchMode::Keyword => self.keyword_search(kb_id, query, overfetch, filters).await?,
            SearchMode::Hybrid => {
                // Run both sub-retrievers concurrently with a join barrier; a single backend
                // failing degrades to the other's results, logged, rather than failing the
                // whole request, but two failures propagate.
                let (semantic_outcome, keyword_outcome) =
                    tokio::join!(self.semantic_search(&kb, query, overfetch, filters), self.keyword_search(kb_id, query, overfetch, filters));

                let (semantic_results, keyword_results) = match (semantic_outcome, keyword_outcome) {
                    (Ok(s), Ok(k)) => (s, k),
                    (Ok(s), Err(err)) => {
                        tracing::warn!(%kb_id, error = %err, "keyword search failed, degrading to semantic-only results");
                        (s, Vec::new())
                    }
                    (Err(err), Ok(k)) => {
                        tracing::warn!(%kb_id, error = %err, "semantic search failed, degrading to keyword-only results");
                        (Vec::new(), k)
                    }
                    (Err(semantic_err), Err(keyword_err)) => {
                        tracing::error!(%kb_id, %semantic_err, %keyword_err, "both hybrid sub-retrievers failed");
                        return Err(semantic_err);
                    }
                };
                let params = FusionParams {
                    rrf_k: retrieval_config.rrf_k,
                    semantic_weight: retrieval_config.semantic_weight,
                    keyword_weight: retrieval_config.keyword_weight,
                };
                let params = if retrieval_config.adaptive_weighting {
                    fusion::adapt_weights(query, params)
                } else {
                    params
                };
                fusion::fuse(&semantic_results, &keyword_results, retrieval_config.fusion_method, params)
            }
        };

        if let Some(reranker) = &self.context.rerank {
            let max_candidates = reranker.max_candidates();
            if fused.len() > max_candidates {
                let overflow = fused.split_off(max_candidates);
                let mut reranked = reranker.rerank(query, fused).await?;
                reranked.extend(overflow);
                fused = reranked;
            } else {
                fused = reranker.rerank(query, fused).await?;
            }
        }

        // Sub-retrievers are always queried with score_threshold=0; the threshold is applied
        // once, here, after fusion/rerank have had a chance to rescore everything.
        if score_threshold > 0.0 {
            fused.retain(|r| r.score >= score_threshold);
        }
        fused.truncate(top_k);
        self.cache.set(kb_id, &fingerprint, &fused).await;
        metrics::histogram!("kbcore_search_duration_seconds", "mode" => mode_label(mode)).record(started.elapsed().as_secs_f64());
        Ok(fused)
    }

    async fn semantic_search(
        &self,
        kb: &crate::domain::types::KnowledgeBase,
        query: &str,
        top_k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>> {
        let query_vector = self.context.embedding.embed(query).await?;
        let vector_filters = build_vector_filters(filters);
        let hits = self
            .context
            .vector_store
            .search(&kb.collection_name(), &query_vector, top_k, &vector_filters)
            .await?;

        Ok(hits
            .into_iter()
            .map(|hit| SearchResult {
                chunk_id: hit.id,
                document_id: hit.payload.document_id,
                score: hit.score,
                content: hit.payload.content,
                metadata: serde_json::json!({"source": "semantic"}),
                highlights: None,
            })
            .collect())
    }

    async fn keyword_search(&self, kb_id: Uuid, query: &str, top_k: usize, filters: &SearchFilters) -> Result<Vec<SearchResult>> {
        let hits = self.context.keyword_index.search(kb_id, query, top_k, filters).await?;

        Ok(hits
            .into_iter()
            .map(|hit| SearchResult {
                chunk_id: hit.chunk_id,
                document_id: hit.document_id,
                score: hit.score,
                content: hit.content,
                metadata: serde_json::json!({"source": "keyword"}),
                highlights: hit.highlights,
            })
            .collect())
    }
}

fn mode_label(mode: SearchMode) -> &'static str {
    match mode {
        SearchMode::Semantic => "semantic",
        SearchMode::Keyword => "keyword",
        SearchMode::Hybrid => "hybrid",
    }
}

/// Translates the subset of [`SearchFilters`] the in-memory vector store's flat
/// [`crate::domain::types::VectorPayload`] schema can express: `document_ids` and `file_types`.
/// `date_from`/`date_to`/`tags`/`metadata` have no corresponding payload field and are left to
/// the keyword index (which filters on `document_ids` against the catalog-backed chunk record).
fn build_vector_filters(filters: &SearchFilters) -> VectorFilters {
    let mut vector_filters = VectorFilters::new();
    if let Some(document_ids) = &filters.document_ids {
        vector_filters.insert(
            "document_id".to_string(),
            FieldFilter::In { values: document_ids.iter().map(|id| serde_json::json!(id)).collect() },
        );
    }
    if let Some(file_types) = &filters.file_types {
        vector_filters.insert(
            "file_type".to_string(),
            FieldFilter::In { values: file_types.iter().map(|t| serde_json::json!(t)).collect() },
        );
    }
    vector_filters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::context::AppContext;
    use crate::domain::types::{Document, DocumentStatus, KnowledgeBase, SourceType, Visibility};

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

    async fn seed_document(context: &Arc<AppContext>, kb: &KnowledgeBase, content: &str) {
        let blob_path = format!("{}doc.txt", kb.blob_prefix());
        context.object_store.put(&blob_path, content.as_bytes().to_vec()).await.unwrap();
        let now = chrono::Utc::now();
        let document = context
            .catalog
            .create_document(Document {
                id: Uuid::new_v4(),
                kb_id: kb.id,
                file_name: "doc.txt".to_string(),
                file_type: "txt".to_string(),
                byte_size: content.len() as u64,
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

        let pipeline = crate::application::pipeline::ProcessingPipeline::new(context.clone());
        pipeline.process_document(document.id, false).await.unwrap();
    }

    #[tokio::test]
    async fn hybrid_search_returns_results_and_caches_them() {
        let config = crate::config::load_embedded_defaults().unwrap();
        let context = Arc::new(AppContext::build(config).unwrap());
        let kb = context.catalog.create_kb(test_kb()).await.unwrap();
        seed_document(&context, &kb, "the quick brown fox jumps over the lazy dog").await;

        let retrieval = RetrievalPipeline::new(context.clone());
        let results = retrieval
            .search(kb.id, "quick fox", SearchMode::Hybrid, 5, 0.0, &SearchFilters::default())
            .await
            .unwrap();
        assert!(!results.is_empty());

        let stats_before = context.cache.stats();
        let cached = retrieval
            .search(kb.id, "quick fox", SearchMode::Hybrid, 5, 0.0, &SearchFilters::default())
            .await
            .unwrap();
        assert_eq!(cached.len(), results.len());
        let stats_after = context.cache.stats();
        assert!(stats_after.hits > stats_before.hits);
    }

    #[tokio::test]
    async fn semantic_only_mode_skips_keyword_search() {
        let config = crate::config::load_embedded_defaults().unwrap();
        let context = Arc::new(AppContext::build(config).unwrap());
        let kb = context.catalog.create_kb(test_kb()).await.unwrap();
        seed_document(&context, &kb, "vectors and dense embeddings power semantic search").await;

        let retrieval = RetrievalPipeline::new(context.clone());
        let results = retrieval
            .search(kb.id, "embeddings", SearchMode::Semantic, 5, 0.0, &SearchFilters::default())
            .await
            .unwrap();
        assert!(results.iter().all(|r| r.metadata["source"] == "semantic"));
    }

    #[tokio::test]
    async fn score_threshold_filters_out_low_scoring_results_post_fusion() {
        let config = crate::config::load_embedded_defaults().unwrap();
        let context = Arc::new(AppContext::build(config).unwrap());
        let kb = context.catalog.create_kb(test_kb()).await.unwrap();
        seed_document(&context, &kb, "the quick brown fox jumps over the lazy dog").await;

        let retrieval = RetrievalPipeline::new(context.clone());
        let unfiltered = retrieval
            .search(kb.id, "quick fox", SearchMode::Hybrid, 5, 0.0, &SearchFilters::default())
            .await
            .unwrap();
        assert!(!unfiltered.is_empty());

        // A threshold above every result's fused score must drop them all.
        let impossible_threshold = unfiltered.iter().map(|r| r.score).fold(0.0_f32, f32::max) + 1.0;
        let filtered = retrieval
            .search(kb.id, "quick fox", SearchMode::Hybrid, 5, impossible_threshold, &SearchFilters::default())
            .await
            .unwrap();
        assert!(filtered.is_empty());
    }
}
