//! Qdrant-compatible HTTP vector store.
//!
//! A network-backed implementation selectable alongside the in-memory one behind the same
//! trait, following the same HTTP-client conventions used elsewhere in this crate:
//! `reqwest::Client` reused across calls, `Error::from(reqwest::Error)` classifying transient
//! vs. fatal failures.

use crate::domain::error::{Error, Result};
use crate::domain::ports::vector_store::{VectorSearchHit, VectorStoreProvider};
use crate::domain::types::{FieldFilter, VectorFilters, VectorPayload, VectorRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Configuration for a Qdrant-compatible collection store reachable over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpVectorStoreConfig {
    /// Base URL, no trailing slash, e.g. `"http://localhost:6333"`.
    pub base_url: String,
    /// Optional API key sent as the `api-key` header.
    pub api_key: Option<String>,
    /// Distance metric used when creating a new collection.
    pub distance: DistanceMetric,
}

impl Default for HttpVectorStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:6333".to_string(),
            api_key: None,
            distance: DistanceMetric::Cosine,
        }
    }
}

/// Distance metric a collection is created with. Cosine is the default.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DistanceMetric {
    /// Cosine similarity, the default.
    Cosine,
    /// Euclidean (L2) distance.
    Euclid,
    /// Raw dot product.
    Dot,
}

/// A vector collection over a remote Qdrant-compatible service. Every `&str` collection name is
/// translated 1:1 into a Qdrant collection of the same name (already `kb_{uuid}`-shaped by the
/// caller).
pub struct HttpVectorStoreProvider {
    config: HttpVectorStoreConfig,
    client: reqwest::Client,
}

impl HttpVectorStoreProvider {
    /// Build a provider reusing a single `reqwest::Client` for connection pooling.
    pub fn new(config: HttpVectorStoreConfig) -> Self {
        Self { config, client: reqwest::Client::new() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let req = self.client.request(method, self.url(path));
        match &self.config.api_key {
            Some(key) => req.header("api-key", key),
            None => req,
        }
    }
}

fn filters_to_qdrant(filters: &VectorFilters) -> Option<Value> {
    if filters.is_empty() {
        return None;
    }
    let must: Vec<Value> = filters
        .iter()
        .map(|(field, filter)| match filter {
            FieldFilter::Eq(value) => json!({"key": field, "match": {"value": value}}),
            FieldFilter::In { values } => json!({"key": field, "match": {"any": values}}),
            FieldFilter::Gte { value } => json!({"key": field, "range": {"gte": value}}),
            FieldFilter::Lte { value } => json!({"key": field, "range": {"lte": value}}),
        })
        .collect();
    Some(json!({"must": must}))
}

#[derive(Deserialize)]
struct QdrantEnvelope<T> {
    result: T,
    #[allow(dead_code)]
    status: Value,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: Uuid,
    score: f32,
    payload: VectorPayload,
}

#[async_trait]
impl VectorStoreProvider for HttpVectorStoreProvider {
    async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<()> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/collections/{collection}"))
            .json(&json!({
                "vectors": {"size": dimension, "distance": self.config.distance},
            }))
            .send()
            .await?;

        // Qdrant returns 409 (or a 4xx body) when the collection already exists; swallow only
        // that specific case, not any failure.
        if response.status() == reqwest::StatusCode::CONFLICT {
            return Ok(());
        }
        response.error_for_status().map(|_| ()).map_err(Error::from)
    }

    async fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let points: Vec<Value> = records
            .into_iter()
            .map(|r| json!({"id": r.id, "vector": r.vector, "payload": r.payload}))
            .collect();

        self.request(reqwest::Method::PUT, &format!("/collections/{collection}/points?wait=true"))
            .json(&json!({"points": points}))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        top_k: usize,
        filters: &VectorFilters,
    ) -> Result<Vec<VectorSearchHit>> {
        let mut body = json!({
            "vector": query_vector,
            "limit": top_k,
            "with_payload": true,
        });
        if let Some(filter) = filters_to_qdrant(filters) {
            body["filter"] = filter;
        }

        let response = self
            .request(reqwest::Method::POST, &format!("/collections/{collection}/points/search"))
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let envelope: QdrantEnvelope<Vec<ScoredPoint>> = response.error_for_status()?.json().await?;
        Ok(envelope
            .result
            .into_iter()
            .map(|p| VectorSearchHit { id: p.id, score: p.score, payload: p.payload })
            .collect())
    }

    async fn delete(&self, collection: &str, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.request(reqwest::Method::POST, &format!("/collections/{collection}/points/delete?wait=true"))
            .json(&json!({"points": ids}))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        let response = self.request(reqwest::Method::DELETE, &format!("/collections/{collection}")).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        response.error_for_status().map(|_| ()).map_err(Error::from)
    }

    fn provider_name(&self) -> &str {
        "qdrant"
    }

    async fn health_check(&self) -> Result<()> {
        self.request(reqwest::Method::GET, "/collections").send().await?.error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_translate_to_qdrant_must_clauses() {
        let mut filters = VectorFilters::new();
        filters.insert("file_type".to_string(), FieldFilter::In { values: vec![json!("txt"), json!("md")] });
        let translated = filters_to_qdrant(&filters).unwrap();
        assert_eq!(translated["must"][0]["key"], "file_type");
        assert_eq!(translated["must"][0]["match"]["any"][0], "txt");
    }

    #[test]
    fn empty_filters_produce_no_qdrant_filter() {
        assert!(filters_to_qdrant(&VectorFilters::new()).is_none());
    }

    #[test]
    fn provider_name_identifies_backend() {
        let provider = HttpVectorStoreProvider::new(HttpVectorStoreConfig::default());
        assert_eq!(provider.provider_name(), "qdrant");
    }
}
