use super::truncate_chars;
use crate::domain::error::{Error, Result};
use crate::domain::ports::rerank::RerankProvider;
use crate::domain::types::SearchResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for a Cohere/Jina-style `/rerank` endpoint: `POST {model, query, documents,
/// top_n}`, response `{results: [{index, relevance_score}]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalRerankConfig {
    /// Provider identifier surfaced in result metadata, e.g. `"cohere"`, `"jina"`.
    pub provider_name: String,
    /// Base URL, no trailing slash.
    pub base_url: String,
    /// Bearer credential.
    pub api_key: String,
    /// Model name sent in the request body.
    pub model: String,
    /// Maximum candidates accepted per call.
    pub max_candidates: usize,
    /// Document text is truncated to this many characters before being sent.
    pub max_input_length: usize,
    /// Results scoring at or below this are dropped from the output.
    pub score_threshold: f32,
}

impl Default for ExternalRerankConfig {
    fn default() -> Self {
        Self {
            provider_name: "cohere".to_string(),
            base_url: "https://api.cohere.ai/v1".to_string(),
            api_key: String::new(),
            model: "rerank-english-v3.0".to_string(),
            max_candidates: 1000,
            max_input_length: 512,
            score_threshold: 0.0,
        }
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<&'a str>,
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResultItem>,
}

#[derive(Deserialize)]
struct RerankResultItem {
    index: usize,
    relevance_score: f32,
}

/// Calls an external cross-encoder reranking API.
pub struct ExternalRerankProvider {
    config: ExternalRerankConfig,
    client: reqwest::Client,
}

impl ExternalRerankProvider {
    /// Build a provider from configuration, reusing one pooled `reqwest::Client`.
    pub fn new(config: ExternalRerankConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RerankProvider for ExternalRerankProvider {
    async fn rerank(&self, query: &str, results: Vec<SearchResult>) -> Result<Vec<SearchResult>> {
        if results.is_empty() {
            return Ok(results);
        }

        let truncated: Vec<String> = results
            .iter()
            .map(|r| truncate_chars(&r.content, self.config.max_input_length))
            .collect();
        let documents: Vec<&str> = truncated.iter().map(String::as_str).collect();

        let request = RerankRequest {
            model: &self.config.model,
            query,
            top_n: documents.len(),
            documents,
        };

        let response = self
            .client
            .post(format!("{}/rerank", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let body: RerankResponse = response.json().await?;

        let mut reranked: Vec<SearchResult> = Vec::with_capacity(body.results.len());
        for item in body.results {
            let Some(mut result) = results.get(item.index).cloned() else {
                continue;
            };
            if item.relevance_score <= self.config.score_threshold {
                continue;
            }
            let original_score = result.score;
            result.score = item.relevance_score;
            merge_metadata(
                &mut result,
                serde_json::json!({
                    "original_score": original_score,
                    "rerank_provider": self.config.provider_name,
                    "rerank_model": self.config.model,
                }),
            );
            reranked.push(result);
        }

        reranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(reranked)
    }

    fn max_candidates(&self) -> usize {
        self.config.max_candidates
    }

    fn provider_name(&self) -> &str {
        &self.config.provider_name
    }
}

fn merge_metadata(result: &mut SearchResult, extra: serde_json::Value) {
    let serde_json::Value::Object(extra) = extra else {
        return;
    };
    let existing = result.metadata.as_object_mut();
    match existing {
        Some(map) => map.extend(extra),
        None => result.metadata = serde_json::Value::Object(extra),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn result(content: &str, score: f32) -> SearchResult {
        SearchResult {
            chunk_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            score,
            content: content.to_string(),
            metadata: serde_json::json!({}),
            highlights: None,
        }
    }

    #[tokio::test]
    async fn empty_input_returns_empty_output() {
        let provider = ExternalRerankProvider::new(ExternalRerankConfig::default());
        let out = provider.rerank("q", vec![]).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn scores_and_metadata_are_rewritten_from_a_mock_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rerank")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"results":[{"index":1,"relevance_score":0.9},{"index":0,"relevance_score":0.1}]}"#)
            .create_async()
            .await;

        let mut config = ExternalRerankConfig::default();
        config.base_url = server.url();
        config.score_threshold = 0.05;
        let provider = ExternalRerankProvider::new(config);

        let input = vec![result("first", 0.5), result("second", 0.4)];
        let out = provider.rerank("q", input.clone()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].chunk_id, input[1].chunk_id);
        assert_eq!(out[0].score, 0.9);
        assert_eq!(out[0].metadata["rerank_provider"], "cohere");
    }
}
