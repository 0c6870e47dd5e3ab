use crate::domain::error::{Error, Result};
use crate::domain::ports::embedding::EmbeddingProvider;
use crate::domain::types::{
    EmbeddingBatchResult, EmbeddingLogEntry, EmbeddingUsage, DEFAULT_EMBEDDING_BATCH_SIZE,
    DEFAULT_EMBEDDING_MAX_RETRIES, EMBEDDING_LOG_CAPACITY,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Configuration for an OpenAI-compatible embeddings endpoint. Works unmodified against Azure
/// OpenAI (swap `api_key_header` to `"api-key"`) and any self-hosted server implementing the
/// same `/embeddings` contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiCompatibleConfig {
    /// Provider identifier surfaced in logs/metrics, e.g. `"openai"`, `"azure"`.
    pub provider_name: String,
    /// Base URL, no trailing slash, e.g. `"https://api.openai.com/v1"`.
    pub base_url: String,
    /// Bearer credential.
    pub api_key: String,
    /// HTTP header carrying the credential. `"Authorization"` for OpenAI (value prefixed with
    /// `Bearer `), `"api-key"` for Azure (raw value).
    pub api_key_header: String,
    /// Model name sent in the request body.
    pub model: String,
    /// Expected output vector dimension; validated against every response.
    pub dimensions: usize,
    /// Maximum inputs per HTTP request.
    pub batch_size: usize,
    /// Retry budget for transient failures (timeouts, 429, 5xx).
    pub max_retries: u32,
    /// Approximate price to report in the call log; `None` suppresses cost estimation.
    pub usd_per_million_tokens: Option<f64>,
}

impl Default for OpenAiCompatibleConfig {
    fn default() -> Self {
        Self {
            provider_name: "openai".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            api_key_header: "Authorization".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            max_retries: DEFAULT_EMBEDDING_MAX_RETRIES,
            usd_per_million_tokens: Some(0.02),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingObject>,
    usage: UsageObject,
}

#[derive(Deserialize)]
struct EmbeddingObject {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Deserialize, Default)]
struct UsageObject {
    prompt_tokens: u64,
    total_tokens: u64,
}

/// Calls an OpenAI-compatible `/embeddings` endpoint, sub-batching to `batch_size`, retrying
/// transient failures with exponential backoff, and keeping a bounded ring buffer of recent
/// calls for observability.
pub struct OpenAiCompatibleProvider {
    config: OpenAiCompatibleConfig,
    client: reqwest::Client,
    log: Mutex<VecDeque<EmbeddingLogEntry>>,
}

impl OpenAiCompatibleProvider {
    /// Build a provider from configuration, reusing a single `reqwest::Client` (connection
    /// pooling) for its lifetime.
    pub fn new(config: OpenAiCompatibleConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            log: Mutex::new(VecDeque::with_capacity(EMBEDDING_LOG_CAPACITY)),
        }
    }

    fn record(&self, entry: EmbeddingLogEntry) {
        let mut log = self.log.lock().expect("embedding log mutex poisoned");
        if log.len() >= EMBEDDING_LOG_CAPACITY {
            log.pop_back();
        }
        log.push_front(entry);
    }

    async fn embed_sub_batch(&self, texts: &[String]) -> Result<(Vec<Vec<f32>>, EmbeddingUsage)> {
        let mut attempt = 0;
        loop {
            let request = EmbeddingsRequest {
                model: &self.config.model,
                input: texts,
            };

            let mut req = self
                .client
                .post(format!("{}/embeddings", self.config.base_url))
                .json(&request);
            req = if self.config.api_key_header.eq_ignore_ascii_case("authorization") {
                req.bearer_auth(&self.config.api_key)
            } else {
                req.header(self.config.api_key_header.as_str(), &self.config.api_key)
            };

            let result: Result<(Vec<Vec<f32>>, EmbeddingUsage)> = async {
                let response = req.send().await?;
                let response = response.error_for_status()?;
                let body: EmbeddingsResponse = response.json().await?;

                let mut vectors = vec![Vec::new(); body.data.len()];
                for item in body.data {
                    if item.index < vectors.len() {
                        vectors[item.index] = item.embedding;
                    }
                }
                for vector in &vectors {
                    if vector.len() != self.config.dimensions {
                        return Err(Error::EmbeddingDimensionMismatch {
                            expected: self.config.dimensions,
                            actual: vector.len(),
                        });
                    }
                }

                Ok((
                    vectors,
                    EmbeddingUsage {
                        prompt_tokens: body.usage.prompt_tokens,
                        total_tokens: body.usage.total_tokens,
                    },
                ))
            }
            .await;

            match result {
                Ok(ok) => return Ok(ok),
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let backoff = Duration::from_millis(200 * 2u64.pow(attempt));
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatibleProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddingBatchResult> {
        let mut vectors = Vec::with_capacity(texts.len());
        let mut usage = EmbeddingUsage::default();
        let mut total_latency_ms = 0u64;

        for sub_batch in texts.chunks(self.config.batch_size.max(1)) {
            let started = Instant::now();
            let result = self.embed_sub_batch(sub_batch).await;
            let latency_ms = started.elapsed().as_millis() as u64;
            total_latency_ms += latency_ms;

            match &result {
                Ok((sub_vectors, sub_usage)) => {
                    usage.prompt_tokens += sub_usage.prompt_tokens;
                    usage.total_tokens += sub_usage.total_tokens;
                    self.record(EmbeddingLogEntry {
                        provider: self.config.provider_name.clone(),
                        model: self.config.model.clone(),
                        input_len: sub_batch.len(),
                        output_dimension: sub_vectors.first().map(Vec::len).unwrap_or(0),
                        token_count: sub_usage.total_tokens,
                        latency_ms,
                        status: "ok".to_string(),
                        cost_estimate_usd: self
                            .config
                            .usd_per_million_tokens
                            .map(|rate| crate::domain::ports::embedding::estimate_cost_usd(sub_usage, rate)),
                        at: chrono::Utc::now(),
                    });
                }
                Err(err) => {
                    self.record(EmbeddingLogEntry {
                        provider: self.config.provider_name.clone(),
                        model: self.config.model.clone(),
                        input_len: sub_batch.len(),
                        output_dimension: 0,
                        token_count: 0,
                        latency_ms,
                        status: err.to_string(),
                        cost_estimate_usd: None,
                        at: chrono::Utc::now(),
                    });
                }
            }

            let (sub_vectors, _) = result?;
            vectors.extend(sub_vectors);
        }

        Ok(EmbeddingBatchResult {
            vectors,
            model: self.config.model.clone(),
            usage,
            latency_ms: total_latency_ms,
        })
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn provider_name(&self) -> &str {
        &self.config.provider_name
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn recent_calls(&self) -> Vec<EmbeddingLogEntry> {
        self.log.lock().expect("embedding log mutex poisoned").iter().cloned().collect()
    }
}
