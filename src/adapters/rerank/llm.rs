use super::truncate_chars;
use crate::domain::error::{Error, Result};
use crate::domain::ports::rerank::RerankProvider;
use crate::domain::types::SearchResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for an LLM-backed reranker: the query and numbered documents go into a chat
/// completion prompt, the model replies with a JSON array of indices ordered most-to-least
/// relevant, and scores are synthesized as `1 - rank/N`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRerankConfig {
    /// Provider identifier surfaced in result metadata.
    pub provider_name: String,
    /// Base URL of an OpenAI-compatible `/chat/completions` endpoint, no trailing slash.
    pub base_url: String,
    /// Bearer credential.
    pub api_key: String,
    /// Chat model name.
    pub model: String,
    /// Maximum candidates accepted per call (kept conservative — full documents enter the prompt).
    pub max_candidates: usize,
    /// Document text is truncated to this many characters before being sent.
    pub max_input_length: usize,
}

impl Default for LlmRerankConfig {
    fn default() -> Self {
        Self {
            provider_name: "llm".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_candidates: 50,
            max_input_length: 512,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Calls an LLM chat-completion endpoint to rank candidates by relevance.
pub struct LlmRerankProvider {
    config: LlmRerankConfig,
    client: reqwest::Client,
}

impl LlmRerankProvider {
    /// Build a provider from configuration.
    pub fn new(config: LlmRerankConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn build_prompt(&self, query: &str, results: &[SearchResult]) -> String {
        let mut prompt = format!(
            "Query: {query}\n\nRank the following documents from most to least relevant to the \
             query. Reply with ONLY a JSON array of the 0-based document indices in ranked order, \
             e.g. [2,0,1].\n\n"
        );
        for (i, result) in results.iter().enumerate() {
            let snippet = truncate_chars(&result.content, self.config.max_input_length);
            prompt.push_str(&format!("[{i}] {snippet}\n\n"));
        }
        prompt
    }

    fn parse_indices(raw: &str) -> Result<Vec<usize>> {
        let start = raw.find('[').ok_or_else(|| Error::data_integrity("LLM reranker reply had no JSON array"))?;
        let end = raw.rfind(']').ok_or_else(|| Error::data_integrity("LLM reranker reply had no JSON array"))?;
        serde_json::from_str(&raw[start..=end])
            .map_err(|e| Error::data_integrity(format!("LLM reranker reply was not a JSON index array: {e}")))
    }
}

#[async_trait]
impl RerankProvider for LlmRerankProvider {
    async fn rerank(&self, query: &str, results: Vec<SearchResult>) -> Result<Vec<SearchResult>> {
        if results.is_empty() {
            return Ok(results);
        }

        let prompt = self.build_prompt(query, &results);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let body: ChatResponse = response.json().await?;
        let raw = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();
        let indices = Self::parse_indices(raw)?;

        let n = indices.len().max(1) as f32;
        let mut reranked = Vec::with_capacity(indices.len());
        for (rank, index) in indices.into_iter().enumerate() {
            let Some(mut result) = results.get(index).cloned() else {
                continue;
            };
            let original_score = result.score;
            result.score = 1.0 - (rank as f32 / n);
            if let Some(map) = result.metadata.as_object_mut() {
                map.insert("original_score".to_string(), serde_json::json!(original_score));
                map.insert("rerank_provider".to_string(), serde_json::json!(self.config.provider_name));
            }
            reranked.push(result);
        }
        Ok(reranked)
    }

    fn max_candidates(&self) -> usize {
        self.config.max_candidates
    }

    fn provider_name(&self) -> &str {
        &self.config.provider_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_indices_from_noisy_reply() {
        let indices = LlmRerankProvider::parse_indices("Sure, here you go: [2, 0, 1] thanks!").unwrap();
        assert_eq!(indices, vec![2, 0, 1]);
    }

    #[test]
    fn rejects_reply_without_array() {
        assert!(LlmRerankProvider::parse_indices("no array here").is_err());
    }
}
