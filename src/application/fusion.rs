//! Combines semantic and keyword result lists into one ranked list.
//!
//! Three selectable fusion strategies plus an adaptive query-weighting pass that nudges the
//! balance between them based on the shape of the query text.

use crate::domain::types::SearchResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Tracks first-seen order alongside the running score per chunk id, so ties sort by the order
/// results were first observed rather than by `HashMap` iteration order, which is unspecified.
struct ScoreBoard {
    order: Vec<Uuid>,
    scores: HashMap<Uuid, f32>,
    chosen: HashMap<Uuid, SearchResult>,
}

impl ScoreBoard {
    fn new() -> Self {
        Self { order: Vec::new(), scores: HashMap::new(), chosen: HashMap::new() }
    }

    fn add(&mut self, result: &SearchResult, contribution: f32) {
        if !self.scores.contains_key(&result.chunk_id) {
            self.order.push(result.chunk_id);
        }
        *self.scores.entry(result.chunk_id).or_insert(0.0) += contribution;
        self.chosen.entry(result.chunk_id).or_insert_with(|| result.clone());
    }

    fn into_sorted(self) -> Vec<SearchResult> {
        let ScoreBoard { order, mut scores, mut chosen } = self;
        let mut fused: Vec<SearchResult> = order
            .into_iter()
            .map(|id| {
                let mut result = chosen.remove(&id).expect("every ordered id was inserted into chosen");
                result.score = scores.remove(&id).unwrap_or(0.0);
                result
            })
            .collect();
        // `sort_by` is stable, so ties keep the first-seen order captured above.
        fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        fused
    }
}

/// Which fusion strategy combines semantic and keyword candidate lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    /// Reciprocal Rank Fusion: score-free, rank-only combination. The default — robust to the
    /// two lists using incomparable score scales.
    Rrf,
    /// Min-max normalize each list to `[0, 1]`, then combine with configured weights.
    Weighted,
    /// Sum raw scores times configured weights, with no normalization.
    Linear,
}

impl Default for FusionMethod {
    fn default() -> Self {
        Self::Rrf
    }
}

/// Weights and constants a fusion pass needs; independent of [`FusionMethod`] so callers can
/// adjust weights (e.g. via [`adapt_weights`]) without touching the chosen strategy.
#[derive(Debug, Clone, Copy)]
pub struct FusionParams {
    /// RRF's `k` constant: larger values flatten the influence of rank differences.
    pub rrf_k: f32,
    /// Weight applied to the semantic list under [`FusionMethod::Weighted`]/[`FusionMethod::Linear`].
    pub semantic_weight: f32,
    /// Weight applied to the keyword list under [`FusionMethod::Weighted`]/[`FusionMethod::Linear`].
    pub keyword_weight: f32,
}

impl Default for FusionParams {
    fn default() -> Self {
        Self {
            rrf_k: 60.0,
            semantic_weight: 0.7,
            keyword_weight: 0.3,
        }
    }
}

/// Fuses two ranked candidate lists (already sorted best-first by their own score) into one
/// ranked list ordered by fused score, descending. Results present in both lists are merged into
/// a single entry; the entry's `content`/`metadata` are taken from whichever list ranks it higher.
pub fn fuse(
    semantic: &[SearchResult],
    keyword: &[SearchResult],
    method: FusionMethod,
    params: FusionParams,
) -> Vec<SearchResult> {
    match method {
        FusionMethod::Rrf => fuse_rrf(semantic, keyword, params.rrf_k),
        FusionMethod::Weighted => fuse_weighted(semantic, keyword, params),
        FusionMethod::Linear => fuse_linear(semantic, keyword, params),
    }
}

fn fuse_rrf(semantic: &[SearchResult], keyword: &[SearchResult], k: f32) -> Vec<SearchResult> {
    let mut board = ScoreBoard::new();

    for (rank, result) in semantic.iter().enumerate() {
        board.add(result, 1.0 / (k + (rank + 1) as f32));
    }
    for (rank, result) in keyword.iter().enumerate() {
        board.add(result, 1.0 / (k + (rank + 1) as f32));
    }

    board.into_sorted()
}

fn min_max_normalized(results: &[SearchResult]) -> HashMap<Uuid, f32> {
    if results.is_empty() {
        return HashMap::new();
    }
    let min = results.iter().map(|r| r.score).fold(f32::INFINITY, f32::min);
    let max = results.iter().map(|r| r.score).fold(f32::NEG_INFINITY, f32::max);
    let span = max - min;
    results
        .iter()
        .map(|r| {
            let normalized = if span > f32::EPSILON { (r.score - min) / span } else { 1.0 };
            (r.chunk_id, normalized)
        })
        .collect()
}

fn fuse_weighted(semantic: &[SearchResult], keyword: &[SearchResult], params: FusionParams) -> Vec<SearchResult> {
    let semantic_norm = min_max_normalized(semantic);
    let keyword_norm = min_max_normalized(keyword);
    let mut board = ScoreBoard::new();

    for result in semantic {
        let s = semantic_norm.get(&result.chunk_id).copied().unwrap_or(0.0);
        board.add(result, s * params.semantic_weight);
    }
    for result in keyword {
        let s = keyword_norm.get(&result.chunk_id).copied().unwrap_or(0.0);
        board.add(result, s * params.keyword_weight);
    }

    board.into_sorted()
}

fn fuse_linear(semantic: &[SearchResult], keyword: &[SearchResult], params: FusionParams) -> Vec<SearchResult> {
    let mut board = ScoreBoard::new();

    for result in semantic {
        board.add(result, result.score * params.semantic_weight);
    }
    for result in keyword {
        board.add(result, result.score * params.keyword_weight);
    }

    board.into_sorted()
}

/// Nudges `semantic_weight`/`keyword_weight` based on the shape of the query text, then
/// renormalizes so they sum to 1.0 and stay within `[0.1, 0.9]`:
/// - two words or fewer: keyword favored (+0.1 keyword)
/// - ends in `?` or starts with a question word: semantic favored (+0.15 semantic)
/// - contains a quoted substring: keyword favored (+0.2 keyword)
pub fn adapt_weights(query: &str, mut params: FusionParams) -> FusionParams {
    let trimmed = query.trim();
    let word_count = trimmed.split_whitespace().count();
    let lower = trimmed.to_lowercase();

    if word_count > 0 && word_count <= 2 {
        params.keyword_weight += 0.1;
    }
    if trimmed.ends_with('?')
        || ["what", "who", "when", "where", "why", "how"]
            .iter()
            .any(|w| lower.starts_with(w))
    {
        params.semantic_weight += 0.15;
    }
    if trimmed.contains('"') {
        params.keyword_weight += 0.2;
    }

    params.semantic_weight = params.semantic_weight.clamp(0.1, 0.9);
    params.keyword_weight = params.keyword_weight.clamp(0.1, 0.9);

    let sum = params.semantic_weight + params.keyword_weight;
    if sum > f32::EPSILON {
        params.semantic_weight /= sum;
        params.keyword_weight /= sum;
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: Uuid, score: f32, content: &str) -> SearchResult {
        SearchResult {
            chunk_id: id,
            document_id: Uuid::new_v4(),
            score,
            content: content.to_string(),
            metadata: serde_json::json!({}),
            highlights: None,
        }
    }

    #[test]
    fn rrf_merges_overlapping_results_with_higher_score() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let semantic = vec![result(a, 0.9, "a"), result(b, 0.5, "b")];
        let keyword = vec![result(b, 5.0, "b"), result(a, 1.0, "a")];

        let fused = fuse(&semantic, &keyword, FusionMethod::Rrf, FusionParams::default());

        assert_eq!(fused.len(), 2);
        // `a` ranked first in both lists, `b` ranked second in both: a's fused score is strictly
        // higher so it must come first.
        assert_eq!(fused[0].chunk_id, a);
    }

    #[test]
    fn weighted_fusion_normalizes_each_list_independently() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let semantic = vec![result(a, 10.0, "a"), result(b, 0.0, "b")];
        let keyword = vec![result(b, 1.0, "b")];

        let params = FusionParams { rrf_k: 60.0, semantic_weight: 1.0, keyword_weight: 1.0 };
        let fused = fuse(&semantic, &keyword, FusionMethod::Weighted, params);

        // a: semantic-normalized 1.0 * 1.0 = 1.0; b: semantic-normalized 0.0 * 1.0 + keyword 1.0 * 1.0 = 1.0
        assert_eq!(fused.len(), 2);
        assert!((fused[0].score - fused[1].score).abs() < 1e-6);
    }

    #[test]
    fn adaptive_weighting_favors_keyword_for_short_quoted_query() {
        let base = FusionParams::default();
        let adapted = adapt_weights(r#""rust""#, base);
        assert!(adapted.keyword_weight > base.keyword_weight / (base.keyword_weight + base.semantic_weight));
    }

    #[test]
    fn adaptive_weighting_favors_semantic_for_question() {
        let base = FusionParams { rrf_k: 60.0, semantic_weight: 0.5, keyword_weight: 0.5 };
        let adapted = adapt_weights("how does the scheduler work?", base);
        assert!(adapted.semantic_weight > adapted.keyword_weight);
    }

    #[test]
    fn weights_always_sum_to_one() {
        let adapted = adapt_weights(r#"what is "rust"?"#, FusionParams::default());
        assert!((adapted.semantic_weight + adapted.keyword_weight - 1.0).abs() < 1e-5);
    }
}
