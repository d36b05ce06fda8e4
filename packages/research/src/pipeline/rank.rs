//! Model-backed relevance ranking.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::llm::LanguageModel;
use crate::pipeline::parse::clean_json;
use crate::pipeline::prompts::format_rank_prompt;
use crate::traits::ranker::Ranker;
use crate::types::source::SearchResult;

const MAX_SCORE: f64 = 10.0;

/// Ranker that asks a language model for per-candidate scores.
pub struct LlmRanker<M: LanguageModel> {
    model: M,
}

impl<M: LanguageModel> LlmRanker<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<M: LanguageModel> Ranker for LlmRanker<M> {
    async fn rank(
        &self,
        query: &str,
        candidates: Vec<SearchResult>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        debug!(query, candidates = candidates.len(), model = self.model.model_name(), "Ranking candidates");
        let raw = self
            .model
            .complete(&format_rank_prompt(query, &candidates))
            .await?;

        let ranked = apply_rankings(&raw, candidates, top_k)?;
        info!(kept = ranked.len(), top_k, "Ranked candidates");
        Ok(ranked)
    }
}

#[derive(Debug, Deserialize)]
struct RankingResponse {
    #[serde(default)]
    rankings: Vec<RankingEntry>,
}

#[derive(Debug, Deserialize)]
struct RankingEntry {
    index: Option<i64>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    reason: Option<String>,
}

/// Map a ranking response back onto the candidates.
///
/// Unknown indices are dropped, repeated indices keep their first entry,
/// scores are clamped to 0-10 (missing counts as 0). The result is sorted by
/// score descending; ties keep discovery order.
pub fn apply_rankings(
    raw: &str,
    candidates: Vec<SearchResult>,
    top_k: usize,
) -> Result<Vec<SearchResult>> {
    let response: RankingResponse = serde_json::from_str(clean_json(raw))
        .map_err(|e| PipelineError::Unparseable(format!("rankings: {}", e)))?;

    let mut slots: Vec<Option<SearchResult>> = candidates.into_iter().map(Some).collect();
    let mut seen = HashSet::new();
    let mut ranked = Vec::with_capacity(response.rankings.len());

    for entry in response.rankings {
        let Some(index) = entry.index.and_then(|i| usize::try_from(i).ok()) else {
            continue;
        };
        if !seen.insert(index) {
            continue;
        }
        let Some(mut candidate) = slots.get_mut(index).and_then(Option::take) else {
            continue;
        };

        let score = entry.score.unwrap_or(0.0).clamp(0.0, MAX_SCORE).round() as u8;
        candidate.relevance_score = Some(score);
        candidate.relevance_reason = entry.reason.filter(|r| !r.is_empty());
        ranked.push((index, candidate));
    }

    ranked.sort_by(|(ia, a), (ib, b)| {
        b.relevance_score
            .cmp(&a.relevance_score)
            .then_with(|| ia.cmp(ib))
    });
    ranked.truncate(top_k);
    Ok(ranked.into_iter().map(|(_, candidate)| candidate).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLanguageModel;
    use crate::types::source::SourceKind;

    fn candidates(n: usize) -> Vec<SearchResult> {
        (0..n)
            .map(|i| SearchResult::new(format!("https://site{}.com", i), format!("T{}", i), SourceKind::Web))
            .collect()
    }

    fn urls(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.url.as_str()).collect()
    }

    #[test]
    fn test_sorted_by_score_stable() {
        let raw = r#"{"rankings":[
            {"index":0,"score":5,"reason":"ok"},
            {"index":1,"score":9,"reason":"best"},
            {"index":2,"score":5,"reason":"ok too"}
        ]}"#;
        let ranked = apply_rankings(raw, candidates(3), 10).unwrap();

        assert_eq!(urls(&ranked), vec!["https://site1.com", "https://site0.com", "https://site2.com"]);
        assert_eq!(ranked[0].relevance_score, Some(9));
        assert_eq!(ranked[0].relevance_reason.as_deref(), Some("best"));
    }

    #[test]
    fn test_ties_keep_discovery_order() {
        let raw = r#"{"rankings":[{"index":2,"score":7},{"index":0,"score":7}]}"#;
        let ranked = apply_rankings(raw, candidates(3), 10).unwrap();
        assert_eq!(urls(&ranked), vec!["https://site0.com", "https://site2.com"]);
    }

    #[test]
    fn test_drops_unknown_and_repeated_indices() {
        let raw = r#"{"rankings":[
            {"index":7,"score":10},
            {"index":-1,"score":10},
            {"index":1,"score":3},
            {"index":1,"score":10},
            {"score":8}
        ]}"#;
        let ranked = apply_rankings(raw, candidates(2), 10).unwrap();

        assert_eq!(urls(&ranked), vec!["https://site1.com"]);
        assert_eq!(ranked[0].relevance_score, Some(3));
    }

    #[test]
    fn test_clamps_and_defaults_scores() {
        let raw = r#"{"rankings":[{"index":0,"score":42},{"index":1,"score":-3},{"index":2}]}"#;
        let ranked = apply_rankings(raw, candidates(3), 10).unwrap();
        let scores: Vec<_> = ranked.iter().map(|r| r.relevance_score).collect();
        assert_eq!(scores, vec![Some(10), Some(0), Some(0)]);
    }

    #[test]
    fn test_truncates_to_top_k() {
        let raw = r#"```json
{"rankings":[{"index":0,"score":1},{"index":1,"score":2},{"index":2,"score":3}]}
```"#;
        let ranked = apply_rankings(raw, candidates(3), 2).unwrap();
        assert_eq!(urls(&ranked), vec!["https://site2.com", "https://site1.com"]);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(matches!(
            apply_rankings("I cannot rank these.", candidates(2), 5),
            Err(PipelineError::Unparseable(_))
        ));
    }

    #[tokio::test]
    async fn test_llm_ranker_empty_input_skips_model() {
        let model = MockLanguageModel::new();
        let ranker = LlmRanker::new(model.clone());

        let ranked = ranker.rank("q", Vec::new(), 20).await.unwrap();
        assert!(ranked.is_empty());
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_llm_ranker_uses_json_mode() {
        let model = MockLanguageModel::new()
            .with_response(r#"{"rankings":[{"index":1,"score":8,"reason":"r"}]}"#);
        let ranker = LlmRanker::new(model.clone());

        let ranked = ranker.rank("q", candidates(2), 20).await.unwrap();
        assert_eq!(urls(&ranked), vec!["https://site1.com"]);

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].json_mode);
        assert!(calls[0].user.contains("[1] Title: T1"));
    }
}
