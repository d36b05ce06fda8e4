//! Ranker trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::source::SearchResult;

/// Relevance ranker.
///
/// Contract:
/// - every returned item carries a 0-10 `relevance_score`
/// - near-duplicates score 0 for all but one representative
/// - output is sorted by score descending; equal scores keep input order
/// - output is truncated to `top_k`
/// - items the ranker cannot map back to the input are dropped
///
/// The search stage falls back to the first `top_k` candidates when this
/// returns an error.
#[async_trait]
pub trait Ranker: Send + Sync {
    async fn rank(
        &self,
        query: &str,
        candidates: Vec<SearchResult>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;
}
