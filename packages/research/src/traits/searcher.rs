//! Search provider trait.
//!
//! The search stage consumes two providers (web/community and video). Each is
//! independently fail-soft: the stage turns an `Err` into an empty
//! contribution, so implementations are free to simply propagate errors.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{source::SearchResult, state::DateRange};

/// Search provider.
///
/// # Implementations
///
/// - `TavilySearcher` - web and community pages
/// - `YouTubeSearcher` - videos
/// - `MockSearcher` - for testing
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Search for up to `max_results` candidates inside `date_range`.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        date_range: &DateRange,
    ) -> Result<Vec<SearchResult>>;

    /// Provider name (for logging).
    fn name(&self) -> &str {
        "unknown"
    }
}

/// An optional provider. `None` contributes no candidates.
#[async_trait]
impl<S: Searcher> Searcher for Option<S> {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        date_range: &DateRange,
    ) -> Result<Vec<SearchResult>> {
        match self {
            Some(inner) => inner.search(query, max_results, date_range).await,
            None => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &str {
        match self {
            Some(inner) => inner.name(),
            None => "disabled",
        }
    }
}
