//! Search stage: query both providers, then rank.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::Result;
use crate::pipeline::engine::Stage;
use crate::pipeline::isolate::isolate;
use crate::traits::{ranker::Ranker, searcher::Searcher};
use crate::types::config::PipelineConfig;
use crate::types::state::{PipelineState, SearchUpdate};

/// Fans the query out to the web and video providers concurrently and ranks
/// the combined candidates.
///
/// A failing provider contributes nothing. A failing ranker degrades to the
/// first `top_k` candidates in discovery order (web first).
pub struct SearchStage {
    web: Arc<dyn Searcher>,
    video: Arc<dyn Searcher>,
    ranker: Arc<dyn Ranker>,
    config: PipelineConfig,
}

impl SearchStage {
    pub fn new(
        web: Arc<dyn Searcher>,
        video: Arc<dyn Searcher>,
        ranker: Arc<dyn Ranker>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            web,
            video,
            ranker,
            config,
        }
    }
}

#[async_trait]
impl Stage for SearchStage {
    type Output = SearchUpdate;

    fn name(&self) -> &'static str {
        "search"
    }

    async fn run(&self, state: &PipelineState) -> Result<SearchUpdate> {
        let query = state.query();
        let range = state.date_range();

        let web_unit = format!("search:{}", self.web.name());
        let video_unit = format!("search:{}", self.video.name());
        let (web, video) = tokio::join!(
            isolate(&web_unit, self.web.search(query, self.config.web_results, range)),
            isolate(&video_unit, self.video.search(query, self.config.video_results, range)),
        );

        let web = web.unwrap_or_default();
        let video = video.unwrap_or_default();
        info!(web = web.len(), video = video.len(), "Search providers returned");

        let mut candidates = web;
        candidates.extend(video);

        let top_k = self.config.top_k;
        let search_results =
            match isolate("rank", self.ranker.rank(query, candidates.clone(), top_k)).await {
                Some(ranked) => ranked,
                None => {
                    warn!(top_k, "Ranking unavailable, keeping discovery order");
                    candidates.truncate(top_k);
                    candidates
                }
            };

        info!(kept = search_results.len(), "Search stage complete");
        Ok(SearchUpdate { search_results })
    }
}
