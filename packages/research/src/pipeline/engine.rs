//! Pipeline engine.
//!
//! Runs the four stages strictly in order over one [`PipelineState`]:
//!
//! ```text
//! search -> extract -> summarize -> report
//! ```
//!
//! Each stage reads the state and returns a typed update; only the engine
//! merges updates, via [`PipelineState::apply`]. [`Pipeline::run_stream`]
//! yields every merged update followed by the final state, and
//! [`Pipeline::run`] is nothing more than draining that stream, so the two
//! modes cannot drift apart.

use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::{error, info};

use crate::error::{PipelineError, Result};
use crate::pipeline::extract::ExtractStage;
use crate::pipeline::report::ReportStage;
use crate::pipeline::search::SearchStage;
use crate::pipeline::summarize::SummarizeStage;
use crate::traits::{fetcher::Fetcher, ranker::Ranker, searcher::Searcher, summarizer::Summarizer};
use crate::types::config::PipelineConfig;
use crate::types::state::{
    ExtractUpdate, PipelineState, ReportUpdate, SearchUpdate, StageUpdate, SummarizeUpdate,
};

/// One pipeline stage.
///
/// `Output` names the only state fields the stage may write.
#[async_trait]
pub trait Stage: Send + Sync {
    type Output: Into<StageUpdate> + Send;

    fn name(&self) -> &'static str;

    /// Compute this stage's update. An `Err` aborts the run.
    async fn run(&self, state: &PipelineState) -> Result<Self::Output>;
}

/// Something observed while a run progresses.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A stage finished and its update has been merged.
    StageCompleted { update: StageUpdate },
    /// All stages finished.
    Finished { state: PipelineState },
}

pub type PipelineStream<'a> = Pin<Box<dyn Stream<Item = Result<PipelineEvent>> + Send + 'a>>;

/// The research pipeline.
#[derive(Clone)]
pub struct Pipeline {
    search: Arc<dyn Stage<Output = SearchUpdate>>,
    extract: Arc<dyn Stage<Output = ExtractUpdate>>,
    summarize: Arc<dyn Stage<Output = SummarizeUpdate>>,
    report: Arc<dyn Stage<Output = ReportUpdate>>,
}

impl Pipeline {
    /// Assemble the standard stages from their collaborators.
    pub fn new(
        web: Arc<dyn Searcher>,
        video: Arc<dyn Searcher>,
        ranker: Arc<dyn Ranker>,
        fetcher: Arc<dyn Fetcher>,
        summarizer: Arc<dyn Summarizer>,
        config: PipelineConfig,
    ) -> Self {
        Self::from_stages(
            Arc::new(SearchStage::new(web, video, ranker, config.clone())),
            Arc::new(ExtractStage::new(fetcher, config.batch_size)),
            Arc::new(SummarizeStage::new(summarizer, config.summary_char_budget)),
            Arc::new(ReportStage),
        )
    }

    /// Assemble a pipeline from arbitrary stage implementations.
    pub fn from_stages(
        search: Arc<dyn Stage<Output = SearchUpdate>>,
        extract: Arc<dyn Stage<Output = ExtractUpdate>>,
        summarize: Arc<dyn Stage<Output = SummarizeUpdate>>,
        report: Arc<dyn Stage<Output = ReportUpdate>>,
    ) -> Self {
        Self {
            search,
            extract,
            summarize,
            report,
        }
    }

    /// Run every stage and return the final state.
    pub async fn run(&self, state: PipelineState) -> Result<PipelineState> {
        let mut events = self.run_stream(state);
        while let Some(event) = events.next().await {
            if let PipelineEvent::Finished { state } = event? {
                return Ok(state);
            }
        }
        Err(PipelineError::stage("engine", "stream ended without a final state"))
    }

    /// Run every stage, yielding each merged update and then the final state.
    ///
    /// The stream ends after the first error.
    pub fn run_stream(&self, mut state: PipelineState) -> PipelineStream<'_> {
        Box::pin(stream! {
            info!(query = state.query(), target = state.target_count(), "Starting research run");

            match run_stage(self.search.as_ref(), &mut state).await {
                Ok(update) => yield Ok(PipelineEvent::StageCompleted { update }),
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }

            match run_stage(self.extract.as_ref(), &mut state).await {
                Ok(update) => yield Ok(PipelineEvent::StageCompleted { update }),
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }

            match run_stage(self.summarize.as_ref(), &mut state).await {
                Ok(update) => yield Ok(PipelineEvent::StageCompleted { update }),
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }

            match run_stage(self.report.as_ref(), &mut state).await {
                Ok(update) => yield Ok(PipelineEvent::StageCompleted { update }),
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }

            info!(
                results = state.search_results().len(),
                contents = state.contents().len(),
                summaries = state.summaries().len(),
                "Research run finished"
            );
            yield Ok(PipelineEvent::Finished { state });
        })
    }
}

async fn run_stage<S>(stage: &S, state: &mut PipelineState) -> Result<StageUpdate>
where
    S: Stage + ?Sized,
{
    info!(stage = stage.name(), "Stage started");
    let update: StageUpdate = match stage.run(state).await {
        Ok(output) => output.into(),
        Err(e) => {
            error!(stage = stage.name(), error = %e, "Stage failed, aborting run");
            return Err(e);
        }
    };

    state.apply(update.clone())?;
    info!(stage = stage.name(), "Stage completed");
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{state_with_target, MockFetcher, MockSearcher, MockSummarizer, MockRanker};
    use crate::types::source::{SearchResult, SourceKind};
    use crate::types::state::OutputFormat;

    struct FailingStage;

    #[async_trait]
    impl Stage for FailingStage {
        type Output = ExtractUpdate;

        fn name(&self) -> &'static str {
            "extract"
        }

        async fn run(&self, _state: &PipelineState) -> Result<ExtractUpdate> {
            Err(PipelineError::stage("extract", "fetcher could not be built"))
        }
    }

    fn pipeline(web: MockSearcher, fetcher: MockFetcher) -> Pipeline {
        Pipeline::new(
            Arc::new(web),
            Arc::new(MockSearcher::new()),
            Arc::new(MockRanker::passthrough()),
            Arc::new(fetcher),
            Arc::new(MockSummarizer::new()),
            PipelineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_run_and_stream_agree() {
        let web = MockSearcher::new()
            .with_result(SearchResult::new("https://a.com", "A", SourceKind::Web))
            .with_result(SearchResult::new("https://b.com", "B", SourceKind::Web));
        let fetcher = MockFetcher::new()
            .with_page("https://a.com", "alpha text")
            .with_page("https://b.com", "beta text");
        let pipeline = pipeline(web, fetcher);

        let final_state = pipeline
            .run(state_with_target("q", OutputFormat::Json, 5))
            .await
            .unwrap();

        let events: Vec<_> = pipeline
            .run_stream(state_with_target("q", OutputFormat::Json, 5))
            .collect()
            .await;
        let stages: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Ok(PipelineEvent::StageCompleted { update }) => Some(update.stage()),
                _ => None,
            })
            .collect();
        assert_eq!(stages, vec!["search", "extract", "summarize", "report"]);

        let Some(Ok(PipelineEvent::Finished { state })) = events.last() else {
            panic!("stream did not finish");
        };
        assert_eq!(state.summaries(), final_state.summaries());
        assert_eq!(state.report(), final_state.report());
        assert_eq!(final_state.contents().len(), 2);
    }

    #[tokio::test]
    async fn test_stage_error_aborts_run() {
        let base = pipeline(MockSearcher::new(), MockFetcher::new());
        let pipeline = Pipeline::from_stages(
            base.search.clone(),
            Arc::new(FailingStage),
            base.summarize.clone(),
            base.report.clone(),
        );

        let err = pipeline
            .run(state_with_target("q", OutputFormat::Markdown, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Stage { stage: "extract", .. }));

        let events: Vec<_> = pipeline
            .run_stream(state_with_target("q", OutputFormat::Markdown, 5))
            .collect()
            .await;
        assert_eq!(events.len(), 2);
        assert!(events[1].is_err());
    }

    #[tokio::test]
    async fn test_zero_results_is_empty_report() {
        let pipeline = pipeline(MockSearcher::new(), MockFetcher::new());
        let state = pipeline
            .run(state_with_target("nothing", OutputFormat::Markdown, 5))
            .await
            .unwrap();

        assert!(state.summaries().is_empty());
        assert_eq!(state.report(), Some("# Research Report: nothing\n\n"));
    }
}
