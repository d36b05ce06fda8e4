//! Testing utilities including mock implementations.
//!
//! These let applications (and this crate's own tests) drive the pipeline
//! without network or model calls. Every mock is cheaply cloneable and shares
//! its state between clones, so a test can hand one clone to the pipeline and
//! keep another for assertions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{FetchError, FetchResult, PipelineError, Result};
use crate::llm::{CompletionRequest, LanguageModel};
use crate::pipeline::engine::Pipeline;
use crate::pipeline::parse::{parse_summary, ParseOutcome};
use crate::traits::{
    fetcher::{FetchedPage, Fetcher},
    ranker::Ranker,
    searcher::Searcher,
    summarizer::Summarizer,
};
use crate::types::{
    config::PipelineConfig,
    source::{ExtractedContent, SearchResult, SourceKind},
    state::{DateRange, ExtractUpdate, OutputFormat, PipelineState, SearchUpdate},
    summary::{SummaryPayload, DEFAULT_CATEGORY},
};

// ============================================================================
// Searcher
// ============================================================================

/// A mock search provider returning a fixed result list.
#[derive(Clone, Default)]
pub struct MockSearcher {
    results: Arc<RwLock<Vec<SearchResult>>>,
    error: Option<String>,
    calls: Arc<RwLock<Vec<SearchCall>>>,
}

/// Record of a call made to the mock searcher.
#[derive(Debug, Clone)]
pub struct SearchCall {
    pub query: String,
    pub max_results: usize,
    pub date_range: DateRange,
}

impl MockSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result.
    pub fn with_result(self, result: SearchResult) -> Self {
        self.results.write().unwrap().push(result);
        self
    }

    /// Append several results.
    pub fn with_results(self, results: impl IntoIterator<Item = SearchResult>) -> Self {
        self.results.write().unwrap().extend(results);
        self
    }

    /// Make every call fail.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    pub fn calls(&self) -> Vec<SearchCall> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl Searcher for MockSearcher {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        date_range: &DateRange,
    ) -> Result<Vec<SearchResult>> {
        self.calls.write().unwrap().push(SearchCall {
            query: query.to_string(),
            max_results,
            date_range: date_range.clone(),
        });

        if let Some(message) = &self.error {
            return Err(PipelineError::Search(message.clone().into()));
        }

        Ok(self
            .results
            .read()
            .unwrap()
            .iter()
            .take(max_results)
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Ranker
// ============================================================================

/// A mock ranker.
#[derive(Clone, Default)]
pub struct MockRanker {
    /// Scores by URL; unlisted candidates keep no score.
    scores: Arc<RwLock<HashMap<String, u8>>>,
    error: Option<String>,
    calls: Arc<RwLock<Vec<RankCall>>>,
}

/// Record of a call made to the mock ranker.
#[derive(Debug, Clone)]
pub struct RankCall {
    pub query: String,
    pub candidates: usize,
    pub top_k: usize,
}

impl MockRanker {
    /// Keep discovery order, truncate to `top_k`.
    pub fn passthrough() -> Self {
        Self::default()
    }

    /// Fail every call.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Score a URL. Scored candidates are sorted (stably) by score.
    pub fn with_score(self, url: impl Into<String>, score: u8) -> Self {
        self.scores.write().unwrap().insert(url.into(), score);
        self
    }

    pub fn calls(&self) -> Vec<RankCall> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl Ranker for MockRanker {
    async fn rank(
        &self,
        query: &str,
        candidates: Vec<SearchResult>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        self.calls.write().unwrap().push(RankCall {
            query: query.to_string(),
            candidates: candidates.len(),
            top_k,
        });

        if let Some(message) = &self.error {
            return Err(PipelineError::Model(message.clone().into()));
        }

        let scores = self.scores.read().unwrap();
        let mut ranked: Vec<_> = candidates
            .into_iter()
            .map(|mut c| {
                if let Some(score) = scores.get(&c.url) {
                    c.relevance_score = Some(*score);
                }
                c
            })
            .collect();

        if !scores.is_empty() {
            ranked.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
        }
        ranked.truncate(top_k);
        Ok(ranked)
    }
}

// ============================================================================
// Fetcher
// ============================================================================

/// A mock fetcher with predefined pages and transcripts.
///
/// Unknown URLs and video ids yield `Ok(None)`.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<RwLock<HashMap<String, FetchedPage>>>,
    transcripts: Arc<RwLock<HashMap<String, String>>>,
    fail: Arc<RwLock<Vec<String>>>,
    panic: Arc<RwLock<Vec<String>>>,
    delays: Arc<RwLock<HashMap<String, Duration>>>,
    calls: Arc<RwLock<Vec<MockFetcherCall>>>,
    finished: Arc<RwLock<Vec<String>>>,
}

/// Record of a call made to the mock fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFetcherCall {
    Page { url: String },
    Transcript { video_id: String },
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page with body text only.
    pub fn with_page(self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.with_fetched_page(url, FetchedPage::new(text))
    }

    /// Add a page with metadata.
    pub fn with_fetched_page(self, url: impl Into<String>, page: FetchedPage) -> Self {
        self.pages.write().unwrap().insert(url.into(), page);
        self
    }

    /// Add a transcript.
    pub fn with_transcript(self, video_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.transcripts
            .write()
            .unwrap()
            .insert(video_id.into(), text.into());
        self
    }

    /// Make fetches of this URL or video id fail.
    pub fn failing_url(self, key: impl Into<String>) -> Self {
        self.fail.write().unwrap().push(key.into());
        self
    }

    /// Make fetches of this URL or video id panic.
    pub fn panicking_url(self, key: impl Into<String>) -> Self {
        self.panic.write().unwrap().push(key.into());
        self
    }

    /// Delay fetches of this URL or video id.
    pub fn with_delay(self, key: impl Into<String>, delay: Duration) -> Self {
        self.delays.write().unwrap().insert(key.into(), delay);
        self
    }

    pub fn calls(&self) -> Vec<MockFetcherCall> {
        self.calls.read().unwrap().clone()
    }

    /// URLs and video ids in the order their fetches finished.
    pub fn finished(&self) -> Vec<String> {
        self.finished.read().unwrap().clone()
    }

    /// URLs passed to `fetch_page`, in call order.
    pub fn page_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockFetcherCall::Page { url } => Some(url),
                _ => None,
            })
            .collect()
    }

    /// Video ids passed to `fetch_transcript`, in call order.
    pub fn transcript_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockFetcherCall::Transcript { video_id } => Some(video_id),
                _ => None,
            })
            .collect()
    }

    async fn wait(&self, key: &str) {
        let delay = self.delays.read().unwrap().get(key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.finished.write().unwrap().push(key.to_string());
    }

    fn check_failure(&self, key: &str) -> FetchResult<()> {
        if self.panic.read().unwrap().iter().any(|k| k == key) {
            panic!("mock fetcher panic for {}", key);
        }
        if self.fail.read().unwrap().iter().any(|k| k == key) {
            return Err(FetchError::Http(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Mock connection refused",
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch_page(&self, url: &str) -> FetchResult<Option<FetchedPage>> {
        self.calls
            .write()
            .unwrap()
            .push(MockFetcherCall::Page { url: url.to_string() });
        self.wait(url).await;
        self.check_failure(url)?;
        Ok(self.pages.read().unwrap().get(url).cloned())
    }

    async fn fetch_transcript(&self, video_id: &str) -> FetchResult<Option<String>> {
        self.calls.write().unwrap().push(MockFetcherCall::Transcript {
            video_id: video_id.to_string(),
        });
        self.wait(video_id).await;
        self.check_failure(video_id)?;
        Ok(self.transcripts.read().unwrap().get(video_id).cloned())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Summarizer
// ============================================================================

/// A mock summarizer keyed by input text.
///
/// Unconfigured text yields a single structured point, `Summary of {text}`,
/// in category `General`.
#[derive(Clone, Default)]
pub struct MockSummarizer {
    raw: Arc<RwLock<HashMap<String, String>>>,
    payloads: Arc<RwLock<HashMap<String, SummaryPayload>>>,
    errors: Arc<RwLock<HashMap<String, String>>>,
    calls: Arc<RwLock<Vec<SummarizeCall>>>,
}

/// Record of a call made to the mock summarizer.
#[derive(Debug, Clone)]
pub struct SummarizeCall {
    pub text: String,
    pub language: String,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend the model answered `raw` for `text`; the answer goes through
    /// the real recovery ladder.
    pub fn with_raw(self, text: impl Into<String>, raw: impl Into<String>) -> Self {
        self.raw.write().unwrap().insert(text.into(), raw.into());
        self
    }

    /// Return a structured payload for `text`.
    pub fn with_payload(self, text: impl Into<String>, payload: SummaryPayload) -> Self {
        self.payloads.write().unwrap().insert(text.into(), payload);
        self
    }

    /// Fail the model call for `text`.
    pub fn failing_text(self, text: impl Into<String>, message: impl Into<String>) -> Self {
        self.errors
            .write()
            .unwrap()
            .insert(text.into(), message.into());
        self
    }

    pub fn calls(&self) -> Vec<SummarizeCall> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, text: &str, language: &str) -> Result<ParseOutcome> {
        self.calls.write().unwrap().push(SummarizeCall {
            text: text.to_string(),
            language: language.to_string(),
        });

        if let Some(message) = self.errors.read().unwrap().get(text) {
            return Err(PipelineError::Model(message.clone().into()));
        }
        if let Some(raw) = self.raw.read().unwrap().get(text) {
            return Ok(parse_summary(raw));
        }
        if let Some(payload) = self.payloads.read().unwrap().get(text) {
            return Ok(ParseOutcome::Structured(payload.clone()));
        }

        Ok(ParseOutcome::Structured(SummaryPayload::new(
            vec![format!("Summary of {}", text)],
            DEFAULT_CATEGORY,
        )))
    }
}

// ============================================================================
// Language model
// ============================================================================

/// A mock language model replaying scripted responses.
///
/// Responses are returned in order; the last one repeats. With no script the
/// model answers `{}`.
#[derive(Clone, Default)]
pub struct MockLanguageModel {
    responses: Arc<RwLock<Vec<String>>>,
    error: Option<String>,
    calls: Arc<RwLock<Vec<CompletionRequest>>>,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.responses.write().unwrap().push(response.into());
        self
    }

    /// Fail every call.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let call_index = {
            let mut calls = self.calls.write().unwrap();
            calls.push(request.clone());
            calls.len() - 1
        };

        if let Some(message) = &self.error {
            return Err(PipelineError::Model(message.clone().into()));
        }

        let responses = self.responses.read().unwrap();
        Ok(responses
            .get(call_index)
            .or_else(|| responses.last())
            .cloned()
            .unwrap_or_else(|| "{}".to_string()))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A fixed search window.
pub fn date_range() -> DateRange {
    DateRange {
        start_date: "2024-05-01".to_string(),
        end_date: "2024-05-02".to_string(),
        start_time: "00:00:00".to_string(),
        end_time: "23:59:59".to_string(),
    }
}

/// Fresh state for `query`.
pub fn state_with_target(query: &str, format: OutputFormat, target: usize) -> PipelineState {
    PipelineState::new(query, "English", format, date_range(), target)
}

/// State that has been through the search stage.
pub fn state_with_results(results: Vec<SearchResult>, target: usize) -> PipelineState {
    let mut state = state_with_target("query", OutputFormat::Markdown, target);
    state
        .apply(SearchUpdate { search_results: results }.into())
        .unwrap();
    state
}

/// State that has been through the extraction stage.
pub fn state_with_contents(contents: Vec<ExtractedContent>) -> PipelineState {
    let target = contents.len();
    let mut state = state_with_target("query", OutputFormat::Markdown, target);
    state.apply(ExtractUpdate { contents }.into()).unwrap();
    state
}

/// Web page content numbered `i` (`https://site{i}.com`, title `T{i}`).
pub fn content(i: usize, text: &str) -> ExtractedContent {
    ExtractedContent {
        url: format!("https://site{}.com", i),
        title: format!("T{}", i),
        text: text.to_string(),
        source_kind: SourceKind::Web,
        thumbnail: None,
        description: None,
        published_date: None,
    }
}

// ============================================================================
// Scenario
// ============================================================================

/// Builder for a complete mocked pipeline.
#[derive(Clone, Default)]
pub struct TestScenario {
    web: MockSearcher,
    video: MockSearcher,
    ranker: MockRanker,
    fetcher: MockFetcher,
    summarizer: MockSummarizer,
}

impl TestScenario {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a web page found by search, with body text.
    pub fn with_web_page(mut self, url: &str, title: &str, text: &str) -> Self {
        self.web = self
            .web
            .with_result(SearchResult::new(url, title, SourceKind::Web));
        self.fetcher = self.fetcher.with_page(url, text);
        self
    }

    /// Add a video found by search, with a transcript.
    pub fn with_video(mut self, video_id: &str, title: &str, transcript: &str) -> Self {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);
        self.video = self.video.with_result(
            SearchResult::new(url, title, SourceKind::Video).with_video_id(video_id),
        );
        self.fetcher = self.fetcher.with_transcript(video_id, transcript);
        self
    }

    /// Categorize the summary of `text`.
    pub fn with_category(mut self, text: &str, category: &str) -> Self {
        self.summarizer = self.summarizer.with_payload(
            text,
            SummaryPayload::new(vec![format!("Summary of {}", text)], category),
        );
        self
    }

    /// Replace the ranker.
    pub fn with_ranker(mut self, ranker: MockRanker) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn web(&self) -> &MockSearcher {
        &self.web
    }

    pub fn video(&self) -> &MockSearcher {
        &self.video
    }

    pub fn fetcher(&self) -> &MockFetcher {
        &self.fetcher
    }

    pub fn summarizer(&self) -> &MockSummarizer {
        &self.summarizer
    }

    /// Build a pipeline over clones of the mocks.
    pub fn pipeline(&self, config: PipelineConfig) -> Pipeline {
        Pipeline::new(
            Arc::new(self.web.clone()),
            Arc::new(self.video.clone()),
            Arc::new(self.ranker.clone()),
            Arc::new(self.fetcher.clone()),
            Arc::new(self.summarizer.clone()),
            config,
        )
    }
}
