//! Staged Web Research Pipeline
//!
//! Turns a natural-language query into a categorized, cited report of recent
//! web and video sources. A run passes one state record through four stages:
//!
//! 1. **Search** - query web/community and video providers, rank the pool
//! 2. **Extract** - fetch page text or video transcripts in batches, stopping
//!    early once enough content is collected
//! 3. **Summarize** - summarize every item concurrently through a model
//! 4. **Report** - group summaries by category into Markdown or JSON
//!
//! Every external call is isolated: a failing provider, page or summary
//! shrinks the result instead of aborting the run.
//!
//! # Usage
//!
//! ```rust,ignore
//! use research::{Pipeline, PipelineConfig, ResearchRequest};
//! use research::testing::TestScenario;
//!
//! let scenario = TestScenario::new()
//!     .with_web_page("https://a.com", "A", "climate text");
//! let pipeline = scenario.pipeline(PipelineConfig::default());
//!
//! let state = pipeline.run(ResearchRequest::new("climate policy").into()).await?;
//! println!("{}", state.report().unwrap_or_default());
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator traits (Searcher, Ranker, Fetcher, Summarizer)
//! - [`types`] - State, candidates, summaries, configuration
//! - [`pipeline`] - Stage engine and the four stages
//! - [`search`] - Tavily and YouTube providers
//! - [`fetch`] - HTTP page and transcript fetching
//! - [`llm`] - Language model client and rate limiting
//! - [`jobs`] - Background run bookkeeping
//! - [`security`] - Credential handling and SSRF protection
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod fetch;
pub mod jobs;
pub mod llm;
pub mod pipeline;
pub mod search;
pub mod security;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{FetchError, JobError, PipelineError, Result, SecurityError};
pub use traits::{
    fetcher::{FetchedPage, Fetcher},
    ranker::Ranker,
    searcher::Searcher,
    summarizer::Summarizer,
};
pub use types::{
    config::{FetchConfig, PipelineConfig, RetryPolicy},
    request::ResearchRequest,
    source::{ExtractedContent, SearchResult, SourceKind},
    state::{DateRange, OutputFormat, PipelineState, StageUpdate},
    summary::{SummaryPayload, SummaryRecord},
};

// Re-export pipeline components
pub use pipeline::{
    compile, parse_summary, ExtractStage, LlmRanker, LlmSummarizer, ParseOutcome, Pipeline,
    PipelineEvent, PipelineStream, ReportStage, SearchStage, Stage, SummarizeStage,
};

// Re-export implementations
pub use fetch::{HttpFetcher, ValidatedFetcher};
pub use jobs::{JobRecord, JobStatus, JobStore};
pub use llm::{CompletionRequest, LanguageModel, LanguageModelExt, OpenAI, RateLimitedModel};
pub use search::{TavilySearcher, YouTubeSearcher};
pub use security::{SecretString, UrlValidator};
