//! Configuration types for the pipeline and its HTTP collaborators.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the research pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Candidates requested from the web/community provider.
    ///
    /// Larger than the target count, since extraction failures shrink the pool.
    /// Default: 20.
    pub web_results: usize,

    /// Candidates requested from the video provider. Default: 10.
    pub video_results: usize,

    /// Candidates kept after ranking. Default: 20.
    pub top_k: usize,

    /// Items extracted concurrently before each early-stop check. Default: 5.
    pub batch_size: usize,

    /// Characters of extracted text sent to the summarizer. Default: 5000.
    pub summary_char_budget: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            web_results: 20,
            video_results: 10,
            top_k: 20,
            batch_size: 5,
            summary_char_budget: 5000,
        }
    }
}

impl PipelineConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set provider pool sizes.
    pub fn with_pool_sizes(mut self, web: usize, video: usize) -> Self {
        self.web_results = web;
        self.video_results = video;
        self
    }

    /// Set the ranking cutoff.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the extraction batch size (minimum 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the summarizer character budget.
    pub fn with_summary_char_budget(mut self, budget: usize) -> Self {
        self.summary_char_budget = budget;
        self
    }
}

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,

    /// Delay between attempts in milliseconds.
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 2000,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            delay_ms: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-call page timeout in seconds. Default: 15.
    pub page_timeout_secs: u64,

    /// Per-call transcript timeout in seconds. Default: 10.
    pub transcript_timeout_secs: u64,

    /// Retry policy for the page fetch step.
    pub retry: RetryPolicy,

    /// Characters of page text kept. Default: 10000.
    pub page_text_limit: usize,

    /// Characters of transcript kept. Default: 10000.
    pub transcript_text_limit: usize,

    /// Preferred transcript languages, in order.
    pub transcript_languages: Vec<String>,

    /// User agent sent with page requests.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_timeout_secs: 15,
            transcript_timeout_secs: 10,
            retry: RetryPolicy::default(),
            page_text_limit: 10_000,
            transcript_text_limit: 10_000,
            transcript_languages: vec!["ko".to_string(), "en".to_string()],
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
                .to_string(),
        }
    }
}

impl FetchConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn transcript_timeout(&self) -> Duration {
        Duration::from_secs(self.transcript_timeout_secs)
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the preferred transcript languages.
    pub fn with_transcript_languages(
        mut self,
        languages: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.transcript_languages = languages.into_iter().map(Into::into).collect();
        self
    }
}
