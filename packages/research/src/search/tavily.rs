//! Tavily web search.
//!
//! Tavily returns page content alongside each hit, which the extract stage
//! uses as fallback text when a page cannot be fetched.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::security::SecretString;
use crate::traits::searcher::Searcher;
use crate::types::source::{SearchResult, SourceKind};
use crate::types::state::DateRange;

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";
const DEFAULT_DAYS: i64 = 3;

/// Hosts whose pages are tagged as community content.
const COMMUNITY_DOMAINS: &[&str] = &[
    "reddit.com",
    "news.ycombinator.com",
    "velog.io",
    "medium.com",
];

/// Web and community search via the Tavily API.
#[derive(Clone)]
pub struct TavilySearcher {
    client: Client,
    api_key: SecretString,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
    days: i64,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    published_date: Option<String>,
}

impl TavilySearcher {
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: api_key.into(),
            endpoint: TAVILY_SEARCH_URL.to_string(),
        }
    }

    /// Point at a different endpoint (proxies, test servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl std::fmt::Debug for TavilySearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilySearcher")
            .field("api_key", &self.api_key)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait]
impl Searcher for TavilySearcher {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        date_range: &DateRange,
    ) -> Result<Vec<SearchResult>> {
        let days = lookback_days(&date_range.start_date, Local::now().date_naive());
        debug!(query = %query, max_results, days, "Searching Tavily");

        let request = TavilyRequest {
            api_key: self.api_key.expose(),
            query,
            search_depth: "advanced",
            max_results,
            days,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Search(Box::new(e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Search(
                format!("Tavily API error ({}): {}", status, error_text).into(),
            ));
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Search(Box::new(e)))?;

        let results = map_results(body);
        debug!(count = results.len(), "Tavily search completed");
        Ok(results)
    }

    fn name(&self) -> &str {
        "tavily"
    }
}

/// Days between `start_date` and `today`, inclusive, at least 1.
///
/// Falls back to 3 days when `start_date` does not parse.
fn lookback_days(start_date: &str, today: NaiveDate) -> i64 {
    match NaiveDate::parse_from_str(start_date, "%Y-%m-%d") {
        Ok(start) => ((today - start).num_days() + 1).max(1),
        Err(e) => {
            warn!(start_date = %start_date, error = %e, "Unparseable start date, using default lookback");
            DEFAULT_DAYS
        }
    }
}

fn classify(url: &str) -> SourceKind {
    if COMMUNITY_DOMAINS.iter().any(|d| url.contains(d)) {
        SourceKind::Community
    } else {
        SourceKind::Web
    }
}

fn map_results(response: TavilyResponse) -> Vec<SearchResult> {
    response
        .results
        .into_iter()
        .filter(|r| !r.url.is_empty())
        .map(|r| {
            let mut result = SearchResult::new(&r.url, r.title, classify(&r.url));
            if let Some(text) = r.content.or(r.snippet).filter(|t| !t.is_empty()) {
                result = result.with_snippet(text);
            }
            if let Some(date) = r.published_date.filter(|d| !d.is_empty()) {
                result = result.with_published_date(date);
            }
            result
        })
        .collect()
}
