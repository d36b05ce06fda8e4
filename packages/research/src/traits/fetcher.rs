//! Content fetcher trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FetchResult;

/// Text and metadata pulled out of one web page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchedPage {
    /// Visible body text (paragraphs, headings, list items).
    pub text: String,

    /// `og:image`
    pub thumbnail: Option<String>,

    /// `meta description`, falling back to `og:description`
    pub description: Option<String>,

    /// Publication date (`YYYY-MM-DD`) from the first date meta tag found.
    pub published_date: Option<String>,
}

impl FetchedPage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_published_date(mut self, date: impl Into<String>) -> Self {
        self.published_date = Some(date.into());
        self
    }
}

/// Fetches the content behind a search candidate.
///
/// `Ok(None)` means "reachable, but nothing usable" (no transcript, empty
/// page). Errors and `None` are treated the same by the extraction stage.
///
/// # Implementations
///
/// - `HttpFetcher` - reqwest page fetch + caption-track transcripts
/// - `ValidatedFetcher` - SSRF guard around another fetcher
/// - `MockFetcher` - for testing
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch and parse a web page.
    async fn fetch_page(&self, url: &str) -> FetchResult<Option<FetchedPage>>;

    /// Fetch the plain-text transcript of a video.
    async fn fetch_transcript(&self, video_id: &str) -> FetchResult<Option<String>>;

    /// Fetcher name (for logging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_builder() {
        let page = FetchedPage::new("body")
            .with_thumbnail("https://img.example.com/a.png")
            .with_description("about")
            .with_published_date("2024-05-01");

        assert_eq!(page.text, "body");
        assert_eq!(page.thumbnail.as_deref(), Some("https://img.example.com/a.png"));
        assert_eq!(page.published_date.as_deref(), Some("2024-05-01"));
    }
}
