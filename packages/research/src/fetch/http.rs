//! HTTP-backed fetcher.
//!
//! # Example
//!
//! ```rust,ignore
//! use research::fetch::{HttpFetcher, ValidatedFetcher};
//!
//! let fetcher = ValidatedFetcher::new(HttpFetcher::new(FetchConfig::default())?);
//! let page = fetcher.fetch_page("https://example.com/post").await?;
//! ```

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT_LANGUAGE;
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::fetch::html::parse_page;
use crate::fetch::retry::with_retry;
use crate::fetch::transcript::{caption_tracks, format_transcript, select_track, watch_url};
use crate::traits::fetcher::{FetchedPage, Fetcher};
use crate::types::config::FetchConfig;

/// Fetches pages and video transcripts over HTTP.
///
/// Page fetches are retried per the configured [`RetryPolicy`]; transcript
/// fetches are attempted once. Every call runs under its own deadline.
///
/// [`RetryPolicy`]: crate::types::config::RetryPolicy
pub struct HttpFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        Ok(Self { client, config })
    }

    /// GET `url` and return the body. Non-success statuses are errors.
    async fn get_text(&self, url: &str) -> FetchResult<String> {
        debug!(url = %url, "HTTP fetch starting");
        let response = self
            .client
            .get(url)
            .header(ACCEPT_LANGUAGE, self.accept_language())
            .send()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))
    }

    fn accept_language(&self) -> String {
        if self.config.transcript_languages.is_empty() {
            "en".to_string()
        } else {
            self.config.transcript_languages.join(",")
        }
    }

    async fn page_once(&self, url: &str) -> FetchResult<Option<FetchedPage>> {
        let html = deadline(url, self.config.page_timeout(), self.get_text(url)).await?;

        let limit = self.config.page_text_limit;
        let page = tokio::task::spawn_blocking(move || parse_page(&html, limit))
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        if page.text.trim().is_empty() {
            debug!(url = %url, "Page has no extractable text");
            return Ok(None);
        }
        Ok(Some(page))
    }

    async fn transcript_once(&self, video_id: &str) -> FetchResult<Option<String>> {
        let watch_html = self.get_text(&watch_url(video_id)).await?;
        let tracks = caption_tracks(&watch_html);

        let Some(track) = select_track(&tracks, &self.config.transcript_languages) else {
            debug!(video_id, "No caption tracks");
            return Ok(None);
        };
        debug!(video_id, language = %track.language_code, "Fetching caption track");

        let xml = self.get_text(&track.base_url).await?;
        let limit = self.config.transcript_text_limit;
        let text = tokio::task::spawn_blocking(move || format_transcript(&xml, limit))
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        Ok(Some(text).filter(|t| !t.trim().is_empty()))
    }
}

/// Run `fut` under a deadline; expiry is a [`FetchError::Timeout`].
async fn deadline<T>(
    url: &str,
    limit: Duration,
    fut: impl Future<Output = FetchResult<T>>,
) -> FetchResult<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| FetchError::Timeout { url: url.to_string() })?
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> FetchResult<Option<FetchedPage>> {
        if url::Url::parse(url).is_err() {
            return Err(FetchError::InvalidUrl { url: url.to_string() });
        }

        with_retry(self.config.retry, url, move || self.page_once(url)).await
    }

    async fn fetch_transcript(&self, video_id: &str) -> FetchResult<Option<String>> {
        let url = watch_url(video_id);
        deadline(&url, self.config.transcript_timeout(), self.transcript_once(video_id)).await
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::config::RetryPolicy;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(FetchConfig::default().with_retry(RetryPolicy::none())).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_without_request() {
        let err = fetcher().fetch_page("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_deadline_maps_to_timeout() {
        let result: FetchResult<()> = deadline("https://slow.example.com", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(FetchError::Timeout { url }) if url == "https://slow.example.com"));
    }

    #[test]
    fn test_accept_language_from_transcript_languages() {
        assert_eq!(fetcher().accept_language(), "ko,en");
    }
}
