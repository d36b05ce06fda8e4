//! SSRF guard around another fetcher.

use async_trait::async_trait;
use tracing::warn;

use crate::error::FetchResult;
use crate::security::UrlValidator;
use crate::traits::fetcher::{FetchedPage, Fetcher};

/// A fetcher that validates every page URL before handing it on.
///
/// Search results are untrusted input; wrap the production fetcher in this:
///
/// ```rust,ignore
/// let fetcher = ValidatedFetcher::new(HttpFetcher::new(FetchConfig::default())?);
/// ```
///
/// Transcripts are always fetched from the video platform's own hosts, so
/// they pass straight through.
pub struct ValidatedFetcher<F: Fetcher> {
    inner: F,
    validator: UrlValidator,
}

impl<F: Fetcher> ValidatedFetcher<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_validator(fetcher, UrlValidator::new())
    }

    pub fn with_validator(fetcher: F, validator: UrlValidator) -> Self {
        Self {
            inner: fetcher,
            validator,
        }
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for ValidatedFetcher<F> {
    async fn fetch_page(&self, url: &str) -> FetchResult<Option<FetchedPage>> {
        if let Err(e) = self.validator.validate_with_dns(url).await {
            warn!(url, error = %e, "Blocked page fetch");
            return Err(e.into());
        }
        self.inner.fetch_page(url).await
    }

    async fn fetch_transcript(&self, video_id: &str) -> FetchResult<Option<String>> {
        self.inner.fetch_transcript(video_id).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
