//! Extraction stage: batched fan-out with an early stop.
//!
//! Candidates are split into batches of `batch_size`. Within a batch every
//! item runs concurrently; the stop condition is only checked between
//! batches, so a batch is never cancelled half way. Once `target_count`
//! records exist no further batch is dispatched and the record list is capped
//! at `target_count`.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info};

use crate::error::Result;
use crate::pipeline::engine::Stage;
use crate::pipeline::isolate::isolate;
use crate::traits::fetcher::{FetchedPage, Fetcher};
use crate::types::source::{ExtractedContent, SearchResult};
use crate::types::state::{ExtractUpdate, PipelineState};

pub struct ExtractStage {
    fetcher: Arc<dyn Fetcher>,
    batch_size: usize,
}

impl ExtractStage {
    pub fn new(fetcher: Arc<dyn Fetcher>, batch_size: usize) -> Self {
        Self {
            fetcher,
            batch_size: batch_size.max(1),
        }
    }

    /// Extract one candidate. `None` means the item contributes nothing.
    async fn extract_one(&self, candidate: &SearchResult) -> Option<ExtractedContent> {
        let unit = format!("extract:{}", candidate.url);

        let fetched = if candidate.source_kind.is_page() {
            isolate(&unit, self.fetcher.fetch_page(&candidate.url))
                .await
                .flatten()
                .and_then(|page| from_page(candidate, page))
        } else {
            match candidate.resolve_video_id() {
                Some(video_id) => isolate(&unit, self.fetcher.fetch_transcript(&video_id))
                    .await
                    .flatten()
                    .and_then(|text| ExtractedContent::from_candidate(candidate, text)),
                None => {
                    debug!(url = %candidate.url, "No video id, skipping transcript");
                    None
                }
            }
        };

        fetched.or_else(|| {
            let text = candidate.fallback_text()?;
            debug!(url = %candidate.url, "Using search snippet as content");
            ExtractedContent::from_candidate(candidate, text)
        })
    }
}

/// Build a record from a fetched page. Page metadata wins over search metadata.
fn from_page(candidate: &SearchResult, page: FetchedPage) -> Option<ExtractedContent> {
    let mut content = ExtractedContent::from_candidate(candidate, page.text)?;

    if let Some(thumbnail) = page.thumbnail.filter(|v| !v.is_empty()) {
        content.thumbnail = Some(thumbnail);
    }
    if let Some(description) = page.description.filter(|v| !v.is_empty()) {
        content.description = Some(description);
    }
    if let Some(date) = page.published_date.filter(|v| !v.is_empty()) {
        content.published_date = Some(date);
    }

    Some(content)
}

#[async_trait]
impl Stage for ExtractStage {
    type Output = ExtractUpdate;

    fn name(&self) -> &'static str {
        "extract"
    }

    async fn run(&self, state: &PipelineState) -> Result<ExtractUpdate> {
        let target = state.target_count();
        let candidates = state.search_results();
        let mut contents = Vec::new();
        let mut dispatched = 0;

        for (n, batch) in candidates.chunks(self.batch_size).enumerate() {
            if contents.len() >= target {
                break;
            }

            info!(batch = n + 1, size = batch.len(), have = contents.len(), target, "Extracting batch");
            dispatched += batch.len();

            let records = join_all(batch.iter().map(|c| self.extract_one(c))).await;
            contents.extend(records.into_iter().flatten());
        }

        contents.truncate(target);
        info!(
            candidates = candidates.len(),
            dispatched,
            extracted = contents.len(),
            target,
            "Extraction complete"
        );
        Ok(ExtractUpdate { contents })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::testing::{state_with_results, MockFetcher};
    use crate::traits::fetcher::FetchedPage;
    use crate::types::source::SourceKind;

    fn page(i: usize) -> SearchResult {
        SearchResult::new(format!("https://site{}.com", i), format!("T{}", i), SourceKind::Web)
    }

    #[tokio::test]
    async fn test_page_metadata_overrides_search_metadata() {
        let candidate = page(0)
            .with_thumbnail("https://search/thumb.png")
            .with_published_date("2024-01-01");
        let fetcher = MockFetcher::new().with_fetched_page(
            "https://site0.com",
            FetchedPage::new("body").with_published_date("2024-05-01"),
        );

        let stage = ExtractStage::new(Arc::new(fetcher), 5);
        let update = stage.run(&state_with_results(vec![candidate], 5)).await.unwrap();

        let content = &update.contents[0];
        assert_eq!(content.text, "body");
        assert_eq!(content.thumbnail.as_deref(), Some("https://search/thumb.png"));
        assert_eq!(content.published_date.as_deref(), Some("2024-05-01"));
    }

    #[tokio::test]
    async fn test_fallback_to_snippet_then_description() {
        let candidates = vec![
            page(0).with_snippet("snippet text"),
            page(1).with_description("description text"),
            page(2),
        ];
        let fetcher = MockFetcher::new().failing_url("https://site0.com");

        let stage = ExtractStage::new(Arc::new(fetcher), 5);
        let update = stage.run(&state_with_results(candidates, 5)).await.unwrap();

        let texts: Vec<_> = update.contents.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["snippet text", "description text"]);
    }

    #[tokio::test]
    async fn test_video_uses_transcript_without_page_fetch() {
        let candidate = SearchResult::new(
            "https://www.youtube.com/watch?v=abc123",
            "Talk",
            SourceKind::Video,
        );
        let fetcher = MockFetcher::new().with_transcript("abc123", "spoken words");

        let stage = ExtractStage::new(Arc::new(fetcher.clone()), 5);
        let update = stage.run(&state_with_results(vec![candidate], 5)).await.unwrap();

        assert_eq!(update.contents[0].text, "spoken words");
        assert_eq!(fetcher.transcript_calls(), vec!["abc123".to_string()]);
        assert!(fetcher.page_calls().is_empty());
    }

    #[tokio::test]
    async fn test_stops_between_batches() {
        let candidates: Vec<_> = (0..12).map(page).collect();
        let fetcher = (0..12).fold(MockFetcher::new(), |f, i| {
            f.with_page(format!("https://site{}.com", i), format!("text {}", i))
        });

        let stage = ExtractStage::new(Arc::new(fetcher.clone()), 5);
        let update = stage.run(&state_with_results(candidates, 3)).await.unwrap();

        // first batch of five already meets the target
        assert_eq!(fetcher.page_calls().len(), 5);
        let urls: Vec<_> = update.contents.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["https://site0.com", "https://site1.com", "https://site2.com"]);
    }

    #[tokio::test]
    async fn test_batch_keeps_submission_order() {
        let fetcher = (0..3)
            .fold(MockFetcher::new(), |f, i| {
                f.with_page(format!("https://site{}.com", i), format!("text {}", i))
            })
            .with_delay("https://site0.com", Duration::from_millis(60))
            .with_delay("https://site1.com", Duration::from_millis(30));

        let stage = ExtractStage::new(Arc::new(fetcher.clone()), 5);
        let update = stage
            .run(&state_with_results((0..3).map(page).collect(), 3))
            .await
            .unwrap();

        // slowest first, finished last
        assert_eq!(
            fetcher.finished(),
            vec!["https://site2.com", "https://site1.com", "https://site0.com"]
        );
        let urls: Vec<_> = update.contents.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["https://site0.com", "https://site1.com", "https://site2.com"]);
    }

    #[tokio::test]
    async fn test_zero_target_dispatches_nothing() {
        let fetcher = MockFetcher::new().with_page("https://site0.com", "text");
        let stage = ExtractStage::new(Arc::new(fetcher.clone()), 5);

        let update = stage.run(&state_with_results(vec![page(0)], 0)).await.unwrap();
        assert!(update.contents.is_empty());
        assert!(fetcher.page_calls().is_empty());
    }
}
