//! YouTube Data API v3 video search.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::security::SecretString;
use crate::traits::searcher::Searcher;
use crate::types::source::{SearchResult, SourceKind};
use crate::types::state::DateRange;

const YOUTUBE_SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";

/// Video search via the YouTube Data API.
#[derive(Clone)]
pub struct YouTubeSearcher {
    client: Client,
    api_key: SecretString,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl Thumbnails {
    /// Highest available resolution.
    fn best(self) -> Option<String> {
        self.high
            .or(self.medium)
            .or(self.default)
            .map(|t| t.url)
            .filter(|u| !u.is_empty())
    }
}

impl YouTubeSearcher {
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: api_key.into(),
            endpoint: YOUTUBE_SEARCH_URL.to_string(),
        }
    }

    /// Point at a different endpoint (proxies, test servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl std::fmt::Debug for YouTubeSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YouTubeSearcher")
            .field("api_key", &self.api_key)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait]
impl Searcher for YouTubeSearcher {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        date_range: &DateRange,
    ) -> Result<Vec<SearchResult>> {
        debug!(query = %query, max_results, "Searching YouTube");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&query_params(
                self.api_key.expose(),
                query,
                max_results,
                date_range,
            ))
            .send()
            .await
            .map_err(|e| PipelineError::Search(Box::new(e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Search(
                format!("YouTube API error ({}): {}", status, error_text).into(),
            ));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Search(Box::new(e)))?;

        let results = map_items(body);
        debug!(count = results.len(), "YouTube search completed");
        Ok(results)
    }

    fn name(&self) -> &str {
        "youtube"
    }
}

/// RFC 3339 timestamp for a date plus time-of-day bound.
fn rfc3339(date: &str, time: &str) -> Option<String> {
    (!date.is_empty()).then(|| format!("{}T{}Z", date, time))
}

fn query_params(
    api_key: &str,
    query: &str,
    max_results: usize,
    date_range: &DateRange,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("key", api_key.to_string()),
        ("q", query.to_string()),
        ("part", "snippet".to_string()),
        ("type", "video".to_string()),
        ("maxResults", max_results.to_string()),
    ];
    if let Some(after) = rfc3339(&date_range.start_date, &date_range.start_time) {
        params.push(("publishedAfter", after));
    }
    if let Some(before) = rfc3339(&date_range.end_date, &date_range.end_time) {
        params.push(("publishedBefore", before));
    }
    params
}

fn map_items(response: SearchResponse) -> Vec<SearchResult> {
    response
        .items
        .into_iter()
        .filter_map(|item| {
            let video_id = item.id.video_id.filter(|id| !id.is_empty())?;
            let snippet = item.snippet;

            let mut result = SearchResult::new(
                format!("https://www.youtube.com/watch?v={}", video_id),
                snippet.title,
                SourceKind::Video,
            )
            .with_video_id(video_id)
            .with_description(snippet.description);

            if let Some(thumbnail) = snippet.thumbnails.best() {
                result = result.with_thumbnail(thumbnail);
            }
            if let Some(date) = snippet
                .published_at
                .as_deref()
                .and_then(|d| d.split('T').next())
                .filter(|d| !d.is_empty())
            {
                result = result.with_published_date(date);
            }
            Some(result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> DateRange {
        DateRange {
            start_date: "2024-05-01".to_string(),
            end_date: "2024-05-02".to_string(),
            start_time: "00:00:00".to_string(),
            end_time: "14:30:05".to_string(),
        }
    }

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_query_params_carry_date_window() {
        let params = query_params("yt-key", "rust", 10, &range());
        assert_eq!(param(&params, "publishedAfter"), Some("2024-05-01T00:00:00Z"));
        assert_eq!(param(&params, "publishedBefore"), Some("2024-05-02T14:30:05Z"));
        assert_eq!(param(&params, "maxResults"), Some("10"));
        assert_eq!(param(&params, "type"), Some("video"));
    }

    #[test]
    fn test_empty_dates_omit_filters() {
        let mut range = range();
        range.start_date.clear();
        let params = query_params("yt-key", "rust", 10, &range);
        assert_eq!(param(&params, "publishedAfter"), None);
        assert!(param(&params, "publishedBefore").is_some());
    }

    #[test]
    fn test_map_items() {
        let body: SearchResponse = serde_json::from_str(
            r#"{"items":[
                {"id":{"kind":"youtube#video","videoId":"abc123"},
                 "snippet":{"title":"Talk","description":"A talk","publishedAt":"2024-05-01T10:00:00Z",
                   "thumbnails":{"default":{"url":"https://i.ytimg.com/d.jpg"},
                                 "medium":{"url":"https://i.ytimg.com/m.jpg"}}}},
                {"id":{"kind":"youtube#channel"},"snippet":{"title":"Channel"}}
            ]}"#,
        )
        .unwrap();

        let results = map_items(body);
        assert_eq!(results.len(), 1);
        let video = &results[0];
        assert_eq!(video.url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(video.video_id.as_deref(), Some("abc123"));
        assert_eq!(video.source_kind, SourceKind::Video);
        assert_eq!(video.thumbnail.as_deref(), Some("https://i.ytimg.com/m.jpg"));
        assert_eq!(video.description.as_deref(), Some("A talk"));
        assert_eq!(video.published_date.as_deref(), Some("2024-05-01"));
    }
}
