//! Search candidates and extracted content.

use serde::{Deserialize, Serialize};
use url::Url;

/// Where a candidate came from. Decides which fetch strategy applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Generic web page
    Web,
    /// Forum/blog community page (still fetched as a web page)
    Community,
    /// Video; content comes from its transcript
    Video,
}

impl SourceKind {
    /// Web and community pages share the page-fetch path.
    pub fn is_page(&self) -> bool {
        matches!(self, Self::Web | Self::Community)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Community => "community",
            Self::Video => "video",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A search candidate discovered by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Candidate URL.
    pub url: String,

    /// Title reported by the provider.
    pub title: String,

    /// Provider classification.
    #[serde(rename = "source")]
    pub source_kind: SourceKind,

    /// Short content excerpt returned by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,

    /// 0-10 relevance score. `None` until the ranker has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<u8>,

    /// Ranker's short justification for the score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_reason: Option<String>,

    /// Provider video id (video candidates only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

impl SearchResult {
    /// Create a new candidate with minimal fields.
    pub fn new(url: impl Into<String>, title: impl Into<String>, source_kind: SourceKind) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            source_kind,
            snippet: None,
            thumbnail: None,
            description: None,
            published_date: None,
            relevance_score: None,
            relevance_reason: None,
            video_id: None,
        }
    }

    /// Add a snippet.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// Add a thumbnail URL.
    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    /// Add a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a published date.
    pub fn with_published_date(mut self, date: impl Into<String>) -> Self {
        self.published_date = Some(date.into());
        self
    }

    /// Add a video id.
    pub fn with_video_id(mut self, video_id: impl Into<String>) -> Self {
        self.video_id = Some(video_id.into());
        self
    }

    /// Add a relevance score.
    pub fn with_score(mut self, score: u8) -> Self {
        self.relevance_score = Some(score);
        self
    }

    /// Video id for transcript lookup.
    ///
    /// Prefers the provider id, then the `v=` parameter of the URL.
    pub fn resolve_video_id(&self) -> Option<String> {
        if let Some(id) = self.video_id.as_deref().filter(|id| !id.is_empty()) {
            return Some(id.to_string());
        }

        let url = Url::parse(&self.url).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
    }

    /// Text the search stage already captured, used when fetching fails.
    pub fn fallback_text(&self) -> Option<&str> {
        self.snippet
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.description.as_deref().filter(|s| !s.trim().is_empty()))
    }
}

/// Content extracted for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub url: String,
    pub title: String,

    /// Extracted text. Never empty.
    pub text: String,

    #[serde(rename = "source")]
    pub source_kind: SourceKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

impl ExtractedContent {
    /// Build a record from the candidate it was extracted for.
    ///
    /// Returns `None` when `text` is blank: a record without text does not exist.
    pub fn from_candidate(candidate: &SearchResult, text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return None;
        }

        Some(Self {
            url: candidate.url.clone(),
            title: if candidate.title.is_empty() {
                "No Title".to_string()
            } else {
                candidate.title.clone()
            },
            text,
            source_kind: candidate.source_kind,
            thumbnail: candidate.thumbnail.clone(),
            description: candidate.description.clone(),
            published_date: candidate.published_date.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_from_url() {
        let result = SearchResult::new(
            "https://www.youtube.com/watch?v=Ai8xZp3_33g",
            "Video",
            SourceKind::Video,
        );
        assert_eq!(result.resolve_video_id(), Some("Ai8xZp3_33g".to_string()));

        let explicit = result.clone().with_video_id("abc");
        assert_eq!(explicit.resolve_video_id(), Some("abc".to_string()));

        let web = SearchResult::new("https://example.com/page", "Page", SourceKind::Web);
        assert_eq!(web.resolve_video_id(), None);
    }

    #[test]
    fn test_fallback_text_prefers_snippet() {
        let result = SearchResult::new("https://example.com", "T", SourceKind::Web)
            .with_snippet("snippet")
            .with_description("description");
        assert_eq!(result.fallback_text(), Some("snippet"));

        let blank_snippet = SearchResult::new("https://example.com", "T", SourceKind::Web)
            .with_snippet("   ")
            .with_description("description");
        assert_eq!(blank_snippet.fallback_text(), Some("description"));

        let none = SearchResult::new("https://example.com", "T", SourceKind::Web);
        assert_eq!(none.fallback_text(), None);
    }

    #[test]
    fn test_blank_text_produces_no_record() {
        let candidate = SearchResult::new("https://example.com", "", SourceKind::Web);
        assert!(ExtractedContent::from_candidate(&candidate, "  \n").is_none());

        let record = ExtractedContent::from_candidate(&candidate, "body").unwrap();
        assert_eq!(record.title, "No Title");
    }

    #[test]
    fn test_source_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&SourceKind::Community).unwrap(),
            "\"community\""
        );
        assert!(SourceKind::Web.is_page());
        assert!(!SourceKind::Video.is_page());
    }
}
