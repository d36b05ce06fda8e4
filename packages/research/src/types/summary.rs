//! Summary types.

use serde::{Deserialize, Serialize};

/// Category used when the model call itself failed.
pub const DEFAULT_CATEGORY: &str = "General";

/// Category used when the model answered but its output could not be classified.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Point used when the model produced nothing usable.
pub const EMPTY_SUMMARY: &str = "Summary generation failed.";

/// What the summarizer produces for one text: ordered points and a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryPayload {
    /// Ordered summary points. Never empty.
    pub points: Vec<String>,
    pub category: String,
}

impl SummaryPayload {
    /// Create a payload, replacing an empty point list with the failure message.
    pub fn new(points: Vec<String>, category: impl Into<String>) -> Self {
        let points = if points.is_empty() {
            vec![EMPTY_SUMMARY.to_string()]
        } else {
            points
        };

        Self {
            points,
            category: category.into(),
        }
    }
}

/// One summarized source, as rendered in the report.
///
/// Field names on the wire follow the report format (`summary`, `source`, `date`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub title: String,

    #[serde(rename = "summary")]
    pub points: Vec<String>,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(rename = "source", default)]
    pub source_url: String,

    #[serde(rename = "date", default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl SummaryRecord {
    /// Minimal record standing in for a serialized summary that no longer parses.
    pub fn unparsed(raw: impl Into<String>) -> Self {
        Self {
            title: "Unknown".to_string(),
            points: vec![raw.into()],
            category: UNCATEGORIZED.to_string(),
            source_url: String::new(),
            published_date: None,
            thumbnail: None,
            description: None,
        }
    }
}
