//! Research request: the caller-facing input of a run.

use chrono::{Duration, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::types::state::{DateRange, OutputFormat};

/// Parameters of one research run.
///
/// Missing date bounds default to "yesterday 00:00:00 until now" in local time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    /// Research topic.
    pub query: String,

    /// Output language for summaries.
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub output_format: OutputFormat,

    /// `YYYY-MM-DD`
    #[serde(default)]
    pub start_date: Option<String>,

    /// `YYYY-MM-DD`
    #[serde(default)]
    pub end_date: Option<String>,

    /// `HH:MM:SS`
    #[serde(default)]
    pub start_time: Option<String>,

    /// `HH:MM:SS`
    #[serde(default)]
    pub end_time: Option<String>,

    /// Target number of summaries.
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_language() -> String {
    "Korean".to_string()
}

fn default_count() -> usize {
    5
}

impl ResearchRequest {
    /// Create a request with default settings.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            language: default_language(),
            output_format: OutputFormat::default(),
            start_date: None,
            end_date: None,
            start_time: None,
            end_time: None,
            count: default_count(),
        }
    }

    /// Set the output language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set the target count.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Set the date bounds.
    pub fn with_dates(mut self, start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        self.start_date = Some(start_date.into());
        self.end_date = Some(end_date.into());
        self
    }

    /// Set the time-of-day bounds.
    pub fn with_times(mut self, start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        self.start_time = Some(start_time.into());
        self.end_time = Some(end_time.into());
        self
    }

    /// Resolve the date range against the current local time.
    pub fn date_range(&self) -> DateRange {
        self.date_range_at(Local::now().naive_local())
    }

    /// Resolve the date range against a fixed "now".
    pub fn date_range_at(&self, now: NaiveDateTime) -> DateRange {
        let yesterday = now - Duration::days(1);

        DateRange {
            start_date: non_empty(&self.start_date)
                .unwrap_or_else(|| yesterday.format("%Y-%m-%d").to_string()),
            end_date: non_empty(&self.end_date)
                .unwrap_or_else(|| now.format("%Y-%m-%d").to_string()),
            start_time: non_empty(&self.start_time).unwrap_or_else(|| "00:00:00".to_string()),
            end_time: non_empty(&self.end_time)
                .unwrap_or_else(|| now.format("%H:%M:%S").to_string()),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
