//! Run state threaded through the pipeline stages.
//!
//! Every field has a fixed merge rule:
//!
//! | Field | Rule |
//! |-------|------|
//! | `query`, `language`, `output_format`, `date_range`, `target_count` | read-only after construction |
//! | `search_results`, `contents`, `summaries` | append ([`Accumulated`]) |
//! | `report` | write once ([`WriteOnce`]) |
//!
//! Stages only ever see `&PipelineState`. They hand back a typed update
//! (`SearchUpdate`, `ExtractUpdate`, ...) whose fields are the only ones that
//! stage may write, and the engine merges it with [`PipelineState::apply`].

use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::str::FromStr;

use crate::error::{PipelineError, Result};
use crate::types::request::ResearchRequest;
use crate::types::source::{ExtractedContent, SearchResult};
use crate::types::summary::SummaryRecord;

/// Report rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Grouped human-readable document.
    #[default]
    Markdown,
    /// Flat machine-readable document.
    Json,
}

impl OutputFormat {
    /// File extension for saved reports.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{}' (expected markdown or json)", other)),
        }
    }
}

/// Search window bounds. Kept as strings; providers interpret them permissively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// `YYYY-MM-DD`
    pub start_date: String,
    /// `YYYY-MM-DD`
    pub end_date: String,
    /// `HH:MM:SS`
    pub start_time: String,
    /// `HH:MM:SS`
    pub end_time: String,
}

/// An append-only list field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Accumulated<T>(Vec<T>);

impl<T> Accumulated<T> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    fn append(&mut self, items: Vec<T>) {
        self.0.extend(items);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }
}

impl<T> Default for Accumulated<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for Accumulated<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

/// A field that may be written exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WriteOnce<T>(Option<T>);

impl<T> WriteOnce<T> {
    pub fn new() -> Self {
        Self(None)
    }

    fn set(&mut self, field: &'static str, value: T) -> Result<()> {
        if self.0.is_some() {
            return Err(PipelineError::AlreadySet { field });
        }
        self.0 = Some(value);
        Ok(())
    }

    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }
}

impl<T> Default for WriteOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The state of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineState {
    query: String,
    language: String,
    output_format: OutputFormat,
    date_range: DateRange,
    target_count: usize,
    search_results: Accumulated<SearchResult>,
    contents: Accumulated<ExtractedContent>,
    summaries: Accumulated<SummaryRecord>,
    report: WriteOnce<String>,
}

impl PipelineState {
    /// Create the initial state of a run.
    pub fn new(
        query: impl Into<String>,
        language: impl Into<String>,
        output_format: OutputFormat,
        date_range: DateRange,
        target_count: usize,
    ) -> Self {
        Self {
            query: query.into(),
            language: language.into(),
            output_format,
            date_range,
            target_count,
            search_results: Accumulated::new(),
            contents: Accumulated::new(),
            summaries: Accumulated::new(),
            report: WriteOnce::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn date_range(&self) -> &DateRange {
        &self.date_range
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }

    pub fn search_results(&self) -> &[SearchResult] {
        &self.search_results
    }

    pub fn contents(&self) -> &[ExtractedContent] {
        &self.contents
    }

    pub fn summaries(&self) -> &[SummaryRecord] {
        &self.summaries
    }

    pub fn report(&self) -> Option<&str> {
        self.report.get().map(String::as_str)
    }

    /// Consume the state, keeping only the report.
    pub fn into_report(self) -> Option<String> {
        self.report.0
    }

    /// Merge a stage update into the state.
    ///
    /// List fields are appended to, the report is written once. Nothing else
    /// can change.
    pub fn apply(&mut self, update: StageUpdate) -> Result<()> {
        match update {
            StageUpdate::Search(u) => self.search_results.append(u.search_results),
            StageUpdate::Extract(u) => self.contents.append(u.contents),
            StageUpdate::Summarize(u) => self.summaries.append(u.summaries),
            StageUpdate::Report(u) => self.report.set("report", u.report)?,
        }
        Ok(())
    }
}

impl From<ResearchRequest> for PipelineState {
    fn from(request: ResearchRequest) -> Self {
        let date_range = request.date_range();
        Self::new(
            request.query,
            request.language,
            request.output_format,
            date_range,
            request.count,
        )
    }
}

/// Output of the search stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchUpdate {
    pub search_results: Vec<SearchResult>,
}

/// Output of the extraction stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractUpdate {
    pub contents: Vec<ExtractedContent>,
}

/// Output of the summarization stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummarizeUpdate {
    pub summaries: Vec<SummaryRecord>,
}

/// Output of the report stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportUpdate {
    pub report: String,
}

/// A stage update, tagged by the stage that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "lowercase")]
pub enum StageUpdate {
    Search(SearchUpdate),
    Extract(ExtractUpdate),
    Summarize(SummarizeUpdate),
    Report(ReportUpdate),
}

impl StageUpdate {
    /// Name of the stage that produced this update.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Search(_) => "search",
            Self::Extract(_) => "extract",
            Self::Summarize(_) => "summarize",
            Self::Report(_) => "report",
        }
    }
}

impl From<SearchUpdate> for StageUpdate {
    fn from(u: SearchUpdate) -> Self {
        Self::Search(u)
    }
}

impl From<ExtractUpdate> for StageUpdate {
    fn from(u: ExtractUpdate) -> Self {
        Self::Extract(u)
    }
}

impl From<SummarizeUpdate> for StageUpdate {
    fn from(u: SummarizeUpdate) -> Self {
        Self::Summarize(u)
    }
}

impl From<ReportUpdate> for StageUpdate {
    fn from(u: ReportUpdate) -> Self {
        Self::Report(u)
    }
}
