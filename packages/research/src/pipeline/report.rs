//! Report compiler.
//!
//! Pure, synchronous rendering of summary records. Two modes:
//!
//! - **Json**: `{"query", "source_summaries": [...]}` in arrival order,
//!   pretty-printed, non-ASCII kept as-is.
//! - **Markdown**: records grouped under `## {category}` in first-seen
//!   category order, arrival order within a category.

use std::fmt::Write;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::pipeline::engine::Stage;
use crate::types::state::{OutputFormat, PipelineState, ReportUpdate};
use crate::types::summary::SummaryRecord;

#[derive(Serialize)]
struct JsonReport<'a> {
    query: &'a str,
    source_summaries: &'a [SummaryRecord],
}

/// Render typed records.
pub fn compile(query: &str, summaries: &[SummaryRecord], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&JsonReport {
            query,
            source_summaries: summaries,
        })?),
        OutputFormat::Markdown => Ok(render_markdown(query, summaries)),
    }
}

/// Render records that arrive serialized (stream events, job payloads).
///
/// A string that does not parse back into a record is kept as a minimal
/// `Unknown`/`Uncategorized` record carrying the raw text as its only point.
pub fn compile_serialized<S: AsRef<str>>(
    query: &str,
    raw_records: &[S],
    format: OutputFormat,
) -> Result<String> {
    let records: Vec<SummaryRecord> = raw_records
        .iter()
        .map(|raw| {
            let raw = raw.as_ref();
            serde_json::from_str(raw).unwrap_or_else(|_| SummaryRecord::unparsed(raw))
        })
        .collect();

    compile(query, &records, format)
}

fn render_markdown(query: &str, summaries: &[SummaryRecord]) -> String {
    let mut grouped: IndexMap<&str, Vec<&SummaryRecord>> = IndexMap::new();
    for record in summaries {
        grouped.entry(record.category.as_str()).or_default().push(record);
    }

    let mut out = format!("# Research Report: {}\n\n", query);
    for (category, records) in grouped {
        let _ = write!(out, "## {}\n\n", category);
        for record in records {
            render_record(&mut out, record);
        }
    }
    out
}

fn render_record(out: &mut String, record: &SummaryRecord) {
    let _ = writeln!(out, "### {}", record.title);

    if let Some(thumbnail) = non_empty(&record.thumbnail) {
        let _ = write!(out, "![Thumbnail]({})\n\n", thumbnail);
    }

    out.push_str("**Summary:**\n");
    for point in &record.points {
        let _ = writeln!(out, "- {}", point);
    }
    out.push('\n');

    if let Some(description) = non_empty(&record.description) {
        let _ = write!(out, "**Description:** {}\n\n", description);
    }

    if !record.source_url.is_empty() {
        match non_empty(&record.published_date) {
            Some(date) => {
                let _ = write!(out, "**Source:** {} ({})\n\n", record.source_url, date);
            }
            None => {
                let _ = write!(out, "**Source:** {}\n\n", record.source_url);
            }
        }
    }

    out.push_str("---\n\n");
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Final stage: renders the accumulated summaries into the report.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportStage;

#[async_trait]
impl Stage for ReportStage {
    type Output = ReportUpdate;

    fn name(&self) -> &'static str {
        "report"
    }

    async fn run(&self, state: &PipelineState) -> Result<ReportUpdate> {
        let report = compile(state.query(), state.summaries(), state.output_format())?;
        info!(
            summaries = state.summaries().len(),
            format = ?state.output_format(),
            bytes = report.len(),
            "Compiled report"
        );
        Ok(ReportUpdate { report })
    }
}
