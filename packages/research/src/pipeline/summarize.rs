//! Summarization: the model-backed summarizer and the stage that fans it out.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::llm::LanguageModel;
use crate::pipeline::engine::Stage;
use crate::pipeline::isolate::catch_panic;
use crate::pipeline::parse::{parse_summary, ParseOutcome};
use crate::pipeline::prompts::format_summarize_prompt;
use crate::traits::summarizer::Summarizer;
use crate::types::source::ExtractedContent;
use crate::types::state::{PipelineState, SummarizeUpdate};
use crate::types::summary::SummaryRecord;

/// Summarizer that prompts a language model and runs the recovery ladder
/// over whatever comes back.
pub struct LlmSummarizer<M: LanguageModel> {
    model: M,
}

impl<M: LanguageModel> LlmSummarizer<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<M: LanguageModel> Summarizer for LlmSummarizer<M> {
    async fn summarize(&self, text: &str, language: &str) -> Result<ParseOutcome> {
        let raw = self
            .model
            .complete(&format_summarize_prompt(text, language))
            .await?;
        Ok(parse_summary(&raw))
    }
}

/// Summarizes every extracted item at once.
pub struct SummarizeStage {
    summarizer: Arc<dyn Summarizer>,
    char_budget: usize,
}

impl SummarizeStage {
    pub fn new(summarizer: Arc<dyn Summarizer>, char_budget: usize) -> Self {
        Self {
            summarizer,
            char_budget,
        }
    }

    async fn summarize_one(&self, content: &ExtractedContent, language: &str) -> Option<SummaryRecord> {
        let unit = format!("summarize:{}", content.url);
        let text = truncate_chars(&content.text, self.char_budget);

        let outcome = catch_panic(&unit, async {
            match self.summarizer.summarize(text, language).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(url = %content.url, error = %e, "Summarizer call failed");
                    ParseOutcome::errored(e)
                }
            }
        })
        .await?;

        debug!(url = %content.url, step = outcome.step(), "Summarized");
        let payload = outcome.into_payload();

        Some(SummaryRecord {
            title: content.title.clone(),
            points: payload.points,
            category: payload.category,
            source_url: content.url.clone(),
            published_date: content.published_date.clone(),
            thumbnail: content.thumbnail.clone(),
            description: content.description.clone(),
        })
    }
}

#[async_trait]
impl Stage for SummarizeStage {
    type Output = SummarizeUpdate;

    fn name(&self) -> &'static str {
        "summarize"
    }

    async fn run(&self, state: &PipelineState) -> Result<SummarizeUpdate> {
        let language = state.language();
        let pending: Vec<_> = state
            .contents()
            .iter()
            .filter(|c| !c.text.trim().is_empty())
            .collect();

        info!(items = pending.len(), language, "Summarizing");
        let summaries: Vec<_> = join_all(pending.into_iter().map(|c| self.summarize_one(c, language)))
            .await
            .into_iter()
            .flatten()
            .collect();

        info!(summaries = summaries.len(), "Summarization complete");
        Ok(SummarizeUpdate { summaries })
    }
}

/// Longest prefix of `text` with at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{content, state_with_contents, MockLanguageModel, MockSummarizer};
    use crate::types::summary::{DEFAULT_CATEGORY, UNCATEGORIZED};

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate_chars("한국어 텍스트", 3), "한국어");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[tokio::test]
    async fn test_llm_summarizer_runs_ladder() {
        let model = MockLanguageModel::new()
            .with_response("```json\n{\"points\":[\"a\",\"b\",\"c\"],\"category\":\"News\"}\n```");
        let summarizer = LlmSummarizer::new(model.clone());

        let outcome = summarizer.summarize("text", "English").await.unwrap();
        assert_eq!(outcome.step(), "structured");
        assert_eq!(outcome.payload().category, "News");
        assert!(model.calls()[0].system.contains("English"));
    }

    #[tokio::test]
    async fn test_stage_records_model_errors() {
        let summarizer = LlmSummarizer::new(MockLanguageModel::new().failing("rate limited"));
        let stage = SummarizeStage::new(Arc::new(summarizer), 5000);

        let update = stage
            .run(&state_with_contents(vec![content(0, "some text")]))
            .await
            .unwrap();

        let record = &update.summaries[0];
        assert_eq!(record.category, DEFAULT_CATEGORY);
        assert!(record.points[0].starts_with("Error generating summary:"));
        assert!(record.points[0].contains("rate limited"));
    }

    #[tokio::test]
    async fn test_stage_keeps_order_and_metadata() {
        let mut second = content(1, "prose");
        second.thumbnail = Some("https://img/1.png".into());
        let summarizer = MockSummarizer::new().with_raw("prose", "The article discusses X.");

        let stage = SummarizeStage::new(Arc::new(summarizer), 5000);
        let update = stage
            .run(&state_with_contents(vec![content(0, "first"), second]))
            .await
            .unwrap();

        assert_eq!(update.summaries.len(), 2);
        assert_eq!(update.summaries[0].source_url, "https://site0.com");
        let fallback = &update.summaries[1];
        assert_eq!(fallback.points, vec!["The article discusses X.".to_string()]);
        assert_eq!(fallback.category, UNCATEGORIZED);
        assert_eq!(fallback.thumbnail.as_deref(), Some("https://img/1.png"));
    }

    #[tokio::test]
    async fn test_text_truncated_to_budget() {
        let summarizer = MockSummarizer::new();
        let stage = SummarizeStage::new(Arc::new(summarizer.clone()), 10);

        stage
            .run(&state_with_contents(vec![content(0, &"x".repeat(50))]))
            .await
            .unwrap();

        assert_eq!(summarizer.calls()[0].text.chars().count(), 10);
    }
}
