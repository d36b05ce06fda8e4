//! The research pipeline.
//!
//! - Engine: ordered stage execution and state merging
//! - Stages: search, extract, summarize, report
//! - Isolation: per-unit failure containment
//! - Parsing: recovery ladder for model output
//! - Ranking and summarization over a language model

pub mod engine;
pub mod extract;
pub mod isolate;
pub mod parse;
pub mod prompts;
pub mod rank;
pub mod report;
pub mod search;
pub mod summarize;

pub use engine::{Pipeline, PipelineEvent, PipelineStream, Stage};
pub use extract::ExtractStage;
pub use isolate::{catch_panic, isolate, unwind};
pub use parse::{clean_json, parse_summary, ParseOutcome};
pub use prompts::{format_rank_prompt, format_summarize_prompt, RANK_PROMPT, SUMMARIZE_PROMPT};
pub use rank::{apply_rankings, LlmRanker};
pub use report::{compile, compile_serialized, ReportStage};
pub use search::SearchStage;
pub use summarize::{LlmSummarizer, SummarizeStage};
