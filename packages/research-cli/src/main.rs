//! Research CLI
//!
//! Runs one research query end to end and saves the report next to the
//! working directory as `research_report_{lang}.{md|json}`.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use futures::StreamExt;
use research::{
    FetchConfig, HttpFetcher, JobStatus, JobStore, LanguageModelExt, LlmRanker, LlmSummarizer, OpenAI,
    OutputFormat, Pipeline, PipelineConfig, PipelineEvent, PipelineState, ResearchRequest,
    Searcher, TavilySearcher, ValidatedFetcher, YouTubeSearcher,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "research", about = "Search, extract, summarize and report on a topic")]
struct Args {
    /// Research topic
    query: String,

    /// Output language for summaries
    #[arg(long, default_value = "Korean")]
    lang: String,

    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// YYYY-MM-DD (default: yesterday)
    #[arg(long)]
    start_date: Option<String>,

    /// YYYY-MM-DD (default: today)
    #[arg(long)]
    end_date: Option<String>,

    /// HH:MM:SS (default: 00:00:00)
    #[arg(long)]
    start_time: Option<String>,

    /// HH:MM:SS (default: now)
    #[arg(long)]
    end_time: Option<String>,

    /// Target number of summaries
    #[arg(long, default_value_t = 5)]
    count: usize,

    #[arg(long, value_enum, default_value_t = Mode::Sync)]
    mode: Mode,

    /// Report path (default: research_report_{lang}.{ext})
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Markdown,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Markdown => OutputFormat::Markdown,
            Format::Json => OutputFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Run and print the report
    Sync,
    /// Print every stage event as a JSON line
    Stream,
    /// Run as a background job and poll its status
    Job,
}

impl Args {
    fn request(&self) -> ResearchRequest {
        ResearchRequest {
            query: self.query.clone(),
            language: self.lang.clone(),
            output_format: self.format.into(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            start_time: self.start_time.clone(),
            end_time: self.end_time.clone(),
            count: self.count,
        }
    }

    fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let ext = match self.format {
                Format::Markdown => "md",
                Format::Json => "json",
            };
            PathBuf::from(format!("research_report_{}.{}", self.lang, ext))
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stream mode keeps stdout clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,research=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let pipeline = build_pipeline(&config)?;

    let request = args.request();
    let state = PipelineState::from(request);
    tracing::info!(
        query = %args.query,
        language = %args.lang,
        target = args.count,
        mode = ?args.mode,
        "Starting research"
    );

    let report = match args.mode {
        Mode::Sync => run_sync(&pipeline, state).await?,
        Mode::Stream => run_stream(&pipeline, state).await?,
        Mode::Job => run_job(pipeline, state).await?,
    };

    if args.mode != Mode::Stream {
        println!("{}", report);
    }

    let path = args.output_path();
    std::fs::write(&path, &report)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    eprintln!("{} {}", "Report saved to".bright_green(), path.display());

    Ok(())
}

fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let mut openai = OpenAI::new(config.openai_api_key.clone());
    if let Some(model) = &config.openai_model {
        openai = openai.with_model(model);
    }
    if let Some(base_url) = &config.openai_base_url {
        openai = openai.with_base_url(base_url);
    }
    let model = Arc::new(openai.rate_limited(config.llm_requests_per_second));

    let web: Arc<dyn Searcher> = Arc::new(TavilySearcher::new(config.tavily_api_key.clone()));
    let video: Arc<dyn Searcher> =
        Arc::new(config.youtube_api_key.clone().map(YouTubeSearcher::new));
    if config.youtube_api_key.is_none() {
        tracing::warn!("YOUTUBE_API_KEY not set, video search disabled");
    }

    let fetcher = HttpFetcher::new(FetchConfig::default()).context("Failed to build HTTP client")?;

    Ok(Pipeline::new(
        web,
        video,
        Arc::new(LlmRanker::new(Arc::clone(&model))),
        Arc::new(ValidatedFetcher::new(fetcher)),
        Arc::new(LlmSummarizer::new(model)),
        PipelineConfig::default(),
    ))
}

async fn run_sync(pipeline: &Pipeline, state: PipelineState) -> Result<String> {
    let state = pipeline.run(state).await?;
    Ok(state.into_report().unwrap_or_default())
}

async fn run_stream(pipeline: &Pipeline, state: PipelineState) -> Result<String> {
    let mut events = pipeline.run_stream(state);

    while let Some(event) = events.next().await {
        let event = event?;
        println!("{}", serde_json::to_string(&event)?);

        if let PipelineEvent::Finished { state } = event {
            return Ok(state.into_report().unwrap_or_default());
        }
    }

    bail!("Pipeline stream ended without a report")
}

async fn run_job(pipeline: Pipeline, state: PipelineState) -> Result<String> {
    let store = Arc::new(JobStore::new());
    let id = store
        .spawn(async move {
            let state = pipeline.run(state).await?;
            Ok::<_, research::PipelineError>(state.into_report().unwrap_or_default())
        })
        .await;
    eprintln!("{} {}", "Job".bright_cyan(), id);

    let mut last = None;
    loop {
        let job = store.get(id).await?;
        if last != Some(job.status) {
            eprintln!("  {} {:?}", "status:".bright_cyan(), job.status);
            last = Some(job.status);
        }

        match job.status {
            JobStatus::Completed => {
                return Ok(job.result.map(|r| r.report).unwrap_or_default());
            }
            JobStatus::Failed => {
                bail!(
                    "Job {} failed: {}",
                    id,
                    job.error.unwrap_or_else(|| "unknown error".to_string())
                );
            }
            JobStatus::Pending | JobStatus::InProgress => {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }
}
