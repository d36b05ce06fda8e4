//! CLI configuration loaded from the environment.

use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use research::SecretString;
use std::env;

/// Provider credentials and model settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: SecretString,
    pub tavily_api_key: SecretString,
    /// Absent: video search contributes nothing.
    pub youtube_api_key: Option<SecretString>,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub llm_requests_per_second: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let config = Self {
            openai_api_key: env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set")?
                .into(),
            tavily_api_key: env::var("TAVILY_API_KEY")
                .context("TAVILY_API_KEY must be set")?
                .into(),
            youtube_api_key: optional("YOUTUBE_API_KEY").map(SecretString::from),
            openai_model: optional("OPENAI_MODEL"),
            openai_base_url: optional("OPENAI_BASE_URL"),
            llm_requests_per_second: env::var("LLM_REQUESTS_PER_SECOND")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("LLM_REQUESTS_PER_SECOND must be a valid number")?,
        };

        if config.openai_api_key.is_blank() {
            bail!("OPENAI_API_KEY must not be empty");
        }
        if config.tavily_api_key.is_blank() {
            bail!("TAVILY_API_KEY must not be empty");
        }

        Ok(config)
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
