//! Language-model access.
//!
//! The pipeline treats the model as opaque: a system prompt and a user prompt
//! go in, text comes out, and the call may fail. Everything model-specific
//! (prompts, parsing) lives in the collaborators built on top of
//! [`LanguageModel`].

pub mod openai;
pub mod rate_limited;

pub use openai::OpenAI;
pub use rate_limited::{LanguageModelExt, RateLimitedModel};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One chat-completion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,

    /// Ask the provider to constrain output to a JSON object.
    #[serde(default)]
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            json_mode: false,
        }
    }

    /// Request a JSON object response.
    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Text-in, text-out model call.
///
/// # Implementations
///
/// - `OpenAI` - chat completions over HTTP
/// - `RateLimitedModel` - token-bucket wrapper around another model
/// - `MockLanguageModel` - for testing
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Model identifier (for logging).
    fn model_name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<M: LanguageModel + ?Sized> LanguageModel for std::sync::Arc<M> {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        (**self).complete(request).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
