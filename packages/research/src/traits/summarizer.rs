//! Summarizer trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::pipeline::parse::ParseOutcome;

/// Turns one text into summary points and a category.
///
/// `Ok` always carries a usable payload: implementations are expected to
/// recover from malformed model output themselves (see
/// [`crate::pipeline::parse`]). `Err` means the model call itself failed; the
/// summarization stage turns that into [`ParseOutcome::Errored`].
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str, language: &str) -> Result<ParseOutcome>;
}
